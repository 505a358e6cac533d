// src/ingest/providers/mod.rs
pub mod quote;
pub mod yahoo_rss;
