// src/lib.rs
// Public library surface for the binary and the integration tests.

pub mod analyze;
pub mod app;
pub mod cli;
pub mod config;
pub mod ingest;
pub mod logging;
pub mod metrics;
pub mod monitor;
pub mod sink;
pub mod supervisor;

pub use crate::analyze::AnalysisPipeline;
pub use crate::ingest::types::{Event, EventHandler, HeadlineSource, SessionRunner};
pub use crate::sink::CsvSink;
pub use crate::supervisor::BackoffSupervisor;
