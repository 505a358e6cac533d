//! # Result sink
//! Append-only CSV output.
//!
//! Every call opens the file in append mode and closes it again, so the file
//! can be inspected or rotated between writes. The header is written at most
//! once per file: before writing it, the whole current content is scanned for
//! the comma-joined header string.
//!
//! Values are joined with `,` verbatim. Embedded commas or newlines are NOT
//! escaped, so a value containing them shifts the columns of its row.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone};

/// `stockmine_<YYYYmmdd-HHMMSS>.csv` for the given process start time.
pub fn output_file_name<Tz: TimeZone>(started: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("stockmine_{}.csv", started.format("%Y%m%d-%H%M%S"))
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
    // Serializes the header check with the append that follows it.
    lock: Mutex<()>,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Sink for a file in `dir` named after the process start time.
    pub fn at_start<Tz: TimeZone>(dir: &Path, started: &DateTime<Tz>) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        Self::new(dir.join(output_file_name(started)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append_line(&self, line: &str) -> Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("opening {} for append", self.path.display()))?;
        // One write call per line: a row is either fully present or absent.
        f.write_all(format!("{line}\n").as_bytes())
            .with_context(|| format!("appending to {}", self.path.display()))?;
        Ok(())
    }

    // Raw bytes: foreign non-UTF-8 content must not block later writes.
    fn read_existing(&self) -> Result<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(b) => Ok(b),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e).with_context(|| format!("reading {}", self.path.display())),
        }
    }

    /// Append the header unless it already occurs in the file.
    /// Returns `true` if it was written by this call.
    pub fn write_header_once(&self, fields: &[&str]) -> Result<bool> {
        let header = fields.join(",");
        let _guard = self.lock.lock().expect("sink mutex poisoned");

        if contains_bytes(&self.read_existing()?, header.as_bytes()) {
            return Ok(false);
        }
        self.append_line(&header)?;
        tracing::debug!(target: "sink", path = %self.path.display(), %header, "header written");
        Ok(true)
    }

    /// Append one comma-joined row.
    pub fn write_row<S: AsRef<str>>(&self, values: &[S]) -> Result<()> {
        let row = values.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(",");
        let _guard = self.lock.lock().expect("sink mutex poisoned");
        self.append_line(&row)?;
        tracing::debug!(target: "sink", %row, "row written");
        Ok(())
    }

    /// Header (once) followed by a single row.
    pub fn write_record<S: AsRef<str>>(&self, fields: &[&str], values: &[S]) -> Result<()> {
        self.write_header_once(fields)?;
        self.write_row(values)
    }
}
