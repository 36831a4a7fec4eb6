//! Append-only per-device storage.
//!
//! Each simulator owns exactly one sink, so no file locking is needed:
//! the header check is a plain existence test.

use std::fs::{self, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use csv::{Terminator, WriterBuilder};
use tracing::{debug, trace};

use crate::error::SinkError;
use crate::reading::{Reading, HEADER};

/// Durable destination for one device's readings.
pub trait ReadingSink: Send {
    /// Appends one reading. Must not return before the row is flushed.
    fn write(&mut self, reading: &Reading) -> Result<(), SinkError>;
}

/// CSV log bound to a single file.
#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Sink for the simulator at `index`: `<dir>/<prefix>-<index>.csv`.
    pub fn for_device(dir: &Path, prefix: &str, index: usize) -> Self {
        Self::new(dir.join(Self::file_name(prefix, index)))
    }

    pub fn file_name(prefix: &str, index: usize) -> String {
        format!("{prefix}-{index}.csv")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing or zero-length file still needs its header.
    fn needs_header(&self) -> Result<bool, SinkError> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(meta.len() == 0),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(true),
            Err(e) => Err(e.into()),
        }
    }
}

impl ReadingSink for CsvSink {
    fn write(&mut self, reading: &Reading) -> Result<(), SinkError> {
        let needs_header = self.needs_header()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(file);

        if needs_header {
            debug!(path = %self.path.display(), "Writing header");
            writer.write_record(HEADER)?;
        }
        writer.write_record(reading.to_record())?;
        writer.flush()?;

        trace!(path = %self.path.display(), "Row appended");
        Ok(())
    }
}
