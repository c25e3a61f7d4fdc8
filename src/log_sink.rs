//! Append-only inspection log.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::geometry::RoiId;
use crate::inspect::{InspectionResult, Verdict};

pub const CSV_HEADER: &str = "Timestamp,ROI ID,Inspection Type,Result,Details";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, thiserror::Error)]
pub enum LogSinkError {
    #[error("log file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub timestamp: DateTime<Local>,
    pub roi_id: RoiId,
    pub inspection: String,
    pub verdict: Verdict,
    pub detail: String,
}

impl LogRecord {
    pub fn now(result: &InspectionResult) -> Self {
        Self {
            timestamp: Local::now(),
            roi_id: result.roi_id,
            inspection: result.operator.label().to_owned(),
            verdict: result.verdict,
            detail: result.detail.clone(),
        }
    }

    pub fn to_csv_row(&self) -> String {
        [
            self.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            self.roi_id.to_string(),
            self.inspection.clone(),
            self.verdict.to_string(),
            self.detail.clone(),
        ]
        .iter()
        .map(|field| csv_field(field))
        .collect::<Vec<_>>()
        .join(",")
    }
}

fn csv_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_owned()
    }
}

/// Destination of one record per operator invocation.
pub trait LogSink {
    fn append(&mut self, record: &LogRecord) -> Result<(), LogSinkError>;
}

impl<S: LogSink + ?Sized> LogSink for Box<S> {
    fn append(&mut self, record: &LogRecord) -> Result<(), LogSinkError> {
        (**self).append(record)
    }
}

/// CSV file sink. The header is written when the file is new or empty.
#[derive(Debug, Clone)]
pub struct CsvLogSink {
    path: PathBuf,
}

impl CsvLogSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, LogSinkError> {
        let path = path.as_ref().to_path_buf();
        let io_err = |source| LogSinkError::Io {
            path: path.clone(),
            source,
        };
        let mut file = Self::append_handle(&path).map_err(io_err)?;
        let empty = file.metadata().map_err(io_err)?.len() == 0;
        if empty {
            writeln!(file, "{CSV_HEADER}").map_err(io_err)?;
        }
        Ok(Self { path })
    }

    fn append_handle(path: &Path) -> io::Result<File> {
        OpenOptions::new().create(true).append(true).open(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for CsvLogSink {
    fn append(&mut self, record: &LogRecord) -> Result<(), LogSinkError> {
        let io_err = |source| LogSinkError::Io {
            path: self.path.clone(),
            source,
        };
        let mut file = Self::append_handle(&self.path).map_err(io_err)?;
        writeln!(file, "{}", record.to_csv_row()).map_err(io_err)
    }
}

/// Keeps records in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogSink {
    pub records: Vec<LogRecord>,
}

impl LogSink for MemoryLogSink {
    fn append(&mut self, record: &LogRecord) -> Result<(), LogSinkError> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullLogSink;

impl LogSink for NullLogSink {
    fn append(&mut self, _record: &LogRecord) -> Result<(), LogSinkError> {
        Ok(())
    }
}
