//! Persistence of finished evaluations.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::domain::EvaluationRecord;
use crate::error::{JudgeError, Result};

/// Receives one record per finished evaluation.
pub trait ResultSink {
    /// Store the record.
    fn persist(&self, record: &EvaluationRecord) -> Result<()>;
}

/// Appends each record as one JSON line to a file.
#[derive(Debug, Clone)]
pub struct JsonLinesSink {
    path: PathBuf,
}

impl JsonLinesSink {
    /// Create a sink writing to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Destination file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultSink for JsonLinesSink {
    fn persist(&self, record: &EvaluationRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_string(record)
            .map_err(|err| JudgeError::Other(format!("serialize evaluation record: {err}")))?;
        line.push('\n');

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}
