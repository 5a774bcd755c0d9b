//! Persistence collaborator: one CSV per completed subject.

use chrono::Local;
use review_harvest_models::{ReviewRecord, Subject};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write { path: PathBuf, source: csv::Error },
}

/// Where completed subjects are flushed. Invoked once per subject;
/// failures are reported by the orchestrator, never retried, and leave
/// the in-memory records untouched.
pub trait RecordSink: Send + Sync {
    fn write(&self, subject: &Subject, records: &[ReviewRecord]) -> Result<PathBuf, SinkError>;
}

pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_path(&self, subject: &Subject) -> PathBuf {
        let date = Local::now().format("%Y%m%d");
        self.dir
            .join(format!("{}_reviews_{}.csv", sanitize_title(&subject.title), date))
    }
}

impl RecordSink for CsvSink {
    fn write(&self, subject: &Subject, records: &[ReviewRecord]) -> Result<PathBuf, SinkError> {
        let path = self.file_path(subject);
        if records.is_empty() {
            return Ok(path);
        }

        std::fs::create_dir_all(&self.dir).map_err(|source| SinkError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;

        let mut writer = csv::Writer::from_path(&path).map_err(|source| SinkError::Write {
            path: path.clone(),
            source,
        })?;
        for record in records {
            writer.serialize(record).map_err(|source| SinkError::Write {
                path: path.clone(),
                source,
            })?;
        }
        writer.flush().map_err(|source| SinkError::Write {
            path: path.clone(),
            source: csv::Error::from(source),
        })?;

        Ok(path)
    }
}

/// Subject titles become file names; keep them shell- and
/// filesystem-friendly the same way the export filenames always were.
fn sanitize_title(title: &str) -> String {
    title
        .replace(':', "")
        .replace([' ', '/'], "_")
}
