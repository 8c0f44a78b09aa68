//! Dataset sinks for harvested verse records.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::identifier::AuthorIdentifier;
use crate::models::VerseRecord;

/// Column names of the CSV dataset.
pub const CSV_HEADERS: [&str; 3] = ["Poet", "Ghazal", "URL"];

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("dataset written before begin()")]
    NotStarted,
}

/// One-way sink for the records of a run.
pub trait DatasetWriter {
    /// Called once, after discovery found at least one link.
    fn begin(&mut self, author: &AuthorIdentifier) -> Result<(), DatasetError>;

    fn write_record(&mut self, record: &VerseRecord) -> Result<(), DatasetError>;

    /// Flush and release. Safe to call without `begin`.
    fn finish(&mut self) -> Result<(), DatasetError>;
}

/// `{identifier}_dataset.csv` in a directory.
pub struct CsvDataset {
    dir: PathBuf,
    path: Option<PathBuf>,
    writer: Option<csv::Writer<File>>,
    written: usize,
}

impl CsvDataset {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            path: None,
            writer: None,
            written: 0,
        }
    }

    pub fn file_name(author: &AuthorIdentifier) -> String {
        format!("{}_dataset.csv", author)
    }

    /// Path of the file, once `begin` has created it.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

impl DatasetWriter for CsvDataset {
    fn begin(&mut self, author: &AuthorIdentifier) -> Result<(), DatasetError> {
        fs::create_dir_all(&self.dir).map_err(|source| DatasetError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let path = self.dir.join(Self::file_name(author));
        let file = File::create(&path).map_err(|source| DatasetError::Io {
            path: path.clone(),
            source,
        })?;

        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(CSV_HEADERS)?;
        writer.flush().map_err(|source| DatasetError::Io {
            path: path.clone(),
            source,
        })?;

        info!("Writing dataset to {}", path.display());
        self.writer = Some(writer);
        self.path = Some(path);
        Ok(())
    }

    fn write_record(&mut self, record: &VerseRecord) -> Result<(), DatasetError> {
        let writer = self.writer.as_mut().ok_or(DatasetError::NotStarted)?;
        writer.write_record([&record.author, &record.body, &record.source])?;
        // Flushed per record so an interrupted run keeps what it has.
        writer.flush().map_err(|source| DatasetError::Io {
            path: self.path.clone().unwrap_or_default(),
            source,
        })?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), DatasetError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|source| DatasetError::Io {
                path: self.path.clone().unwrap_or_default(),
                source,
            })?;
        }
        Ok(())
    }
}

/// Keeps records in memory.
#[derive(Debug, Default)]
pub struct MemoryDataset {
    pub author: Option<AuthorIdentifier>,
    pub records: Vec<VerseRecord>,
    pub finished: bool,
}

impl MemoryDataset {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DatasetWriter for MemoryDataset {
    fn begin(&mut self, author: &AuthorIdentifier) -> Result<(), DatasetError> {
        self.author = Some(author.clone());
        Ok(())
    }

    fn write_record(&mut self, record: &VerseRecord) -> Result<(), DatasetError> {
        if self.author.is_none() {
            return Err(DatasetError::NotStarted);
        }
        self.records.push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<(), DatasetError> {
        self.finished = true;
        Ok(())
    }
}
