use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use draw_core::{format_digest, DigestStyle, Row};
use tempfile::NamedTempFile;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("output directory missing or not writable: {0}")]
    OutputDir(String),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

/// Ensure output directory exists; create if missing.
pub fn ensure_output_dir(dir: &Path) -> Result<(), PersistError> {
    if dir.exists() {
        let meta = fs::metadata(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
        if !meta.is_dir() {
            return Err(PersistError::OutputDir("path is not a directory".into()));
        }
    } else {
        fs::create_dir_all(dir).map_err(|e| PersistError::OutputDir(e.to_string()))?;
    }
    Ok(())
}

/// Atomically write content to `{dir}/{filename}` by writing a temp file then renaming.
pub struct AtomicFileWriter {
    dir: PathBuf,
}

impl AtomicFileWriter {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write(&self, filename: &str, content: &str) -> Result<PathBuf, PersistError> {
        ensure_output_dir(&self.dir)?;

        let target = self.dir.join(filename);
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.as_file_mut().sync_all()?;

        // `persist` replaces an existing target in a single rename.
        tmp.persist(&target).map_err(|e| PersistError::Io(e.error))?;
        Ok(target)
    }
}

/// `world264_YYYY-MM-DD.txt`, one file per calendar day.
pub fn day_filename(day: NaiveDate) -> String {
    format!("world264_{}.txt", day.format("%Y-%m-%d"))
}

/// Plain-text UTF-8 copies of the published digests, one file per day.
pub struct DigestArchive {
    writer: AtomicFileWriter,
    style: DigestStyle,
}

impl DigestArchive {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
            style: DigestStyle::day_file(),
        }
    }

    pub fn dir(&self) -> &Path {
        self.writer.dir()
    }

    /// Renders `rows` and replaces the file for `day`.
    pub fn write_day(&self, day: NaiveDate, rows: &[Row]) -> Result<PathBuf, PersistError> {
        let text = format_digest(rows, &self.style);
        self.writer.write(&day_filename(day), &text)
    }
}
