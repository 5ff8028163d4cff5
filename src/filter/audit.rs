//! Append-only audit files written next to the filtered corpus.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::error::AlignmentError;
use crate::types::{BookStats, Decision};

const REJECTION_LOG_HEADER: &str = "Rejected Files Log\n===================\n";
const STATS_HEADER: &str = "Book,Retained,Rejected\n";
const DECISIONS_HEADER: &str = "filename,folder,probability_difference,status\n";

/// Creates `path` with `header` unless it already exists.
fn ensure_with_header(path: &Path, header: &str) -> Result<(), AlignmentError> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| AlignmentError::io(format!("create {}", parent.display()), e))?;
    }
    std::fs::write(path, header)
        .map_err(|e| AlignmentError::io(format!("write header of {}", path.display()), e))
}

fn open_append(path: &Path) -> Result<File, AlignmentError> {
    OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| AlignmentError::io(format!("open {}", path.display()), e))
}

pub struct RejectionLog {
    path: PathBuf,
}

impl RejectionLog {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AlignmentError> {
        let path = path.into();
        ensure_with_header(&path, REJECTION_LOG_HEADER)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, audio_path: &Path, score: f32) -> Result<(), AlignmentError> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        let mut file = open_append(&self.path)?;
        writeln!(
            file,
            "[{timestamp}] Rejected: {} (Difference: {score})",
            audio_path.display()
        )
        .map_err(|e| AlignmentError::io(format!("append to {}", self.path.display()), e))
    }
}

/// `Book,Retained,Rejected` rows, one per flushed book.
pub struct StatsWriter {
    path: PathBuf,
}

impl StatsWriter {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AlignmentError> {
        let path = path.into();
        ensure_with_header(&path, STATS_HEADER)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, stats: &BookStats) -> Result<(), AlignmentError> {
        let mut file = open_append(&self.path)?;
        writeln!(file, "{},{},{}", stats.book, stats.retained, stats.rejected)
            .map_err(|e| AlignmentError::io(format!("append to {}", self.path.display()), e))
    }
}

/// One row per scored pair, retained or not.
pub struct DecisionWriter {
    path: PathBuf,
}

impl DecisionWriter {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AlignmentError> {
        let path = path.into();
        ensure_with_header(&path, DECISIONS_HEADER)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(
        &self,
        audio_path: &Path,
        score: f32,
        decision: Decision,
    ) -> Result<(), AlignmentError> {
        let name_of = |p: Option<&Path>| {
            p.and_then(Path::file_name)
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        let status = match decision {
            Decision::Retained => "Retained",
            Decision::Rejected => "Rejected",
        };
        let mut file = open_append(&self.path)?;
        writeln!(
            file,
            "{},{},{score:.4},{status}",
            name_of(Some(audio_path)),
            name_of(audio_path.parent())
        )
        .map_err(|e| AlignmentError::io(format!("append to {}", self.path.display()), e))
    }
}
