//! Run configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ImportError, Result};

/// How rows are turned into store writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportMode {
    /// Group rows per (resource, series) and flush each group once.
    #[default]
    Batch,
    /// Write each row as it is read.
    Incremental,
}

impl ImportMode {
    pub fn parse(s: &str) -> Result<Self> {
        let norm = s.trim().to_ascii_lowercase();
        match norm.as_str() {
            "batch" => Ok(Self::Batch),
            "incremental" => Ok(Self::Incremental),
            other => Err(ImportError::Config(format!(
                "unknown mode `{other}` (expected batch|incremental)"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Batch => "batch",
            Self::Incremental => "incremental",
        }
    }
}

impl std::str::FromStr for ImportMode {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Configuration for one import run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportConfig {
    /// Container spreadsheet (`resource, series, box, barcode, location, coordinate`)
    pub csv_path: PathBuf,
    /// Progress report stream
    pub status_path: PathBuf,
    /// Complaint stream
    pub error_path: PathBuf,
    pub mode: ImportMode,
    /// Actor recorded against every write
    pub username: String,
    /// Echo report lines to stdout and complaints to stderr
    pub mirror_to_console: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            csv_path: PathBuf::from("/tmp/aspace/container.csv"),
            status_path: PathBuf::from("/tmp/aspace/status.txt"),
            error_path: PathBuf::from("/tmp/aspace/error.txt"),
            mode: ImportMode::Batch,
            username: "admin".to_string(),
            mirror_to_console: true,
        }
    }
}

impl ImportConfig {
    /// Load from a JSON file; absent keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents)
            .map_err(|e| ImportError::Config(format!("{}: {e}", path.display())))
    }
}
