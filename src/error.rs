//! Error types for pktvis

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by operator actions (import, export, copy) and setup.
#[derive(Error, Debug)]
pub enum ViewerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to read {path}: {source}")]
    ReadFile { path: PathBuf, source: io::Error },

    #[error("invalid packet dump: {0}")]
    InvalidDump(String),

    #[error("capture error: {0}")]
    Capture(String),

    #[error("clipboard error: {0}")]
    Clipboard(String),

    #[error("nothing selected")]
    NothingSelected,
}

pub type Result<T> = std::result::Result<T, ViewerError>;
