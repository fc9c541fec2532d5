use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("malformed header: {0}")]
    MalformedHeader(String),
    #[error("invalid vertex record {index}: {reason}")]
    InvalidRecord { index: usize, reason: String },
    #[error("unreadable offset file {}", .0.display())]
    InvalidOffsetFile(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
