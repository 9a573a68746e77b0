//! Error types for the photo grouper

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for photo grouper operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the photo grouper
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to scan {path}: {source}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Source folder does not exist or is not a directory: {0}")]
    SourceNotFound(PathBuf),

    #[error("Not enough disk space to place {path}: need {required} bytes, {available} available")]
    InsufficientSpace {
        path: PathBuf,
        required: u64,
        available: u64,
    },

    #[error("Cannot write to {path}: {message}")]
    NotWritable { path: PathBuf, message: String },

    #[error("Could not find a free file name for {path}")]
    NameExhausted { path: PathBuf },

    #[error("Failed to read EXIF data from {path}: {message}")]
    ExifRead { path: PathBuf, message: String },

    #[error("Failed to read RAW metadata from {path}: {message}")]
    RawMetadata { path: PathBuf, message: String },

    #[error("Failed to extract video metadata from {path}: {message}")]
    VideoMetadata { path: PathBuf, message: String },

    #[error("{tool} not found. Please install it and ensure it is in PATH")]
    ToolNotFound { tool: &'static str },

    #[error("Invalid project name '{name}': {reason}")]
    InvalidProjectName { name: String, reason: String },

    #[error("Invalid project mapping {path}: {message}")]
    Mapping { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error is a destination policy violation rather than a plain I/O failure
    pub fn is_policy_violation(&self) -> bool {
        matches!(
            self,
            Error::InsufficientSpace { .. } | Error::NotWritable { .. }
        )
    }
}
