use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No file specified")]
    NoFileSpecified,

    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Malformed row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("Invalid concurrency {0}: must be a positive integer")]
    InvalidConcurrency(i64),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Task join error: {0}")]
    TaskJoin(String),
}

pub type Result<T> = std::result::Result<T, Error>;
