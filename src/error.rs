//! Error types for every layer of the crate
//!
//! Single-file failures inside a batch are captured per file (see
//! `icon::service::BatchResult`) and never escape the batch call.
//! Persistence failures are logged and swallowed in `state::persist`.

use std::path::PathBuf;

use thiserror::Error;
use uuid::Uuid;

/// Failures of the icon application layer
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IconError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to apply icon to {}", .0.display())]
    ApplyFailed(PathBuf),

    #[error("Failed to remove icon from {}", .0.display())]
    RemoveFailed(PathBuf),
}

/// Failures while decoding or encoding icon images
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Failed to decode image: {0}")]
    DecodingFailed(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<image::ImageError> for ImageError {
    fn from(err: image::ImageError) -> Self {
        ImageError::DecodingFailed(err.to_string())
    }
}

/// Failures of the icon store's import operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to copy {} into the icon library: {source}", .source_path.display())]
    CopyFailed {
        source_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] ImageError),
}

/// Failure to collect the result of a background task
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("Background task failed: {0}")]
    Join(String),
}

/// Failures of the application-level workflows
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Another operation is already running: {0}")]
    OperationInProgress(String),

    #[error("Unknown icon: {0}")]
    UnknownIcon(Uuid),

    #[error("Unknown preset: {0}")]
    UnknownPreset(Uuid),

    #[error("Invalid deep link: {0}")]
    InvalidDeepLink(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Task(#[from] TaskError),
}

pub type IconResult<T> = Result<T, IconError>;
pub type ImageResult<T> = Result<T, ImageError>;
pub type StoreResult<T> = Result<T, StoreError>;
pub type AppResult<T> = Result<T, AppError>;
