//! Errors reported by the collaborators the synchronization core depends on.

use std::path::PathBuf;
use thiserror::Error;

/// Failures from text sources and document processors.
///
/// None of these are fatal: callers degrade to "no update delivered".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error("Document vanished: {path}")]
    DocumentVanished { path: PathBuf },

    #[error("Failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("Processing failed for {path}: {reason}")]
    ProcessingFailed { path: PathBuf, reason: String },
}

pub type SyncResult<T> = Result<T, SyncError>;
