//! Error types for file discovery and watching.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from detector setup and listeners.
#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to initialize watcher: {reason}")]
    InitFailed { reason: String },

    #[error("Cannot watch path {path}: {reason}")]
    PathWatchFailed { path: PathBuf, reason: String },

    #[error("Invalid file pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("File system event error: {details}")]
    EventError { details: String },

    #[error("Listener '{listener}' failed for {path}: {reason}")]
    ListenerFailed {
        listener: String,
        path: PathBuf,
        reason: String,
    },

    #[error(transparent)]
    Walk(#[from] WalkError),
}

impl From<notify::Error> for WatchError {
    fn from(e: notify::Error) -> Self {
        WatchError::InitFailed {
            reason: e.to_string(),
        }
    }
}

/// Failure of a single file system listing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FsError {
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("Path too long: {path}")]
    PathTooLong { path: PathBuf },

    #[error("I/O error at {path}: {reason}")]
    Io { path: PathBuf, reason: String },

    #[error("Invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

#[cfg(target_os = "macos")]
const ENAMETOOLONG: i32 = 63;
#[cfg(windows)]
const ENAMETOOLONG: i32 = 206; // ERROR_FILENAME_EXCED_RANGE
#[cfg(not(any(target_os = "macos", windows)))]
const ENAMETOOLONG: i32 = 36;

impl FsError {
    pub fn from_io(path: &Path, error: &io::Error) -> Self {
        if error.kind() == io::ErrorKind::NotFound {
            FsError::NotFound {
                path: path.to_path_buf(),
            }
        } else if error.raw_os_error() == Some(ENAMETOOLONG) {
            FsError::PathTooLong {
                path: path.to_path_buf(),
            }
        } else {
            FsError::Io {
                path: path.to_path_buf(),
                reason: error.to_string(),
            }
        }
    }
}

/// Why a directory walk produced no result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalkError {
    #[error("Cannot walk {root}: {source}")]
    RootUnreachable { root: PathBuf, source: FsError },

    #[error("Directory walk cancelled")]
    Cancelled,
}
