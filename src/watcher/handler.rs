//! File change values and the listener trait.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::WatchError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileChangeKind {
    Added,
    Removed,
    Changed,
}

/// A reconciled (or raw) change to one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub kind: FileChangeKind,
}

impl FileChange {
    pub fn new(path: impl Into<PathBuf>, kind: FileChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn added(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FileChangeKind::Added)
    }

    pub fn removed(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FileChangeKind::Removed)
    }

    pub fn changed(path: impl Into<PathBuf>) -> Self {
        Self::new(path, FileChangeKind::Changed)
    }
}

/// Receives reconciled file changes.
///
/// Listeners declare which paths they care about; the reconciler only calls
/// [`file_changed`](Self::file_changed) for matching paths.
#[async_trait]
pub trait FileChangeListener: Send + Sync {
    /// Listener name for logging.
    fn name(&self) -> &str;

    fn matches(&self, path: &Path) -> bool;

    async fn file_changed(&self, change: &FileChange) -> Result<(), WatchError>;
}
