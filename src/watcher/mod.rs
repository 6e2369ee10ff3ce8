//! File discovery and change detection.
//!
//! # Architecture
//!
//! ```text
//! FileChangeDetector
//!   - DirectoryWalker (initial scan, over FileSystem)
//!   - notify::RecommendedWatcher (live events)
//!         |
//!   FileSetReconciler (debounce + per-path net change)
//!         |
//!    +----------------+
//!    |                |
//! DocumentFile...  ProjectFile...      (FileChangeListener)
//!    \                /
//!   ProjectSnapshotManager::update
//! ```

mod detector;
mod error;
mod fs;
mod handler;
mod listeners;
mod reconciler;
mod walker;

pub use detector::{FileChangeDetector, FileChangeDetectorBuilder, classify};
pub use error::{FsError, WalkError, WatchError};
pub use fs::{FileSystem, OsFileSystem};
pub use handler::{FileChange, FileChangeKind, FileChangeListener};
pub use listeners::{DocumentFileChangeListener, ProjectFileChangeListener, ProjectInfoChangeEvent};
pub use reconciler::{FileSetReconciler, reconcile};
pub use walker::DirectoryWalker;
