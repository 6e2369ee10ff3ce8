//! Cancellable directory traversal.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::{FileSystem, FsError, WalkError};

/// Finds every file matching a pattern below a root directory.
///
/// Ignored directories are skipped by name without being listed. A subtree
/// that cannot be listed is skipped; only a failure at the root fails the
/// walk.
#[derive(Clone)]
pub struct DirectoryWalker {
    fs: Arc<dyn FileSystem>,
}

impl DirectoryWalker {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    pub fn walk(
        &self,
        root: &Path,
        pattern: &str,
        ignored_directories: &[String],
        cancel: &CancellationToken,
    ) -> Result<Vec<PathBuf>, WalkError> {
        if cancel.is_cancelled() {
            return Err(WalkError::Cancelled);
        }

        let unreachable = |source: FsError| WalkError::RootUnreachable {
            root: root.to_path_buf(),
            source,
        };
        let mut files = self
            .fs
            .list_files(root, pattern, false)
            .map_err(unreachable)?;
        let mut pending = self.fs.list_directories(root).map_err(unreachable)?;
        pending.reverse();

        while let Some(directory) = pending.pop() {
            if cancel.is_cancelled() {
                return Err(WalkError::Cancelled);
            }

            if is_ignored(&directory, ignored_directories) {
                crate::debug_event!("walker", "ignored", "{}", directory.display());
                continue;
            }

            let listing = self
                .fs
                .list_files(&directory, pattern, false)
                .and_then(|found| {
                    let subdirectories = self.fs.list_directories(&directory)?;
                    Ok((found, subdirectories))
                });

            match listing {
                Ok((found, mut subdirectories)) => {
                    files.extend(found);
                    subdirectories.reverse();
                    pending.extend(subdirectories);
                }
                Err(FsError::NotFound { path } | FsError::PathTooLong { path }) => {
                    crate::debug_event!("walker", "skipped", "{}", path.display());
                }
                Err(e) => {
                    tracing::warn!("[walker] skipping {}: {e}", directory.display());
                }
            }
        }

        Ok(files)
    }
}

fn is_ignored(directory: &Path, ignored_directories: &[String]) -> bool {
    directory
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| ignored_directories.iter().any(|ignored| ignored == name))
}
