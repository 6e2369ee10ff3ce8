//! File system access used for discovery.

use std::path::{Path, PathBuf};

use glob::Pattern;
use walkdir::WalkDir;

use super::FsError;

/// Directory and file listing.
pub trait FileSystem: Send + Sync {
    /// Immediate subdirectories of `path`.
    fn list_directories(&self, path: &Path) -> Result<Vec<PathBuf>, FsError>;

    /// Files under `path` whose file name matches the glob `pattern`.
    fn list_files(
        &self,
        path: &Path,
        pattern: &str,
        recursive: bool,
    ) -> Result<Vec<PathBuf>, FsError>;
}

/// The real file system. Listings are sorted by path.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

pub(crate) fn compile_pattern(pattern: &str) -> Result<Pattern, FsError> {
    Pattern::new(pattern).map_err(|e| FsError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

pub(crate) fn file_name_matches(pattern: &Pattern, path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| pattern.matches(name))
}

fn walkdir_error(root: &Path, error: walkdir::Error) -> FsError {
    let path = error.path().unwrap_or(root).to_path_buf();
    match error.io_error() {
        Some(io) => FsError::from_io(&path, io),
        None => FsError::Io {
            path,
            reason: error.to_string(),
        },
    }
}

impl FileSystem for OsFileSystem {
    fn list_directories(&self, path: &Path) -> Result<Vec<PathBuf>, FsError> {
        let entries = std::fs::read_dir(path).map_err(|e| FsError::from_io(path, &e))?;

        let mut directories = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| FsError::from_io(path, &e))?;
            let file_type = entry
                .file_type()
                .map_err(|e| FsError::from_io(&entry.path(), &e))?;
            if file_type.is_dir() {
                directories.push(entry.path());
            }
        }
        directories.sort();
        Ok(directories)
    }

    fn list_files(
        &self,
        path: &Path,
        pattern: &str,
        recursive: bool,
    ) -> Result<Vec<PathBuf>, FsError> {
        let matcher = compile_pattern(pattern)?;
        let max_depth = if recursive { usize::MAX } else { 1 };

        let mut files = Vec::new();
        for entry in WalkDir::new(path)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(false)
        {
            let entry = entry.map_err(|e| walkdir_error(path, e))?;
            if entry.file_type().is_file() && file_name_matches(&matcher, entry.path()) {
                files.push(entry.into_path());
            }
        }
        files.sort();
        Ok(files)
    }
}
