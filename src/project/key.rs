use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Stable identity of one logical project.
///
/// Derived from the project file path plus a disambiguator (usually the
/// configuration name), so one project file built in two configurations
/// yields two keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectKey(Arc<str>);

impl ProjectKey {
    pub fn new(project_file: &Path, disambiguator: &str) -> Self {
        let normalized = normalize_path(project_file);
        if disambiguator.is_empty() {
            Self(normalized.into())
        } else {
            Self(format!("{normalized}#{disambiguator}").into())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a document: owning project plus host file path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    pub project: ProjectKey,
    pub file_path: PathBuf,
}

impl DocumentKey {
    pub fn new(project: ProjectKey, file_path: impl Into<PathBuf>) -> Self {
        Self {
            project,
            file_path: file_path.into(),
        }
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.file_path.display(), self.project)
    }
}

/// Separator-insensitive spelling of a path: `\` becomes `/` and trailing
/// separators are dropped.
fn normalize_path(path: &Path) -> String {
    let raw = path.to_string_lossy().replace('\\', "/");
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}
