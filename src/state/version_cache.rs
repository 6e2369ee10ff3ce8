//! Host document versions of tracked (open) documents.

use std::collections::HashMap;

use crate::project::{DocumentKey, ProjectKey};

/// Maps a tracked document to the last version the editor reported for it.
///
/// Entries exist only while a document is open; lookups for anything else
/// return `None`, never a guess. Owned by the state updater, so every access
/// is serialized with snapshot mutation.
#[derive(Debug, Default)]
pub struct VersionCache {
    versions: HashMap<DocumentKey, i32>,
}

impl VersionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record or overwrite the version of a document.
    pub fn track(&mut self, document: DocumentKey, version: i32) {
        self.versions.insert(document, version);
    }

    pub fn try_get_version(&self, document: &DocumentKey) -> Option<i32> {
        self.versions.get(document).copied()
    }

    /// Stop tracking a document, returning its last version.
    pub fn untrack(&mut self, document: &DocumentKey) -> Option<i32> {
        self.versions.remove(document)
    }

    /// Stop tracking every document of a project.
    pub fn untrack_project(&mut self, project: &ProjectKey) -> usize {
        let before = self.versions.len();
        self.versions.retain(|key, _| &key.project != project);
        before - self.versions.len()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
