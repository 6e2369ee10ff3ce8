//! Serialized project descriptions.
//!
//! A project info file is a JSON description of a project and its documents
//! written by the build system. The watcher turns these files into
//! project add/update/remove operations.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{HostDocument, HostProject, ProjectConfiguration};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectInfo {
    pub file_path: PathBuf,
    #[serde(default)]
    pub configuration: ProjectConfiguration,
    #[serde(default)]
    pub root_namespace: Option<String>,
    #[serde(default)]
    pub documents: Vec<DocumentInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInfo {
    pub file_path: PathBuf,
    pub target_path: PathBuf,
}

impl ProjectInfo {
    pub fn host_project(&self) -> HostProject {
        HostProject::new(
            self.file_path.clone(),
            self.configuration.clone(),
            self.root_namespace.clone(),
        )
    }

    pub fn host_documents(&self) -> impl Iterator<Item = HostDocument> + '_ {
        self.documents
            .iter()
            .map(|doc| HostDocument::new(doc.file_path.clone(), doc.target_path.clone()))
    }
}

/// Reads a project info file.
///
/// Returns `None` for anything that cannot be turned into a [`ProjectInfo`]
/// (missing file, malformed JSON); the reason is logged, not returned.
pub trait ProjectInfoDeserializer: Send + Sync {
    fn deserialize_from_file(&self, path: &Path) -> Option<ProjectInfo>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonProjectInfoDeserializer;

impl ProjectInfoDeserializer for JsonProjectInfoDeserializer {
    fn deserialize_from_file(&self, path: &Path) -> Option<ProjectInfo> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                crate::debug_event!("project-info", "unreadable", "{}: {e}", path.display());
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::warn!("[project-info] malformed {}: {e}", path.display());
                None
            }
        }
    }
}
