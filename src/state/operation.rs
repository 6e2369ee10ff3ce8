//! Mutation operations accepted by the state updater.

use std::path::PathBuf;
use std::sync::Arc;

use super::StateError;
use crate::project::{
    HostDocument, HostProject, ProjectKey, ProjectWorkspaceState, SourceText, TextSource,
};

/// One step of an update batch.
#[derive(Debug, Clone)]
pub enum ProjectOperation {
    /// Start tracking a project.
    AddProject(HostProject),

    /// Forget a project, its documents and their tracked versions.
    RemoveProject(ProjectKey),

    /// Replace configuration and root namespace of an existing project.
    UpdateProjectConfiguration(HostProject),

    /// Replace the workspace-derived state of a project.
    UpdateWorkspaceState {
        project: ProjectKey,
        state: ProjectWorkspaceState,
    },

    /// Add a closed document whose text comes from `text_source`.
    AddDocument {
        project: ProjectKey,
        document: HostDocument,
        text_source: Arc<dyn TextSource>,
    },

    RemoveDocument {
        project: ProjectKey,
        file_path: PathBuf,
    },

    /// The editor opened a document; its version becomes tracked.
    OpenDocument {
        project: ProjectKey,
        file_path: PathBuf,
        text: SourceText,
    },

    /// The editor closed a document; text falls back to `text_source`.
    CloseDocument {
        project: ProjectKey,
        file_path: PathBuf,
        text_source: Arc<dyn TextSource>,
    },

    /// New text for a document. Tracked version is updated if it is open.
    ChangeDocumentText {
        project: ProjectKey,
        file_path: PathBuf,
        text: SourceText,
    },

    /// Reload a closed document from a new text source (changed on disk).
    ReloadDocument {
        project: ProjectKey,
        file_path: PathBuf,
        text_source: Arc<dyn TextSource>,
    },
}

impl ProjectOperation {
    /// Short name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::AddProject(_) => "add-project",
            Self::RemoveProject(_) => "remove-project",
            Self::UpdateProjectConfiguration(_) => "update-configuration",
            Self::UpdateWorkspaceState { .. } => "update-workspace-state",
            Self::AddDocument { .. } => "add-document",
            Self::RemoveDocument { .. } => "remove-document",
            Self::OpenDocument { .. } => "open-document",
            Self::CloseDocument { .. } => "close-document",
            Self::ChangeDocumentText { .. } => "change-document",
            Self::ReloadDocument { .. } => "reload-document",
        }
    }
}

/// Outcome of one batch.
///
/// Batches apply as far as they can: each failing operation is skipped and
/// listed in `failures`, the rest commit together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Operations that changed state.
    pub applied: usize,
    /// Operations that were skipped, in batch order.
    pub failures: Vec<StateError>,
    /// Workspace revision after the batch.
    pub revision: u64,
}

impl UpdateReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}
