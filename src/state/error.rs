//! Error types for snapshot mutation.

use std::path::PathBuf;
use thiserror::Error;

use crate::project::ProjectKey;

/// Why a single operation of a batch was skipped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    #[error("Project not found: {key}")]
    ProjectNotFound { key: ProjectKey },

    #[error("Project already exists: {key}")]
    ProjectAlreadyExists { key: ProjectKey },

    #[error("Document {path} not found in project {project}")]
    DocumentNotFound { project: ProjectKey, path: PathBuf },

    #[error("Document {path} already exists in project {project}")]
    DocumentAlreadyExists { project: ProjectKey, path: PathBuf },

    #[error("Document {path} is open in the editor; disk reload skipped")]
    DocumentIsOpen { project: ProjectKey, path: PathBuf },
}
