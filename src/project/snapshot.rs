//! Project, document and workspace snapshots.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;

use super::{DocumentKey, ProjectKey, SourceText, TextSource};
use crate::error::SyncResult;
use crate::generated::{DocumentProcessor, GeneratedOutput};

/// Build configuration of a project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectConfiguration {
    pub configuration_name: String,
    pub language_version: String,
    pub extensions: Vec<String>,
}

/// State derived from the wider workspace (compiler, references).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectWorkspaceState {
    pub language_version: Option<String>,
    /// Names of the symbols (components, tag helpers) available to documents.
    pub symbols: Vec<String>,
}

/// Project as described by the host: file, configuration, root namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostProject {
    key: ProjectKey,
    pub file_path: PathBuf,
    pub configuration: ProjectConfiguration,
    pub root_namespace: Option<String>,
}

impl HostProject {
    pub fn new(
        file_path: impl Into<PathBuf>,
        configuration: ProjectConfiguration,
        root_namespace: Option<String>,
    ) -> Self {
        let file_path = file_path.into();
        let key = ProjectKey::new(&file_path, &configuration.configuration_name);
        Self {
            key,
            file_path,
            configuration,
            root_namespace,
        }
    }

    pub fn key(&self) -> &ProjectKey {
        &self.key
    }

    /// Directory containing the project file; documents below it belong to
    /// the project.
    pub fn directory(&self) -> &Path {
        self.file_path.parent().unwrap_or(&self.file_path)
    }
}

/// Document as described by the host: absolute file path plus the path
/// relative to the project it is compiled as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostDocument {
    pub file_path: PathBuf,
    pub target_path: PathBuf,
}

impl HostDocument {
    pub fn new(file_path: impl Into<PathBuf>, target_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
            target_path: target_path.into(),
        }
    }
}

/// Immutable view of one document.
///
/// Text and generated output are computed on first request and memoized for
/// the lifetime of this snapshot; any change produces a fresh snapshot with
/// empty memo cells.
#[derive(Debug)]
pub struct DocumentSnapshot {
    key: DocumentKey,
    target_path: PathBuf,
    is_open: bool,
    text_source: Arc<dyn TextSource>,
    text: OnceCell<SourceText>,
    output: OnceCell<GeneratedOutput>,
}

impl DocumentSnapshot {
    pub(crate) fn new(
        project: ProjectKey,
        host: &HostDocument,
        is_open: bool,
        text_source: Arc<dyn TextSource>,
    ) -> Self {
        Self {
            key: DocumentKey::new(project, host.file_path.clone()),
            target_path: host.target_path.clone(),
            is_open,
            text_source,
            text: OnceCell::new(),
            output: OnceCell::new(),
        }
    }

    /// Successor snapshot with a new open flag and text source.
    ///
    /// `known_text` seeds the text cell when the caller already holds it.
    pub(crate) fn successor(
        &self,
        is_open: bool,
        text_source: Arc<dyn TextSource>,
        known_text: Option<SourceText>,
    ) -> Self {
        Self {
            key: self.key.clone(),
            target_path: self.target_path.clone(),
            is_open,
            text_source,
            text: OnceCell::new_with(known_text),
            output: OnceCell::new(),
        }
    }

    /// Same document under a reconfigured project. Loaded text is kept,
    /// generated output is not.
    pub(crate) fn with_project_change(&self) -> Self {
        Self {
            key: self.key.clone(),
            target_path: self.target_path.clone(),
            is_open: self.is_open,
            text_source: self.text_source.clone(),
            text: OnceCell::new_with(self.text.get().cloned()),
            output: OnceCell::new(),
        }
    }

    pub fn key(&self) -> &DocumentKey {
        &self.key
    }

    pub fn project_key(&self) -> &ProjectKey {
        &self.key.project
    }

    pub fn file_path(&self) -> &Path {
        &self.key.file_path
    }

    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    /// Text if it has already been loaded.
    pub fn try_get_text(&self) -> Option<&SourceText> {
        self.text.get()
    }

    /// Load (once) and return the document text.
    ///
    /// A failed load is not memoized; the next call retries.
    pub async fn text(&self) -> SyncResult<SourceText> {
        self.text
            .get_or_try_init(|| self.text_source.load(&self.key))
            .await
            .cloned()
    }

    /// Output if it has already been generated.
    pub fn try_get_generated_output(&self) -> Option<&GeneratedOutput> {
        self.output.get()
    }

    /// Generate (once) and return this document's derived artifact.
    ///
    /// `project` must be the snapshot this document belongs to.
    pub async fn generated_output(
        &self,
        project: &ProjectSnapshot,
        processor: &dyn DocumentProcessor,
    ) -> SyncResult<GeneratedOutput> {
        self.output
            .get_or_try_init(|| async {
                let source = self.text().await?;
                processor.process(project, self, &source).await
            })
            .await
            .cloned()
    }
}

/// Immutable view of one project and its documents.
#[derive(Debug, Clone)]
pub struct ProjectSnapshot {
    host: HostProject,
    workspace_state: Arc<ProjectWorkspaceState>,
    documents: IndexMap<PathBuf, Arc<DocumentSnapshot>>,
    version: u64,
}

impl ProjectSnapshot {
    pub(crate) fn new(host: HostProject) -> Self {
        Self {
            host,
            workspace_state: Arc::new(ProjectWorkspaceState::default()),
            documents: IndexMap::new(),
            version: 1,
        }
    }

    pub fn key(&self) -> &ProjectKey {
        self.host.key()
    }

    pub fn host(&self) -> &HostProject {
        &self.host
    }

    pub fn file_path(&self) -> &Path {
        &self.host.file_path
    }

    pub fn configuration(&self) -> &ProjectConfiguration {
        &self.host.configuration
    }

    pub fn root_namespace(&self) -> Option<&str> {
        self.host.root_namespace.as_deref()
    }

    pub fn workspace_state(&self) -> &ProjectWorkspaceState {
        &self.workspace_state
    }

    /// Monotonic per-project counter, bumped by every change.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn document(&self, file_path: &Path) -> Option<&Arc<DocumentSnapshot>> {
        self.documents.get(file_path)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Arc<DocumentSnapshot>> {
        self.documents.values()
    }

    pub fn document_file_paths(&self) -> impl Iterator<Item = &Path> {
        self.documents.keys().map(PathBuf::as_path)
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    fn bumped(&self) -> Self {
        let mut next = self.clone();
        next.version += 1;
        next
    }

    pub(crate) fn with_document(&self, document: Arc<DocumentSnapshot>) -> Self {
        let mut next = self.bumped();
        next.documents
            .insert(document.file_path().to_path_buf(), document);
        next
    }

    pub(crate) fn without_document(&self, file_path: &Path) -> Self {
        let mut next = self.bumped();
        next.documents.shift_remove(file_path);
        next
    }

    pub(crate) fn with_host(&self, host: HostProject) -> Self {
        let mut next = self.bumped();
        next.host = host;
        next.invalidate_outputs();
        next
    }

    pub(crate) fn with_workspace_state(&self, state: ProjectWorkspaceState) -> Self {
        let mut next = self.bumped();
        next.workspace_state = Arc::new(state);
        next.invalidate_outputs();
        next
    }

    // Generated output depends on project configuration and workspace state
    fn invalidate_outputs(&mut self) {
        for document in self.documents.values_mut() {
            *document = Arc::new(document.with_project_change());
        }
    }
}

/// Point-in-time view of every project; what readers load.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceSnapshot {
    revision: u64,
    projects: IndexMap<ProjectKey, Arc<ProjectSnapshot>>,
}

impl WorkspaceSnapshot {
    pub(crate) fn new(revision: u64, projects: IndexMap<ProjectKey, Arc<ProjectSnapshot>>) -> Self {
        Self { revision, projects }
    }

    /// Number of committed batches that produced this snapshot.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn project(&self, key: &ProjectKey) -> Option<&Arc<ProjectSnapshot>> {
        self.projects.get(key)
    }

    pub fn projects(&self) -> impl Iterator<Item = &Arc<ProjectSnapshot>> {
        self.projects.values()
    }

    pub fn project_count(&self) -> usize {
        self.projects.len()
    }

    pub fn document(&self, key: &DocumentKey) -> Option<&Arc<DocumentSnapshot>> {
        self.projects.get(&key.project)?.document(&key.file_path)
    }

    /// Project whose directory is the closest ancestor of `path`.
    pub fn owning_project(&self, path: &Path) -> Option<&Arc<ProjectSnapshot>> {
        self.projects
            .values()
            .filter(|project| path.starts_with(project.host().directory()))
            .max_by_key(|project| project.host().directory().components().count())
    }

    /// Every project that contains a document with this host path.
    pub fn projects_containing(&self, path: &Path) -> impl Iterator<Item = &Arc<ProjectSnapshot>> {
        self.projects
            .values()
            .filter(move |project| project.document(path).is_some())
    }

    pub(crate) fn projects_map(&self) -> &IndexMap<ProjectKey, Arc<ProjectSnapshot>> {
        &self.projects
    }
}
