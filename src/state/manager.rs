//! The project snapshot manager: lock-free reads, serialized writes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwap;
use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::sync::broadcast;

use super::{
    ChangeBroadcaster, ProjectChangeEvent, ProjectChangeKind, ProjectOperation, StateError,
    UpdateReport, VersionCache,
};
use crate::project::{
    DocumentKey, DocumentSnapshot, ProjectKey, ProjectSnapshot, StaticTextSource,
    WorkspaceSnapshot,
};

/// Owner of the current [`WorkspaceSnapshot`].
///
/// All mutation goes through [`update`](Self::update), which holds the
/// updater lock for the whole batch and publishes the result with a single
/// atomic store. The version cache lives behind the same lock.
pub struct ProjectSnapshotManager {
    current: ArcSwap<WorkspaceSnapshot>,
    updater: Mutex<VersionCache>,
    broadcaster: ChangeBroadcaster,
}

impl ProjectSnapshotManager {
    /// Create an empty manager whose change channel buffers `event_capacity`
    /// events per lagging subscriber.
    pub fn new(event_capacity: usize) -> Self {
        Self {
            current: ArcSwap::from_pointee(WorkspaceSnapshot::default()),
            updater: Mutex::new(VersionCache::new()),
            broadcaster: ChangeBroadcaster::new(event_capacity),
        }
    }

    /// The last committed state. Never blocks.
    pub fn snapshot(&self) -> Arc<WorkspaceSnapshot> {
        self.current.load_full()
    }

    pub fn project(&self, key: &ProjectKey) -> Option<Arc<ProjectSnapshot>> {
        self.current.load().project(key).cloned()
    }

    pub fn document(&self, key: &DocumentKey) -> Option<Arc<DocumentSnapshot>> {
        self.current.load().document(key).cloned()
    }

    /// Receive every change event raised after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<ProjectChangeEvent> {
        self.broadcaster.subscribe()
    }

    /// Tracked host version of an open document.
    pub fn try_get_version(&self, document: &DocumentKey) -> Option<i32> {
        self.updater.lock().try_get_version(document)
    }

    pub fn tracked_document_count(&self) -> usize {
        self.updater.lock().len()
    }

    /// Apply a batch of operations.
    ///
    /// Operations run in order against a working copy. Failing operations
    /// are skipped and reported; if anything applied, the working copy is
    /// committed as the next revision and one event per applied change is
    /// broadcast. Events are sent before the lock is released so subscribers
    /// observe batches in revision order; sending never waits on a listener.
    pub fn update(&self, operations: impl IntoIterator<Item = ProjectOperation>) -> UpdateReport {
        let mut versions = self.updater.lock();
        let base = self.current.load_full();
        let mut batch = Batch::new(base.projects_map().clone(), &mut versions);
        let mut report = UpdateReport::default();

        for operation in operations {
            let name = operation.name();
            match batch.apply(operation) {
                Ok(()) => report.applied += 1,
                Err(e) => {
                    tracing::warn!("[state] {name} skipped: {e}");
                    report.failures.push(e);
                }
            }
        }

        let Batch {
            projects, events, ..
        } = batch;

        if report.applied == 0 {
            report.revision = base.revision();
            return report;
        }

        let revision = base.revision() + 1;
        self.current
            .store(Arc::new(WorkspaceSnapshot::new(revision, projects)));
        report.revision = revision;

        crate::debug_event!(
            "state",
            "committed",
            "revision {revision}, {} events, {} failures",
            events.len(),
            report.failures.len()
        );

        for mut event in events {
            event.revision = revision;
            self.broadcaster.send(event);
        }

        report
    }
}

impl Default for ProjectSnapshotManager {
    fn default() -> Self {
        Self::new(1024)
    }
}

/// Working copy of one batch.
struct Batch<'a> {
    projects: IndexMap<ProjectKey, Arc<ProjectSnapshot>>,
    versions: &'a mut VersionCache,
    events: Vec<ProjectChangeEvent>,
}

impl<'a> Batch<'a> {
    fn new(
        projects: IndexMap<ProjectKey, Arc<ProjectSnapshot>>,
        versions: &'a mut VersionCache,
    ) -> Self {
        Self {
            projects,
            versions,
            events: Vec::new(),
        }
    }

    fn apply(&mut self, operation: ProjectOperation) -> Result<(), StateError> {
        match operation {
            ProjectOperation::AddProject(host) => {
                let key = host.key().clone();
                if self.projects.contains_key(&key) {
                    return Err(StateError::ProjectAlreadyExists { key });
                }
                let newer = Arc::new(ProjectSnapshot::new(host));
                self.projects.insert(key.clone(), newer.clone());
                self.push(ProjectChangeKind::ProjectAdded, key, None, None, Some(newer));
            }

            ProjectOperation::RemoveProject(key) => {
                let older = self
                    .projects
                    .shift_remove(&key)
                    .ok_or_else(|| StateError::ProjectNotFound { key: key.clone() })?;
                self.versions.untrack_project(&key);
                self.push(ProjectChangeKind::ProjectRemoved, key, None, Some(older), None);
            }

            ProjectOperation::UpdateProjectConfiguration(host) => {
                let older = self.project(host.key())?;
                let newer = older.with_host(host);
                self.replace(ProjectChangeKind::ProjectChanged, older, newer, None);
            }

            ProjectOperation::UpdateWorkspaceState { project, state } => {
                let older = self.project(&project)?;
                let newer = older.with_workspace_state(state);
                self.replace(ProjectChangeKind::ProjectChanged, older, newer, None);
            }

            ProjectOperation::AddDocument {
                project,
                document,
                text_source,
            } => {
                let older = self.project(&project)?;
                if older.document(&document.file_path).is_some() {
                    return Err(StateError::DocumentAlreadyExists {
                        project,
                        path: document.file_path,
                    });
                }
                let snapshot = DocumentSnapshot::new(project, &document, false, text_source);
                let newer = older.with_document(Arc::new(snapshot));
                self.replace(
                    ProjectChangeKind::DocumentAdded,
                    older,
                    newer,
                    Some(document.file_path),
                );
            }

            ProjectOperation::RemoveDocument { project, file_path } => {
                let older = self.project(&project)?;
                let document = self.document(&older, &file_path)?;
                self.versions.untrack(document.key());
                let newer = older.without_document(&file_path);
                self.replace(
                    ProjectChangeKind::DocumentRemoved,
                    older,
                    newer,
                    Some(file_path),
                );
            }

            ProjectOperation::OpenDocument {
                project,
                file_path,
                text,
            } => {
                let older = self.project(&project)?;
                let document = self.document(&older, &file_path)?;
                self.versions.track(document.key().clone(), text.version);
                let source = Arc::new(StaticTextSource::new(text.clone()));
                let next = document.successor(true, source, Some(text));
                let newer = older.with_document(Arc::new(next));
                self.replace(
                    ProjectChangeKind::DocumentChanged,
                    older,
                    newer,
                    Some(file_path),
                );
            }

            ProjectOperation::CloseDocument {
                project,
                file_path,
                text_source,
            } => {
                let older = self.project(&project)?;
                let document = self.document(&older, &file_path)?;
                self.versions.untrack(document.key());
                let next = document.successor(false, text_source, None);
                let newer = older.with_document(Arc::new(next));
                self.replace(
                    ProjectChangeKind::DocumentChanged,
                    older,
                    newer,
                    Some(file_path),
                );
            }

            ProjectOperation::ChangeDocumentText {
                project,
                file_path,
                text,
            } => {
                let older = self.project(&project)?;
                let document = self.document(&older, &file_path)?;
                if document.is_open() {
                    self.versions.track(document.key().clone(), text.version);
                }
                let source = Arc::new(StaticTextSource::new(text.clone()));
                let next = document.successor(document.is_open(), source, Some(text));
                let newer = older.with_document(Arc::new(next));
                self.replace(
                    ProjectChangeKind::DocumentChanged,
                    older,
                    newer,
                    Some(file_path),
                );
            }

            ProjectOperation::ReloadDocument {
                project,
                file_path,
                text_source,
            } => {
                let older = self.project(&project)?;
                let document = self.document(&older, &file_path)?;
                if document.is_open() {
                    return Err(StateError::DocumentIsOpen {
                        project,
                        path: file_path,
                    });
                }
                let next = document.successor(false, text_source, None);
                let newer = older.with_document(Arc::new(next));
                self.replace(
                    ProjectChangeKind::DocumentChanged,
                    older,
                    newer,
                    Some(file_path),
                );
            }
        }

        Ok(())
    }

    fn project(&self, key: &ProjectKey) -> Result<Arc<ProjectSnapshot>, StateError> {
        self.projects
            .get(key)
            .cloned()
            .ok_or_else(|| StateError::ProjectNotFound { key: key.clone() })
    }

    fn document(
        &self,
        project: &ProjectSnapshot,
        file_path: &Path,
    ) -> Result<Arc<DocumentSnapshot>, StateError> {
        project
            .document(file_path)
            .cloned()
            .ok_or_else(|| StateError::DocumentNotFound {
                project: project.key().clone(),
                path: file_path.to_path_buf(),
            })
    }

    fn replace(
        &mut self,
        kind: ProjectChangeKind,
        older: Arc<ProjectSnapshot>,
        newer: ProjectSnapshot,
        document_path: Option<PathBuf>,
    ) {
        let key = older.key().clone();
        let newer = Arc::new(newer);
        self.projects.insert(key.clone(), newer.clone());
        self.push(kind, key, document_path, Some(older), Some(newer));
    }

    fn push(
        &mut self,
        kind: ProjectChangeKind,
        project_key: ProjectKey,
        document_path: Option<PathBuf>,
        older: Option<Arc<ProjectSnapshot>>,
        newer: Option<Arc<ProjectSnapshot>>,
    ) {
        self.events.push(ProjectChangeEvent {
            kind,
            project_key,
            document_path,
            older,
            newer,
            revision: 0,
        });
    }
}
