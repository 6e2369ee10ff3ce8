//! Listeners that turn reconciled file changes into state updates.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use dashmap::DashMap;
use glob::Pattern;

use super::fs::file_name_matches;
use super::{FileChange, FileChangeKind, FileChangeListener, WatchError};
use crate::project::{
    FileTextSource, HostDocument, HostProject, ProjectInfo, ProjectInfoDeserializer, ProjectKey,
    TextSource,
};
use crate::state::{ProjectOperation, ProjectSnapshotManager};

/// Adds, removes and reloads documents as their files change.
///
/// A new file joins the project whose directory is its nearest ancestor.
/// Open documents are never reloaded from disk; the editor owns their text.
pub struct DocumentFileChangeListener {
    manager: Arc<ProjectSnapshotManager>,
    pattern: Pattern,
    text_source: Arc<dyn TextSource>,
}

impl DocumentFileChangeListener {
    pub fn new(
        manager: Arc<ProjectSnapshotManager>,
        document_pattern: &str,
    ) -> Result<Self, WatchError> {
        let pattern = Pattern::new(document_pattern).map_err(|e| WatchError::InvalidPattern {
            pattern: document_pattern.to_string(),
            reason: e.msg.to_string(),
        })?;
        Ok(Self {
            manager,
            pattern,
            text_source: Arc::new(FileTextSource::new()),
        })
    }

    /// Text source given to documents discovered on disk.
    pub fn with_text_source(mut self, text_source: Arc<dyn TextSource>) -> Self {
        self.text_source = text_source;
        self
    }

    fn operations(&self, change: &FileChange) -> Vec<ProjectOperation> {
        let snapshot = self.manager.snapshot();
        let path = change.path.as_path();

        match change.kind {
            FileChangeKind::Added => {
                if snapshot.projects_containing(path).next().is_some() {
                    crate::debug_event!("documents", "known", "{}", path.display());
                    return Vec::new();
                }
                let Some(project) = snapshot.owning_project(path) else {
                    crate::debug_event!("documents", "orphan", "{}", path.display());
                    return Vec::new();
                };
                let target_path = path
                    .strip_prefix(project.host().directory())
                    .unwrap_or(path);
                vec![ProjectOperation::AddDocument {
                    project: project.key().clone(),
                    document: HostDocument::new(path, target_path),
                    text_source: self.text_source.clone(),
                }]
            }
            FileChangeKind::Removed => snapshot
                .projects_containing(path)
                .map(|project| ProjectOperation::RemoveDocument {
                    project: project.key().clone(),
                    file_path: path.to_path_buf(),
                })
                .collect(),
            FileChangeKind::Changed => snapshot
                .projects_containing(path)
                .filter(|project| project.document(path).is_some_and(|doc| !doc.is_open()))
                .map(|project| ProjectOperation::ReloadDocument {
                    project: project.key().clone(),
                    file_path: path.to_path_buf(),
                    text_source: self.text_source.clone(),
                })
                .collect(),
        }
    }
}

#[async_trait]
impl FileChangeListener for DocumentFileChangeListener {
    fn name(&self) -> &str {
        "documents"
    }

    fn matches(&self, path: &Path) -> bool {
        file_name_matches(&self.pattern, path)
    }

    async fn file_changed(&self, change: &FileChange) -> Result<(), WatchError> {
        let operations = self.operations(change);
        if operations.is_empty() {
            return Ok(());
        }

        let report = self.manager.update(operations);
        crate::log_event!(
            "documents",
            format!("{:?}", change.kind).to_lowercase(),
            "{} ({} applied)",
            change.path.display(),
            report.applied
        );
        Ok(())
    }
}

/// A change to a project info file, with its contents read at most once.
pub struct ProjectInfoChangeEvent {
    change: FileChange,
    deserializer: Arc<dyn ProjectInfoDeserializer>,
    info: OnceLock<Option<ProjectInfo>>,
}

impl ProjectInfoChangeEvent {
    pub fn new(change: FileChange, deserializer: Arc<dyn ProjectInfoDeserializer>) -> Self {
        Self {
            change,
            deserializer,
            info: OnceLock::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.change.path
    }

    pub fn kind(&self) -> FileChangeKind {
        self.change.kind
    }

    /// Deserialized file contents. Failure is memoized as `None`; a removed
    /// file is never read.
    pub fn project_info(&self) -> Option<&ProjectInfo> {
        if self.change.kind == FileChangeKind::Removed {
            return None;
        }
        self.info
            .get_or_init(|| self.deserializer.deserialize_from_file(&self.change.path))
            .as_ref()
    }
}

/// Adds, updates and removes projects as their info files change.
pub struct ProjectFileChangeListener {
    manager: Arc<ProjectSnapshotManager>,
    deserializer: Arc<dyn ProjectInfoDeserializer>,
    file_name: String,
    text_source: Arc<dyn TextSource>,
    /// Project registered from each info file, so removal works once the
    /// file is gone.
    known: DashMap<PathBuf, ProjectKey>,
}

impl ProjectFileChangeListener {
    pub fn new(
        manager: Arc<ProjectSnapshotManager>,
        deserializer: Arc<dyn ProjectInfoDeserializer>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            manager,
            deserializer,
            file_name: file_name.into(),
            text_source: Arc::new(FileTextSource::new()),
            known: DashMap::new(),
        }
    }

    pub fn with_text_source(mut self, text_source: Arc<dyn TextSource>) -> Self {
        self.text_source = text_source;
        self
    }

    fn operations(&self, event: &ProjectInfoChangeEvent) -> Vec<ProjectOperation> {
        if event.kind() == FileChangeKind::Removed {
            return match self.known.remove(event.path()) {
                Some((_, key)) => vec![ProjectOperation::RemoveProject(key)],
                None => Vec::new(),
            };
        }

        let Some(info) = event.project_info() else {
            return Vec::new();
        };

        let base = event.path().parent().unwrap_or(Path::new(""));
        let host = HostProject::new(
            base.join(&info.file_path),
            info.configuration.clone(),
            info.root_namespace.clone(),
        );
        let documents: Vec<HostDocument> = info
            .host_documents()
            .map(|document| HostDocument {
                file_path: base.join(&document.file_path),
                ..document
            })
            .collect();
        let key = host.key().clone();

        let mut operations = Vec::new();
        if let Some(previous) = self.known.insert(event.path().to_path_buf(), key.clone()) {
            if previous != key {
                operations.push(ProjectOperation::RemoveProject(previous));
            }
        }

        let snapshot = self.manager.snapshot();
        match snapshot.project(&key) {
            None => {
                operations.push(ProjectOperation::AddProject(host));
                operations.extend(documents.into_iter().map(|document| {
                    ProjectOperation::AddDocument {
                        project: key.clone(),
                        document,
                        text_source: self.text_source.clone(),
                    }
                }));
            }
            Some(existing) => {
                if existing.host() != &host {
                    operations.push(ProjectOperation::UpdateProjectConfiguration(host));
                }
                for path in existing.document_file_paths() {
                    if !documents.iter().any(|document| document.file_path == path) {
                        operations.push(ProjectOperation::RemoveDocument {
                            project: key.clone(),
                            file_path: path.to_path_buf(),
                        });
                    }
                }
                for document in documents {
                    if existing.document(&document.file_path).is_none() {
                        operations.push(ProjectOperation::AddDocument {
                            project: key.clone(),
                            document,
                            text_source: self.text_source.clone(),
                        });
                    }
                }
            }
        }
        operations
    }
}

#[async_trait]
impl FileChangeListener for ProjectFileChangeListener {
    fn name(&self) -> &str {
        "projects"
    }

    fn matches(&self, path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| name == self.file_name.as_str())
    }

    async fn file_changed(&self, change: &FileChange) -> Result<(), WatchError> {
        let event = ProjectInfoChangeEvent::new(change.clone(), self.deserializer.clone());
        let operations = self.operations(&event);
        if operations.is_empty() {
            return Ok(());
        }

        let report = self.manager.update(operations);
        crate::log_event!(
            "projects",
            format!("{:?}", change.kind).to_lowercase(),
            "{} ({} applied, {} skipped)",
            change.path.display(),
            report.applied,
            report.failures.len()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{
        DocumentKey, JsonProjectInfoDeserializer, ProjectConfiguration, SourceText,
        StaticTextSource,
    };
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn static_source() -> Arc<dyn TextSource> {
        Arc::new(StaticTextSource::new(SourceText::new("disk", 0)))
    }

    fn manager_with_project() -> (Arc<ProjectSnapshotManager>, HostProject) {
        let manager = Arc::new(ProjectSnapshotManager::default());
        let project = HostProject::new("/repo/app.csproj", ProjectConfiguration::default(), None);
        manager.update([ProjectOperation::AddProject(project.clone())]);
        (manager, project)
    }

    #[tokio::test]
    async fn test_document_added_to_owning_project() {
        let (manager, project) = manager_with_project();
        let listener = DocumentFileChangeListener::new(manager.clone(), "*.razor")
            .unwrap()
            .with_text_source(static_source());

        listener
            .file_changed(&FileChange::added("/repo/Pages/Index.razor"))
            .await
            .unwrap();
        listener
            .file_changed(&FileChange::added("/elsewhere/Stray.razor"))
            .await
            .unwrap();

        let key = DocumentKey::new(project.key().clone(), "/repo/Pages/Index.razor");
        let document = manager.document(&key).unwrap();
        assert_eq!(document.target_path(), Path::new("Pages/Index.razor"));
        assert!(!document.is_open());
        assert_eq!(manager.project(project.key()).unwrap().document_count(), 1);
    }

    #[tokio::test]
    async fn test_document_changed_reloads_only_closed_documents() {
        let (manager, project) = manager_with_project();
        let listener = DocumentFileChangeListener::new(manager.clone(), "*.razor")
            .unwrap()
            .with_text_source(static_source());
        listener
            .file_changed(&FileChange::added("/repo/A.razor"))
            .await
            .unwrap();
        listener
            .file_changed(&FileChange::added("/repo/B.razor"))
            .await
            .unwrap();
        manager.update([ProjectOperation::OpenDocument {
            project: project.key().clone(),
            file_path: PathBuf::from("/repo/B.razor"),
            text: SourceText::new("editor", 3),
        }]);

        let before = manager.snapshot().revision();
        listener
            .file_changed(&FileChange::changed("/repo/A.razor"))
            .await
            .unwrap();
        assert_eq!(manager.snapshot().revision(), before + 1);

        listener
            .file_changed(&FileChange::changed("/repo/B.razor"))
            .await
            .unwrap();
        assert_eq!(manager.snapshot().revision(), before + 1);
    }

    #[tokio::test]
    async fn test_document_removed() {
        let (manager, project) = manager_with_project();
        let listener = DocumentFileChangeListener::new(manager.clone(), "*.razor")
            .unwrap()
            .with_text_source(static_source());
        listener
            .file_changed(&FileChange::added("/repo/A.razor"))
            .await
            .unwrap();

        listener
            .file_changed(&FileChange::removed("/repo/A.razor"))
            .await
            .unwrap();

        assert_eq!(manager.project(project.key()).unwrap().document_count(), 0);
    }

    struct CountingDeserializer {
        calls: AtomicUsize,
    }

    impl ProjectInfoDeserializer for CountingDeserializer {
        fn deserialize_from_file(&self, path: &Path) -> Option<ProjectInfo> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Some(ProjectInfo {
                file_path: path.with_file_name("app.csproj"),
                configuration: ProjectConfiguration::default(),
                root_namespace: None,
                documents: Vec::new(),
            })
        }
    }

    #[test]
    fn test_project_info_is_read_once() {
        let deserializer = Arc::new(CountingDeserializer {
            calls: AtomicUsize::new(0),
        });

        let event = ProjectInfoChangeEvent::new(
            FileChange::changed("/repo/project.razor.json"),
            deserializer.clone(),
        );
        assert!(event.project_info().is_some());
        assert!(event.project_info().is_some());
        assert_eq!(deserializer.calls.load(Ordering::SeqCst), 1);

        let removed = ProjectInfoChangeEvent::new(
            FileChange::removed("/repo/project.razor.json"),
            deserializer.clone(),
        );
        assert!(removed.project_info().is_none());
        assert_eq!(deserializer.calls.load(Ordering::SeqCst), 1);
    }

    fn write_info(path: &Path, namespace: &str, documents: &[&str]) {
        let documents: Vec<_> = documents
            .iter()
            .map(|name| serde_json::json!({ "filePath": name, "targetPath": name }))
            .collect();
        let info = serde_json::json!({
            "filePath": "app.csproj",
            "rootNamespace": namespace,
            "documents": documents,
        });
        std::fs::write(path, info.to_string()).unwrap();
    }

    #[tokio::test]
    async fn test_project_lifecycle_follows_info_file() {
        let temp_dir = TempDir::new().unwrap();
        let info_path = temp_dir.path().join("project.razor.json");
        let manager = Arc::new(ProjectSnapshotManager::default());
        let listener = ProjectFileChangeListener::new(
            manager.clone(),
            Arc::new(JsonProjectInfoDeserializer),
            "project.razor.json",
        )
        .with_text_source(static_source());
        assert!(listener.matches(&info_path));
        assert!(!listener.matches(&temp_dir.path().join("Index.razor")));

        write_info(&info_path, "App", &["Index.razor"]);
        listener
            .file_changed(&FileChange::added(&info_path))
            .await
            .unwrap();

        let key = ProjectKey::new(&temp_dir.path().join("app.csproj"), "");
        let project = manager.project(&key).unwrap();
        assert_eq!(project.root_namespace(), Some("App"));
        assert_eq!(project.document_count(), 1);

        write_info(&info_path, "App.Web", &["About.razor", "Index.razor"]);
        listener
            .file_changed(&FileChange::changed(&info_path))
            .await
            .unwrap();

        let project = manager.project(&key).unwrap();
        assert_eq!(project.root_namespace(), Some("App.Web"));
        assert_eq!(project.document_count(), 2);
        assert!(project.document(&temp_dir.path().join("About.razor")).is_some());

        std::fs::remove_file(&info_path).unwrap();
        listener
            .file_changed(&FileChange::removed(&info_path))
            .await
            .unwrap();
        assert!(manager.project(&key).is_none());
    }

    #[tokio::test]
    async fn test_malformed_info_file_is_ignored() {
        let temp_dir = TempDir::new().unwrap();
        let info_path = temp_dir.path().join("project.razor.json");
        std::fs::write(&info_path, "{ not json").unwrap();

        let manager = Arc::new(ProjectSnapshotManager::default());
        let listener = ProjectFileChangeListener::new(
            manager.clone(),
            Arc::new(JsonProjectInfoDeserializer),
            "project.razor.json",
        );

        listener
            .file_changed(&FileChange::added(&info_path))
            .await
            .unwrap();
        assert_eq!(manager.snapshot().project_count(), 0);
    }
}
