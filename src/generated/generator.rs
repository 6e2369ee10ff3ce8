//! Background reprocessing of changed documents.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::{DocumentProcessor, GeneratedOutput};
use crate::debounce::{BatchHandler, Debouncer};
use crate::error::SyncError;
use crate::project::{DocumentKey, DocumentSnapshot};
use crate::state::{ProjectChangeEvent, ProjectChangeKind, ProjectSnapshotManager};

/// Notified after a document snapshot finished processing.
pub trait DocumentProcessedListener: Send + Sync {
    fn document_processed(&self, document: &DocumentSnapshot, output: &GeneratedOutput);
}

/// Debounces document changes and regenerates each changed document once.
///
/// Documents are looked up in the current snapshot when their batch runs, so
/// a burst of edits processes only the latest text, and documents removed in
/// the meantime are skipped.
pub struct BackgroundDocumentGenerator {
    debouncer: Debouncer<DocumentKey>,
}

struct ProcessDocuments {
    manager: Arc<ProjectSnapshotManager>,
    processor: Arc<dyn DocumentProcessor>,
    listeners: Vec<Arc<dyn DocumentProcessedListener>>,
}

#[async_trait]
impl BatchHandler<DocumentKey> for ProcessDocuments {
    async fn handle_batch(&self, batch: Vec<DocumentKey>) {
        let mut seen = HashSet::new();
        for key in batch {
            if !seen.insert(key.clone()) {
                continue;
            }

            let Some((project, document)) = self.manager.project(&key.project).and_then(|project| {
                let document = project.document(&key.file_path)?.clone();
                Some((project, document))
            }) else {
                crate::debug_event!("generator", "skipped", "{key} no longer exists");
                continue;
            };

            match document
                .generated_output(&project, self.processor.as_ref())
                .await
            {
                Ok(output) => {
                    for listener in &self.listeners {
                        listener.document_processed(&document, &output);
                    }
                }
                Err(SyncError::DocumentVanished { path }) => {
                    crate::debug_event!("generator", "vanished", "{}", path.display());
                }
                Err(e) => {
                    tracing::warn!("[generator] failed to process {key}: {e}");
                }
            }
        }
    }
}

impl BackgroundDocumentGenerator {
    pub fn new(
        manager: Arc<ProjectSnapshotManager>,
        processor: Arc<dyn DocumentProcessor>,
        listeners: Vec<Arc<dyn DocumentProcessedListener>>,
        delay: Duration,
    ) -> Self {
        let handler = Arc::new(ProcessDocuments {
            manager,
            processor,
            listeners,
        });
        Self {
            debouncer: Debouncer::new("generator", delay, handler),
        }
    }

    pub fn enqueue(&self, document: DocumentKey) -> bool {
        self.debouncer.enqueue(document)
    }

    /// Queue every document a change event invalidates. Returns how many
    /// were queued.
    pub fn handle_change(&self, event: &ProjectChangeEvent) -> usize {
        match event.kind {
            ProjectChangeKind::DocumentAdded | ProjectChangeKind::DocumentChanged => event
                .document_key()
                .map(|key| usize::from(self.enqueue(key)))
                .unwrap_or(0),
            ProjectChangeKind::ProjectAdded | ProjectChangeKind::ProjectChanged => {
                let Some(project) = &event.newer else {
                    return 0;
                };
                project
                    .documents()
                    .filter(|document| self.enqueue(document.key().clone()))
                    .count()
            }
            ProjectChangeKind::ProjectRemoved | ProjectChangeKind::DocumentRemoved => 0,
        }
    }

    pub fn dispose(&self) {
        self.debouncer.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SyncResult;
    use crate::generated::IdentityProcessor;
    use crate::project::{
        HostDocument, HostProject, ProjectConfiguration, ProjectSnapshot,
        ProjectWorkspaceState, SourceText, StaticTextSource,
    };
    use crate::state::ProjectOperation;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use parking_lot::Mutex;
    use tokio::time::sleep;

    const DELAY: Duration = Duration::from_millis(100);

    #[derive(Default)]
    struct Recording {
        processed: Mutex<Vec<(DocumentKey, GeneratedOutput)>>,
    }

    impl DocumentProcessedListener for Recording {
        fn document_processed(&self, document: &DocumentSnapshot, output: &GeneratedOutput) {
            self.processed
                .lock()
                .push((document.key().clone(), output.clone()));
        }
    }

    struct Fixture {
        manager: Arc<ProjectSnapshotManager>,
        project: HostProject,
        recording: Arc<Recording>,
        generator: BackgroundDocumentGenerator,
    }

    fn fixture() -> Fixture {
        let manager = Arc::new(ProjectSnapshotManager::default());
        let project = HostProject::new("/repo/app.csproj", ProjectConfiguration::default(), None);
        manager.update([ProjectOperation::AddProject(project.clone())]);

        let recording = Arc::new(Recording::default());
        let generator = BackgroundDocumentGenerator::new(
            manager.clone(),
            Arc::new(IdentityProcessor),
            vec![recording.clone() as Arc<dyn DocumentProcessedListener>],
            DELAY,
        );
        Fixture {
            manager,
            project,
            recording,
            generator,
        }
    }

    fn add(fixture: &Fixture, name: &str, text: &str) -> DocumentKey {
        let file_path = fixture.project.directory().join(name);
        fixture.manager.update([ProjectOperation::AddDocument {
            project: fixture.project.key().clone(),
            document: HostDocument::new(file_path.clone(), name),
            text_source: Arc::new(StaticTextSource::new(SourceText::new(text, 0))),
        }]);
        DocumentKey::new(fixture.project.key().clone(), file_path)
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_changes_process_once() {
        let fixture = fixture();
        let key = add(&fixture, "Index.razor", "hello");

        for _ in 0..3 {
            fixture.generator.enqueue(key.clone());
        }
        sleep(DELAY * 3).await;

        let processed = fixture.recording.processed.lock().clone();
        assert_eq!(processed.len(), 1);
        assert_eq!(processed[0].0, key);
        assert_eq!(&*processed[0].1.text, "hello");
    }

    #[tokio::test(start_paused = true)]
    async fn test_processes_latest_snapshot() {
        let fixture = fixture();
        let key = add(&fixture, "Index.razor", "old");

        fixture.generator.enqueue(key.clone());
        fixture.manager.update([ProjectOperation::ChangeDocumentText {
            project: key.project.clone(),
            file_path: key.file_path.clone(),
            text: SourceText::new("new", 2),
        }]);
        sleep(DELAY * 3).await;

        let processed = fixture.recording.processed.lock().clone();
        assert_eq!(processed.len(), 1);
        assert_eq!(&*processed[0].1.text, "new");
        assert_eq!(processed[0].1.host_version, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_removed_document_is_skipped() {
        let fixture = fixture();
        let key = add(&fixture, "Index.razor", "x");

        fixture.generator.enqueue(key.clone());
        fixture.manager.update([ProjectOperation::RemoveDocument {
            project: key.project.clone(),
            file_path: key.file_path.clone(),
        }]);
        sleep(DELAY * 3).await;

        assert!(fixture.recording.processed.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_change_events_select_documents() {
        let fixture = fixture();
        let mut events = fixture.manager.subscribe();
        add(&fixture, "A.razor", "a");
        add(&fixture, "B.razor", "b");

        let added = events.try_recv().unwrap();
        assert_eq!(fixture.generator.handle_change(&added), 1);

        let mut configured = fixture.project.clone();
        configured.root_namespace = Some("App".to_string());
        fixture
            .manager
            .update([ProjectOperation::UpdateProjectConfiguration(configured)]);
        let _second_add = events.try_recv().unwrap();
        let changed = events.try_recv().unwrap();
        assert_eq!(changed.kind, ProjectChangeKind::ProjectChanged);
        assert_eq!(fixture.generator.handle_change(&changed), 2);

        fixture
            .manager
            .update([ProjectOperation::RemoveProject(fixture.project.key().clone())]);
        let removed = events.try_recv().unwrap();
        assert_eq!(fixture.generator.handle_change(&removed), 0);
    }

    /// Appends the project's known symbols to the text.
    #[derive(Default)]
    struct SymbolProcessor {
        runs: AtomicUsize,
    }

    #[async_trait]
    impl DocumentProcessor for SymbolProcessor {
        async fn process(
            &self,
            project: &ProjectSnapshot,
            _document: &DocumentSnapshot,
            source: &SourceText,
        ) -> SyncResult<GeneratedOutput> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            let symbols = project.workspace_state().symbols.join(",");
            Ok(GeneratedOutput {
                text: format!("{}|{symbols}", source.text).into(),
                host_version: source.version,
            })
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_workspace_state_change_reprocesses_documents() {
        let manager = Arc::new(ProjectSnapshotManager::default());
        let project = HostProject::new("/repo/app.csproj", ProjectConfiguration::default(), None);
        let processor = Arc::new(SymbolProcessor::default());
        let recording = Arc::new(Recording::default());
        let generator = BackgroundDocumentGenerator::new(
            manager.clone(),
            processor.clone(),
            vec![recording.clone() as Arc<dyn DocumentProcessedListener>],
            DELAY,
        );
        let mut events = manager.subscribe();

        manager.update([
            ProjectOperation::AddProject(project.clone()),
            ProjectOperation::AddDocument {
                project: project.key().clone(),
                document: HostDocument::new("/repo/Index.razor", "Index.razor"),
                text_source: Arc::new(StaticTextSource::new(SourceText::new("page", 0))),
            },
        ]);
        while let Ok(event) = events.try_recv() {
            generator.handle_change(&event);
        }
        sleep(DELAY * 3).await;
        assert_eq!(processor.runs.load(Ordering::SeqCst), 1);

        manager.update([ProjectOperation::UpdateWorkspaceState {
            project: project.key().clone(),
            state: ProjectWorkspaceState {
                language_version: None,
                symbols: vec!["Counter".to_string()],
            },
        }]);
        let changed = events.try_recv().unwrap();
        assert_eq!(generator.handle_change(&changed), 1);
        sleep(DELAY * 3).await;

        assert_eq!(processor.runs.load(Ordering::SeqCst), 2);
        let processed = recording.processed.lock().clone();
        assert_eq!(&*processed.last().unwrap().1.text, "page|Counter");
    }
}
