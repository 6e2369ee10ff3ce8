//! Version-checked publication of generated documents.

use std::sync::Arc;

use super::{DocumentProcessedListener, GeneratedDocument, GeneratedDocumentPublisher, GeneratedOutput};
use crate::project::DocumentSnapshot;
use crate::state::ProjectSnapshotManager;

/// Publishes generated output only for versions the editor is tracking.
///
/// The version is looked up when processing completes, not when it was
/// scheduled. Output for a document that is not open, or that was produced
/// from a different version than the one tracked now, is dropped: the editor
/// could not reconcile it.
pub struct GeneratedDocumentSynchronizer {
    manager: Arc<ProjectSnapshotManager>,
    publisher: Arc<dyn GeneratedDocumentPublisher>,
}

impl GeneratedDocumentSynchronizer {
    pub fn new(
        manager: Arc<ProjectSnapshotManager>,
        publisher: Arc<dyn GeneratedDocumentPublisher>,
    ) -> Self {
        Self { manager, publisher }
    }
}

impl DocumentProcessedListener for GeneratedDocumentSynchronizer {
    fn document_processed(&self, document: &DocumentSnapshot, output: &GeneratedOutput) {
        let Some(version) = self.manager.try_get_version(document.key()) else {
            crate::debug_event!("sync", "untracked", "{}", document.file_path().display());
            return;
        };

        if output.host_version != version {
            crate::debug_event!(
                "sync",
                "stale",
                "{} output v{} tracked v{version}",
                document.file_path().display(),
                output.host_version
            );
            return;
        }

        self.publisher.publish(GeneratedDocument {
            project_key: document.project_key().clone(),
            file_path: document.file_path().to_path_buf(),
            text: output.text.clone(),
            host_version: version,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{
        DocumentKey, HostDocument, HostProject, ProjectConfiguration, SourceText,
        StaticTextSource,
    };
    use crate::state::ProjectOperation;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingPublisher {
        published: Mutex<Vec<GeneratedDocument>>,
    }

    impl GeneratedDocumentPublisher for RecordingPublisher {
        fn publish(&self, document: GeneratedDocument) {
            self.published.lock().push(document);
        }

        fn forget(&self, _document: &DocumentKey) {}
    }

    struct Fixture {
        manager: Arc<ProjectSnapshotManager>,
        publisher: Arc<RecordingPublisher>,
        synchronizer: GeneratedDocumentSynchronizer,
        key: DocumentKey,
    }

    fn fixture() -> Fixture {
        let manager = Arc::new(ProjectSnapshotManager::default());
        let project = HostProject::new("/repo/app.csproj", ProjectConfiguration::default(), None);
        let file_path = project.directory().join("Index.razor");
        manager.update([
            ProjectOperation::AddProject(project.clone()),
            ProjectOperation::AddDocument {
                project: project.key().clone(),
                document: HostDocument::new(file_path.clone(), "Index.razor"),
                text_source: Arc::new(StaticTextSource::new(SourceText::new("", 0))),
            },
        ]);

        let publisher = Arc::new(RecordingPublisher::default());
        let synchronizer = GeneratedDocumentSynchronizer::new(manager.clone(), publisher.clone());
        Fixture {
            manager,
            publisher,
            synchronizer,
            key: DocumentKey::new(project.key().clone(), file_path),
        }
    }

    fn open(fixture: &Fixture, version: i32) {
        fixture.manager.update([ProjectOperation::OpenDocument {
            project: fixture.key.project.clone(),
            file_path: fixture.key.file_path.clone(),
            text: SourceText::new("text", version),
        }]);
    }

    fn output(version: i32) -> GeneratedOutput {
        GeneratedOutput {
            text: "generated".into(),
            host_version: version,
        }
    }

    fn process(fixture: &Fixture, version: i32) {
        let document = fixture.manager.document(&fixture.key).unwrap();
        fixture
            .synchronizer
            .document_processed(&document, &output(version));
    }

    #[test]
    fn test_tracked_version_is_published() {
        let fixture = fixture();
        open(&fixture, 1337);

        process(&fixture, 1337);

        let published = fixture.publisher.published.lock().clone();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].host_version, 1337);
        assert_eq!(published[0].document_key(), fixture.key);
        assert_eq!(&*published[0].text, "generated");
    }

    #[test]
    fn test_untracked_document_is_not_published() {
        let fixture = fixture();

        process(&fixture, 0);

        assert!(fixture.publisher.published.lock().is_empty());
    }

    #[test]
    fn test_stale_output_is_suppressed() {
        let fixture = fixture();
        open(&fixture, 5);
        fixture.manager.update([ProjectOperation::ChangeDocumentText {
            project: fixture.key.project.clone(),
            file_path: fixture.key.file_path.clone(),
            text: SourceText::new("newer", 6),
        }]);

        process(&fixture, 5);

        assert!(fixture.publisher.published.lock().is_empty());
    }

    #[test]
    fn test_version_is_checked_at_publish_time() {
        let fixture = fixture();
        open(&fixture, 2);
        let document = fixture.manager.document(&fixture.key).unwrap();

        // Closed while processing was in flight
        fixture.manager.update([ProjectOperation::CloseDocument {
            project: fixture.key.project.clone(),
            file_path: fixture.key.file_path.clone(),
            text_source: Arc::new(StaticTextSource::new(SourceText::new("", 0))),
        }]);
        fixture
            .synchronizer
            .document_processed(&document, &output(2));

        assert!(fixture.publisher.published.lock().is_empty());
    }
}
