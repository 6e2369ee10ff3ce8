//! Wires the sync components into one running service.
//!
//! ```text
//! update() ──> ProjectSnapshotManager ──(broadcast)──> change pump
//!                                                         │
//!                      ┌──────────────────────────────────┼─────────────┐
//!          BackgroundDocumentGenerator          publisher.forget   RefreshPublisher(s)
//!                      │
//!          GeneratedDocumentSynchronizer ──> ClientGeneratedDocumentPublisher
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;

use crate::client::{
    CapabilityProvider, ClientCapability, ClientNotifier, DIAGNOSTICS_REFRESH,
    SEMANTIC_TOKENS_REFRESH,
};
use crate::config::{Settings, WatcherConfig};
use crate::debounce::RefreshPublisher;
use crate::generated::{
    BackgroundDocumentGenerator, ClientGeneratedDocumentPublisher, DocumentProcessedListener,
    DocumentProcessor, GeneratedDocumentPublisher, GeneratedDocumentSynchronizer,
};
use crate::project::JsonProjectInfoDeserializer;
use crate::state::{
    ProjectChangeEvent, ProjectChangeKind, ProjectOperation, ProjectSnapshotManager, UpdateReport,
};
use crate::watcher::{
    DocumentFileChangeListener, FileChangeDetector, ProjectFileChangeListener, WatchError,
};

/// Owns the manager and everything that reacts to its change events.
///
/// Must be created from within a tokio runtime.
pub struct SyncHost {
    manager: Arc<ProjectSnapshotManager>,
    publisher: Arc<ClientGeneratedDocumentPublisher>,
    generator: Arc<BackgroundDocumentGenerator>,
    refreshers: Arc<Vec<RefreshPublisher>>,
    detector: Option<FileChangeDetector>,
    shutdown: CancellationToken,
}

impl SyncHost {
    pub fn new(
        settings: &Settings,
        notifier: Arc<dyn ClientNotifier>,
        capabilities: Arc<dyn CapabilityProvider>,
        processor: Arc<dyn DocumentProcessor>,
    ) -> Self {
        let manager = Arc::new(ProjectSnapshotManager::new(settings.sync.event_capacity));
        let publisher = Arc::new(ClientGeneratedDocumentPublisher::new(
            notifier.clone(),
            capabilities.clone(),
        ));
        let synchronizer: Arc<dyn DocumentProcessedListener> = Arc::new(
            GeneratedDocumentSynchronizer::new(manager.clone(), publisher.clone()),
        );
        let generator = Arc::new(BackgroundDocumentGenerator::new(
            manager.clone(),
            processor,
            vec![synchronizer],
            settings.sync.generator_delay(),
        ));

        let refresh_delay = settings.sync.refresh_delay();
        let refreshers = Arc::new(vec![
            RefreshPublisher::new(
                SEMANTIC_TOKENS_REFRESH,
                ClientCapability::SemanticTokensRefresh,
                capabilities.clone(),
                notifier.clone(),
                refresh_delay,
            ),
            RefreshPublisher::new(
                DIAGNOSTICS_REFRESH,
                ClientCapability::DiagnosticsRefresh,
                capabilities,
                notifier,
                refresh_delay,
            ),
        ]);

        let shutdown = CancellationToken::new();
        tokio::spawn(pump_changes(
            manager.subscribe(),
            ChangeSinks {
                manager: manager.clone(),
                publisher: publisher.clone(),
                generator: generator.clone(),
                refreshers: refreshers.clone(),
            },
            shutdown.clone(),
        ));

        Self {
            manager,
            publisher,
            generator,
            refreshers,
            detector: None,
            shutdown,
        }
    }

    pub fn manager(&self) -> &Arc<ProjectSnapshotManager> {
        &self.manager
    }

    pub fn publisher(&self) -> &Arc<ClientGeneratedDocumentPublisher> {
        &self.publisher
    }

    /// Apply editor operations. See [`ProjectSnapshotManager::update`].
    pub fn update(&self, operations: impl IntoIterator<Item = ProjectOperation>) -> UpdateReport {
        self.manager.update(operations)
    }

    /// Discover and watch projects and documents under `root`.
    ///
    /// Replaces any previous watch. Returns the number of files found by the
    /// initial scan.
    pub async fn watch(
        &mut self,
        root: impl Into<PathBuf>,
        config: &WatcherConfig,
    ) -> Result<usize, WatchError> {
        if let Some(mut previous) = self.detector.take() {
            previous.stop();
        }

        let projects = ProjectFileChangeListener::new(
            self.manager.clone(),
            Arc::new(JsonProjectInfoDeserializer),
            config.project_info_file_name.clone(),
        );
        let documents =
            DocumentFileChangeListener::new(self.manager.clone(), &config.document_pattern)?;

        // Projects first so new documents find their owner in the same batch
        let mut detector = FileChangeDetector::builder(root)
            .config(config)
            .listener(Arc::new(projects))
            .listener(Arc::new(documents))
            .build()?;

        let found = detector.start().await?;
        crate::log_event!(
            "host",
            "watching",
            "{} ({found} files)",
            detector.root().display()
        );
        self.detector = Some(detector);
        Ok(found)
    }

    /// Stop watching and cancel every pending background batch.
    pub fn shutdown(&mut self) {
        self.shutdown.cancel();
        if let Some(mut detector) = self.detector.take() {
            detector.stop();
        }
        self.generator.dispose();
        for refresher in self.refreshers.iter() {
            refresher.dispose();
        }
        crate::debug_event!("host", "shutdown", "complete");
    }
}

impl Drop for SyncHost {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct ChangeSinks {
    manager: Arc<ProjectSnapshotManager>,
    publisher: Arc<ClientGeneratedDocumentPublisher>,
    generator: Arc<BackgroundDocumentGenerator>,
    refreshers: Arc<Vec<RefreshPublisher>>,
}

impl ChangeSinks {
    fn apply(&self, event: &ProjectChangeEvent) {
        self.generator.handle_change(event);

        match event.kind {
            ProjectChangeKind::ProjectRemoved => {
                if let Some(project) = &event.older {
                    for document in project.documents() {
                        self.publisher.forget(document.key());
                    }
                }
            }
            ProjectChangeKind::DocumentRemoved => {
                if let Some(key) = event.document_key() {
                    self.publisher.forget(&key);
                }
            }
            _ if event.closes_document() => {
                if let Some(key) = event.document_key() {
                    self.publisher.forget(&key);
                }
            }
            _ => {}
        }

        self.refresh();
    }

    /// Events were lost; treat every document as changed.
    ///
    /// Lost close events mean the client may have dropped documents the
    /// publisher still remembers, so all of them are sent again.
    fn resync(&self) {
        self.publisher.forget_all();
        let snapshot = self.manager.snapshot();
        let mut queued = 0;
        for project in snapshot.projects() {
            for document in project.documents() {
                if self.generator.enqueue(document.key().clone()) {
                    queued += 1;
                }
            }
        }
        crate::log_event!("host", "resync", "{queued} documents queued");
        self.refresh();
    }

    fn refresh(&self) {
        for refresher in self.refreshers.iter() {
            refresher.enqueue();
        }
    }
}

async fn pump_changes(
    mut events: broadcast::Receiver<ProjectChangeEvent>,
    sinks: ChangeSinks,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => break,

            received = events.recv() => match received {
                Ok(event) => sinks.apply(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("[host] missed {skipped} change events, resyncing");
                    sinks.resync();
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    crate::debug_event!("host", "pump stopped", "change events no longer observed");
}
