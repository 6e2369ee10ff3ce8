//! Change events raised after a batch commits.
//!
//! Events are broadcast so the state updater never waits for listeners;
//! each listener drains its own receiver.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::project::{DocumentKey, DocumentSnapshot, ProjectKey, ProjectSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectChangeKind {
    ProjectAdded,
    ProjectRemoved,
    ProjectChanged,
    DocumentAdded,
    DocumentRemoved,
    DocumentChanged,
}

/// One logical change, with the project snapshots on either side of it.
#[derive(Debug, Clone)]
pub struct ProjectChangeEvent {
    pub kind: ProjectChangeKind,
    pub project_key: ProjectKey,
    pub document_path: Option<PathBuf>,
    pub older: Option<Arc<ProjectSnapshot>>,
    pub newer: Option<Arc<ProjectSnapshot>>,
    /// Workspace revision of the batch that raised this event.
    pub revision: u64,
}

impl ProjectChangeEvent {
    pub fn document_key(&self) -> Option<DocumentKey> {
        self.document_path
            .as_ref()
            .map(|path| DocumentKey::new(self.project_key.clone(), path.clone()))
    }

    pub fn older_document(&self) -> Option<&Arc<DocumentSnapshot>> {
        self.older.as_ref()?.document(self.document_path.as_ref()?)
    }

    pub fn newer_document(&self) -> Option<&Arc<DocumentSnapshot>> {
        self.newer.as_ref()?.document(self.document_path.as_ref()?)
    }

    /// A document went from open to closed (or was removed while open).
    pub fn closes_document(&self) -> bool {
        let was_open = self.older_document().is_some_and(|doc| doc.is_open());
        let is_open = self.newer_document().is_some_and(|doc| doc.is_open());
        was_open && !is_open
    }
}

/// Fans change events out to every subscriber.
#[derive(Debug, Clone)]
pub struct ChangeBroadcaster {
    sender: broadcast::Sender<ProjectChangeEvent>,
}

impl ChangeBroadcaster {
    /// Create a new broadcaster with specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn send(&self, event: ProjectChangeEvent) {
        let kind = event.kind;
        match self.sender.send(event) {
            Ok(count) => {
                crate::debug_event!("broadcast", "sent", "{kind:?} to {count} subscribers");
            }
            Err(_) => {
                // No receivers, this is fine
                crate::debug_event!("broadcast", "dropped", "no subscribers for {kind:?}");
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProjectChangeEvent> {
        self.sender.subscribe()
    }
}
