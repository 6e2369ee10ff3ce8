//! Delivery of generated documents to the client.

use std::path::PathBuf;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::{Value, json};

use crate::client::{
    CapabilityProvider, ClientCapability, ClientNotifier, UPDATE_GENERATED_DOCUMENT,
};
use crate::project::{DocumentKey, ProjectKey};

/// Generated text for one host document at one tracked version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedDocument {
    pub project_key: ProjectKey,
    pub file_path: PathBuf,
    pub text: Arc<str>,
    pub host_version: i32,
}

impl GeneratedDocument {
    pub fn document_key(&self) -> DocumentKey {
        DocumentKey::new(self.project_key.clone(), self.file_path.clone())
    }

    /// Notification payload.
    pub fn to_params(&self) -> Value {
        json!({
            "projectKey": self.project_key.as_str(),
            "filePath": self.file_path.to_string_lossy(),
            "text": &*self.text,
            "hostDocumentVersion": self.host_version,
        })
    }
}

/// Sink for generated documents that passed version checks.
pub trait GeneratedDocumentPublisher: Send + Sync {
    fn publish(&self, document: GeneratedDocument);

    /// Drop any per-document state (the document closed or went away).
    fn forget(&self, document: &DocumentKey);
}

/// Publishes generated documents as client notifications.
///
/// Remembers the last `(version, text)` sent per document and skips exact
/// repeats, which happen when a document is reprocessed without changing.
pub struct ClientGeneratedDocumentPublisher {
    notifier: Arc<dyn ClientNotifier>,
    capabilities: Arc<dyn CapabilityProvider>,
    published: DashMap<DocumentKey, (i32, Arc<str>)>,
}

impl ClientGeneratedDocumentPublisher {
    pub fn new(
        notifier: Arc<dyn ClientNotifier>,
        capabilities: Arc<dyn CapabilityProvider>,
    ) -> Self {
        Self {
            notifier,
            capabilities,
            published: DashMap::new(),
        }
    }

    /// Number of documents with a remembered publication.
    pub fn published_count(&self) -> usize {
        self.published.len()
    }

    /// Forget every remembered publication, so the next publish of each
    /// document is sent even if unchanged.
    pub fn forget_all(&self) {
        let dropped = self.published.len();
        self.published.clear();
        crate::debug_event!("publisher", "forget all", "{dropped} documents");
    }
}

impl GeneratedDocumentPublisher for ClientGeneratedDocumentPublisher {
    fn publish(&self, document: GeneratedDocument) {
        if !self
            .capabilities
            .supports(ClientCapability::GeneratedDocuments)
        {
            return;
        }

        let key = document.document_key();
        let last = (document.host_version, document.text.clone());
        match self.published.entry(key) {
            Entry::Occupied(mut entry) => {
                if *entry.get() == last {
                    crate::debug_event!(
                        "publisher",
                        "unchanged",
                        "{} v{}",
                        document.file_path.display(),
                        document.host_version
                    );
                    return;
                }
                entry.insert(last);
            }
            Entry::Vacant(entry) => {
                entry.insert(last);
            }
        }

        crate::debug_event!(
            "publisher",
            "publish",
            "{} v{}",
            document.file_path.display(),
            document.host_version
        );
        self.notifier
            .send_notification_with(UPDATE_GENERATED_DOCUMENT, document.to_params());
    }

    fn forget(&self, document: &DocumentKey) {
        self.published.remove(document);
    }
}
