//! Debounced client refresh notifications.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::{BatchHandler, Debouncer};
use crate::client::{CapabilityProvider, ClientCapability, ClientNotifier};

/// Turns bursts of "something changed" into one client notification.
///
/// Enqueues are ignored while the client does not support `capability`.
pub struct RefreshPublisher {
    method: &'static str,
    debouncer: Debouncer<()>,
    disposed: CancellationToken,
}

struct SendRefresh {
    method: &'static str,
    notifier: Arc<dyn ClientNotifier>,
    disposed: CancellationToken,
}

#[async_trait]
impl BatchHandler<()> for SendRefresh {
    async fn handle_batch(&self, batch: Vec<()>) {
        // dispose() may race a handler already running on another worker
        if self.disposed.is_cancelled() {
            crate::debug_event!("refresh", "discarded", "{} after dispose", self.method);
            return;
        }
        crate::debug_event!(
            "refresh",
            "publish",
            "{} after {} requests",
            self.method,
            batch.len()
        );
        self.notifier.send_notification(self.method);
    }
}

impl RefreshPublisher {
    pub fn new(
        method: &'static str,
        capability: ClientCapability,
        capabilities: Arc<dyn CapabilityProvider>,
        notifier: Arc<dyn ClientNotifier>,
        delay: Duration,
    ) -> Self {
        let disposed = CancellationToken::new();
        let handler = Arc::new(SendRefresh {
            method,
            notifier,
            disposed: disposed.clone(),
        });
        let gate = Arc::new(move || capabilities.supports(capability));
        Self {
            method,
            debouncer: Debouncer::gated("refresh", delay, handler, gate),
            disposed,
        }
    }

    pub fn method(&self) -> &'static str {
        self.method
    }

    /// Request a refresh. Returns `false` if the client does not want it.
    pub fn enqueue(&self) -> bool {
        self.debouncer.enqueue(())
    }

    pub fn dispose(&self) {
        self.disposed.cancel();
        self.debouncer.dispose();
    }
}

impl Drop for RefreshPublisher {
    fn drop(&mut self) {
        self.disposed.cancel();
    }
}
