//! Quiet-window debouncing on a tokio task.
//!
//! Every [`Debouncer::enqueue`] restarts the window. When the window passes
//! with nothing new, everything queued since the last flush is delivered to
//! the handler as one batch. Items queued while the handler runs start the
//! next window.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Receives the items of one quiet window.
#[async_trait]
pub trait BatchHandler<T>: Send + Sync + 'static {
    async fn handle_batch(&self, batch: Vec<T>);
}

/// Predicate checked on every enqueue; `false` drops the item.
pub type Gate = Arc<dyn Fn() -> bool + Send + Sync>;

/// Coalesces bursts of items into single handler calls.
///
/// Owns one background task. [`dispose`](Self::dispose) (or drop) cancels the
/// pending window and any handler call in flight; nothing is delivered after
/// that.
pub struct Debouncer<T> {
    name: &'static str,
    sender: mpsc::UnboundedSender<T>,
    gate: Option<Gate>,
    cancel: CancellationToken,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Start a debouncer. Must be called from within a tokio runtime.
    pub fn new(name: &'static str, delay: Duration, handler: Arc<dyn BatchHandler<T>>) -> Self {
        Self::build(name, delay, handler, None)
    }

    /// Start a debouncer that only accepts items while `gate` returns true.
    pub fn gated(
        name: &'static str,
        delay: Duration,
        handler: Arc<dyn BatchHandler<T>>,
        gate: Gate,
    ) -> Self {
        Self::build(name, delay, handler, Some(gate))
    }

    fn build(
        name: &'static str,
        delay: Duration,
        handler: Arc<dyn BatchHandler<T>>,
        gate: Option<Gate>,
    ) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        tokio::spawn(run(name, delay, receiver, handler, cancel.clone()));

        Self {
            name,
            sender,
            gate,
            cancel,
        }
    }

    /// Queue an item and restart the quiet window.
    ///
    /// Returns `false` if the item was dropped (disposed or gated off).
    pub fn enqueue(&self, item: T) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        if let Some(gate) = &self.gate {
            if !gate() {
                crate::debug_event!(self.name, "gated");
                return false;
            }
        }
        self.sender.send(item).is_ok()
    }

    /// Stop the debouncer, dropping anything pending.
    pub fn dispose(&self) {
        if !self.cancel.is_cancelled() {
            crate::debug_event!(self.name, "disposed");
            self.cancel.cancel();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run<T: Send + 'static>(
    name: &'static str,
    delay: Duration,
    mut receiver: mpsc::UnboundedReceiver<T>,
    handler: Arc<dyn BatchHandler<T>>,
    cancel: CancellationToken,
) {
    loop {
        let first = tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            item = receiver.recv() => match item {
                Some(item) => item,
                None => return,
            },
        };

        let mut batch = vec![first];
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                item = receiver.recv() => match item {
                    Some(item) => batch.push(item),
                    None => break,
                },
                _ = tokio::time::sleep(delay) => break,
            }
        }

        crate::debug_event!(name, "flush", "{} items", batch.len());

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return,
            _ = handler.handle_batch(batch) => {}
        }
    }
}
