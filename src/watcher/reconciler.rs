//! Debounced reconciliation of raw file events.
//!
//! Editors and build tools produce noisy event streams: a save can be a
//! remove followed by an add, a temp file can appear and vanish within
//! milliseconds. Events are held until the stream goes quiet, then reduced
//! per path to at most one net change.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indexmap::IndexMap;

use super::{FileChange, FileChangeKind, FileChangeListener};
use crate::debounce::{BatchHandler, Debouncer};

/// Net effect of the raw events seen for one path.
#[derive(Debug, Default)]
struct PathHistory {
    /// Add/Remove sequence with consecutive duplicates collapsed.
    flips: Vec<FileChangeKind>,
    /// A `Changed` arrived after the last Add/Remove.
    changed_since_flip: bool,
}

impl PathHistory {
    fn record(&mut self, kind: FileChangeKind) {
        match kind {
            FileChangeKind::Changed => self.changed_since_flip = true,
            FileChangeKind::Added | FileChangeKind::Removed => {
                if self.flips.last() != Some(&kind) {
                    self.flips.push(kind);
                }
                self.changed_since_flip = false;
            }
        }
    }

    fn resolve(&self) -> Option<FileChangeKind> {
        // Adjacent Add/Remove pairs cancel; an odd remainder is the last flip
        if self.flips.len() % 2 == 1 {
            self.flips.last().copied()
        } else if self.changed_since_flip {
            Some(FileChangeKind::Changed)
        } else {
            None
        }
    }
}

/// Reduce a batch of raw events to at most one change per path.
///
/// Output is ordered by each path's first appearance in the batch.
pub fn reconcile(changes: impl IntoIterator<Item = FileChange>) -> Vec<FileChange> {
    let mut histories: IndexMap<PathBuf, PathHistory> = IndexMap::new();
    for change in changes {
        histories.entry(change.path).or_default().record(change.kind);
    }

    histories
        .into_iter()
        .filter_map(|(path, history)| history.resolve().map(|kind| FileChange { path, kind }))
        .collect()
}

/// Buffers raw file events and delivers reconciled changes to listeners
/// once the event stream has been quiet for the debounce window.
///
/// Listeners run in registration order; each sees every matching change of
/// a batch before the next one runs.
pub struct FileSetReconciler {
    debouncer: Debouncer<FileChange>,
}

struct Dispatch {
    listeners: Vec<Arc<dyn FileChangeListener>>,
}

#[async_trait]
impl BatchHandler<FileChange> for Dispatch {
    async fn handle_batch(&self, batch: Vec<FileChange>) {
        let raw = batch.len();
        let changes = reconcile(batch);
        crate::debug_event!(
            "reconciler",
            "reconciled",
            "{raw} events into {} changes",
            changes.len()
        );

        // Listener-major, so projects exist before their documents arrive
        for listener in &self.listeners {
            for change in changes.iter().filter(|change| listener.matches(&change.path)) {
                if let Err(e) = listener.file_changed(change).await {
                    tracing::error!("[{}] listener error: {e}", listener.name());
                }
            }
        }
    }
}

impl FileSetReconciler {
    /// Start a reconciler. Must be called from within a tokio runtime.
    pub fn new(listeners: Vec<Arc<dyn FileChangeListener>>, delay: Duration) -> Self {
        let handler = Arc::new(Dispatch { listeners });
        Self {
            debouncer: Debouncer::new("reconciler", delay, handler),
        }
    }

    pub fn enqueue(&self, path: impl AsRef<Path>, kind: FileChangeKind) -> bool {
        self.enqueue_change(FileChange::new(path.as_ref(), kind))
    }

    pub fn enqueue_change(&self, change: FileChange) -> bool {
        self.debouncer.enqueue(change)
    }

    /// Drop pending events; nothing is delivered afterwards.
    pub fn dispose(&self) {
        self.debouncer.dispose();
    }
}
