//! File change detection: initial scan plus OS notifications.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use glob::Pattern;
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::fs::file_name_matches;
use super::{
    DirectoryWalker, FileChange, FileChangeKind, FileChangeListener, FileSetReconciler,
    FileSystem, OsFileSystem, WalkError, WatchError,
};
use crate::config::WatcherConfig;

/// Translate one notify event into file changes.
///
/// Renames become a removal of the old path and an addition of the new one.
/// Metadata and access events are ignored.
pub fn classify(event: &Event) -> Vec<FileChange> {
    let each = |kind: FileChangeKind| -> Vec<FileChange> {
        event
            .paths
            .iter()
            .map(|path| FileChange::new(path.clone(), kind))
            .collect()
    };

    match &event.kind {
        EventKind::Create(_) => each(FileChangeKind::Added),
        EventKind::Remove(_) => each(FileChangeKind::Removed),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => each(FileChangeKind::Removed),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => each(FileChangeKind::Added),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => match event.paths.as_slice() {
            [from, to, ..] => vec![FileChange::removed(from.clone()), FileChange::added(to.clone())],
            _ => Vec::new(),
        },
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|path| {
                // Platform did not say which side of the rename this is
                if path.exists() {
                    FileChange::added(path.clone())
                } else {
                    FileChange::removed(path.clone())
                }
            })
            .collect(),
        EventKind::Modify(ModifyKind::Metadata(_)) => Vec::new(),
        EventKind::Modify(_) => each(FileChangeKind::Changed),
        _ => Vec::new(),
    }
}

/// Which paths the detector forwards.
#[derive(Debug)]
struct PathFilter {
    root: PathBuf,
    patterns: Vec<Pattern>,
    ignored_directories: Vec<String>,
}

impl PathFilter {
    fn accepts(&self, path: &Path) -> bool {
        if !self
            .patterns
            .iter()
            .any(|pattern| file_name_matches(pattern, path))
        {
            return false;
        }

        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        relative.parent().is_none_or(|directory| {
            !directory.components().any(|component| match component {
                Component::Normal(name) => name
                    .to_str()
                    .is_some_and(|name| self.ignored_directories.iter().any(|i| i == name)),
                _ => false,
            })
        })
    }
}

/// Watches a directory tree and feeds reconciled changes to listeners.
///
/// On [`start`](Self::start) the OS watcher is installed first, then the tree
/// is scanned and every existing match is reported as added. Changes that
/// race the scan are reconciled against it by the [`FileSetReconciler`].
pub struct FileChangeDetector {
    filter: Arc<PathFilter>,
    patterns: Vec<String>,
    walker: DirectoryWalker,
    reconciler: Arc<FileSetReconciler>,
    cancel: CancellationToken,
    watcher: Option<notify::RecommendedWatcher>,
}

impl FileChangeDetector {
    pub fn builder(root: impl Into<PathBuf>) -> FileChangeDetectorBuilder {
        FileChangeDetectorBuilder::new(root.into())
    }

    pub fn root(&self) -> &Path {
        &self.filter.root
    }

    /// Install the OS watcher and report every existing file as added.
    ///
    /// Returns the number of files found by the initial scan.
    pub async fn start(&mut self) -> Result<usize, WatchError> {
        if self.cancel.is_cancelled() {
            return Err(WatchError::InitFailed {
                reason: "detector was stopped".to_string(),
            });
        }
        if self.watcher.is_some() {
            return Err(WatchError::InitFailed {
                reason: "detector already started".to_string(),
            });
        }

        let (tx, rx) = mpsc::channel(1024);
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.blocking_send(res);
        })?;
        watcher
            .watch(&self.filter.root, RecursiveMode::Recursive)
            .map_err(|e| WatchError::PathWatchFailed {
                path: self.filter.root.clone(),
                reason: e.to_string(),
            })?;
        self.watcher = Some(watcher);

        tokio::spawn(pump(
            rx,
            self.filter.clone(),
            self.reconciler.clone(),
            self.cancel.clone(),
        ));

        let found = self.scan().await?;
        for path in &found {
            self.reconciler.enqueue(path, FileChangeKind::Added);
        }

        crate::log_event!(
            "detector",
            "started",
            "{} files under {}",
            found.len(),
            self.filter.root.display()
        );
        Ok(found.len())
    }

    /// Walk the tree once and return every matching file, sorted.
    pub async fn scan(&self) -> Result<Vec<PathBuf>, WatchError> {
        let walker = self.walker.clone();
        let root = self.filter.root.clone();
        let patterns = self.patterns.clone();
        let ignored = self.filter.ignored_directories.clone();
        let cancel = self.cancel.clone();

        let files = tokio::task::spawn_blocking(move || {
            let mut files = Vec::new();
            for pattern in &patterns {
                files.extend(walker.walk(&root, pattern, &ignored, &cancel)?);
            }
            files.sort();
            files.dedup();
            Ok::<_, WalkError>(files)
        })
        .await
        .map_err(|e| WatchError::EventError {
            details: e.to_string(),
        })??;

        crate::debug_event!("detector", "scanned", "{} files", files.len());
        Ok(files)
    }

    /// Stop watching and drop anything not yet delivered.
    pub fn stop(&mut self) {
        self.cancel.cancel();
        self.reconciler.dispose();
        if self.watcher.take().is_some() {
            crate::log_event!("detector", "stopped");
        }
    }
}

impl Drop for FileChangeDetector {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.reconciler.dispose();
    }
}

async fn pump(
    mut events: mpsc::Receiver<notify::Result<Event>>,
    filter: Arc<PathFilter>,
    reconciler: Arc<FileSetReconciler>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Some(Ok(event)) => {
                    for change in classify(&event) {
                        if filter.accepts(&change.path) {
                            reconciler.enqueue_change(change);
                        } else {
                            crate::debug_event!(
                                "detector",
                                "unmatched",
                                "{:?} {}",
                                event.kind,
                                change.path.display()
                            );
                        }
                    }
                }
                Some(Err(e)) => {
                    tracing::error!("[detector] file watch error: {e}");
                }
                None => break,
            },
        }
    }
}

/// Builder for [`FileChangeDetector`].
pub struct FileChangeDetectorBuilder {
    root: PathBuf,
    patterns: Vec<String>,
    ignored_directories: Vec<String>,
    debounce: Duration,
    listeners: Vec<Arc<dyn FileChangeListener>>,
    file_system: Arc<dyn FileSystem>,
}

impl FileChangeDetectorBuilder {
    fn new(root: PathBuf) -> Self {
        let defaults = WatcherConfig::default();
        Self {
            root,
            patterns: Vec::new(),
            ignored_directories: defaults.ignored_directories,
            debounce: Duration::from_millis(defaults.debounce_ms),
            listeners: Vec::new(),
            file_system: Arc::new(OsFileSystem),
        }
    }

    /// Take patterns, ignored directories and debounce from configuration.
    pub fn config(mut self, config: &WatcherConfig) -> Self {
        self.patterns = vec![
            config.document_pattern.clone(),
            config.project_info_file_name.clone(),
        ];
        self.ignored_directories = config.ignored_directories.clone();
        self.debounce = config.debounce();
        self
    }

    /// Add a file name glob to detect.
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    pub fn ignored_directories<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignored_directories = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn listener(mut self, listener: Arc<dyn FileChangeListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn file_system(mut self, file_system: Arc<dyn FileSystem>) -> Self {
        self.file_system = file_system;
        self
    }

    /// Build the detector. Must be called from within a tokio runtime.
    pub fn build(self) -> Result<FileChangeDetector, WatchError> {
        if self.patterns.is_empty() {
            return Err(WatchError::InitFailed {
                reason: "at least one file pattern is required".to_string(),
            });
        }

        let patterns = self
            .patterns
            .iter()
            .map(|pattern| {
                Pattern::new(pattern).map_err(|e| WatchError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.msg.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(FileChangeDetector {
            filter: Arc::new(PathFilter {
                root: self.root,
                patterns,
                ignored_directories: self.ignored_directories,
            }),
            patterns: self.patterns,
            walker: DirectoryWalker::new(self.file_system),
            reconciler: Arc::new(FileSetReconciler::new(self.listeners, self.debounce)),
            cancel: CancellationToken::new(),
            watcher: None,
        })
    }
}
