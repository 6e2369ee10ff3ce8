//! Document text and the sources it is loaded from.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use super::DocumentKey;
use crate::error::{SyncError, SyncResult};

/// Document text paired with the host version it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceText {
    pub text: Arc<str>,
    pub version: i32,
}

impl SourceText {
    pub fn new(text: impl Into<Arc<str>>, version: i32) -> Self {
        Self {
            text: text.into(),
            version,
        }
    }
}

/// Asynchronous provider of a document's current text.
#[async_trait]
pub trait TextSource: Send + Sync {
    async fn load(&self, document: &DocumentKey) -> SyncResult<SourceText>;
}

/// Serves text already held in memory (an open editor buffer).
#[derive(Debug, Clone)]
pub struct StaticTextSource {
    text: SourceText,
}

impl StaticTextSource {
    pub fn new(text: SourceText) -> Self {
        Self { text }
    }
}

#[async_trait]
impl TextSource for StaticTextSource {
    async fn load(&self, _document: &DocumentKey) -> SyncResult<SourceText> {
        Ok(self.text.clone())
    }
}

/// Reads the document's host file from disk.
///
/// Closed documents have no editor version; they are reported with the
/// version given at construction (0 by default).
#[derive(Debug, Clone, Copy, Default)]
pub struct FileTextSource {
    version: i32,
}

impl FileTextSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(version: i32) -> Self {
        Self { version }
    }
}

#[async_trait]
impl TextSource for FileTextSource {
    async fn load(&self, document: &DocumentKey) -> SyncResult<SourceText> {
        match tokio::fs::read_to_string(&document.file_path).await {
            Ok(text) => Ok(SourceText::new(text, self.version)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(SyncError::DocumentVanished {
                    path: document.file_path.clone(),
                })
            }
            Err(e) => Err(SyncError::ReadFailed {
                path: document.file_path.clone(),
                reason: e.to_string(),
            }),
        }
    }
}

impl fmt::Debug for dyn TextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TextSource")
    }
}
