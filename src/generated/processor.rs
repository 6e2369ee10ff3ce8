//! The document processing seam.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SyncResult;
use crate::project::{DocumentSnapshot, ProjectSnapshot, SourceText};

/// Derived artifact of one document snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedOutput {
    pub text: Arc<str>,
    /// Version of the source text this output was produced from.
    pub host_version: i32,
}

/// Produces generated output from a document's text.
///
/// Generation itself lives outside this crate; implementations wrap the
/// real pipeline. `project` is the snapshot the document belongs to, so its
/// configuration and workspace state are the ones to generate against.
#[async_trait]
pub trait DocumentProcessor: Send + Sync {
    async fn process(
        &self,
        project: &ProjectSnapshot,
        document: &DocumentSnapshot,
        source: &SourceText,
    ) -> SyncResult<GeneratedOutput>;
}

/// Passes the source text through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityProcessor;

#[async_trait]
impl DocumentProcessor for IdentityProcessor {
    async fn process(
        &self,
        _project: &ProjectSnapshot,
        _document: &DocumentSnapshot,
        source: &SourceText,
    ) -> SyncResult<GeneratedOutput> {
        Ok(GeneratedOutput {
            text: source.text.clone(),
            host_version: source.version,
        })
    }
}
