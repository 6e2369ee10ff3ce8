//! Generated document pipeline.
//!
//! ```text
//! ProjectChangeEvent ──> BackgroundDocumentGenerator ──> DocumentProcessor
//!                                  │
//!                                  v
//!                        DocumentProcessedListener
//!                                  │
//!                     GeneratedDocumentSynchronizer (version check)
//!                                  │
//!                     GeneratedDocumentPublisher ──> ClientNotifier
//! ```

mod generator;
mod processor;
mod publisher;
mod synchronizer;

pub use generator::{BackgroundDocumentGenerator, DocumentProcessedListener};
pub use processor::{DocumentProcessor, GeneratedOutput, IdentityProcessor};
pub use publisher::{
    ClientGeneratedDocumentPublisher, GeneratedDocument, GeneratedDocumentPublisher,
};
pub use synchronizer::GeneratedDocumentSynchronizer;
