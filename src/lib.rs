//! Project/document state synchronization for editor tooling backends.
//!
//! Tracks immutable snapshots of projects and documents as an editor edits
//! them, republishes generated documents only for versions the editor can
//! reconcile against, and coalesces change notifications to the client.
//!
//! # Architecture
//!
//! ```text
//! editor ops ──> ProjectSnapshotManager ──(ProjectChangeEvent)──> SyncHost
//!                   │ VersionCache                                  │
//!                   │                          BackgroundDocumentGenerator
//!                   │                                               │
//!                   └──── try_get_version ──── GeneratedDocumentSynchronizer
//!                                                                   │
//! fs events ──> FileChangeDetector ──> FileSetReconciler      ClientNotifier
//!                                           │                       ▲
//!                                  FileChangeListener        RefreshPublisher
//! ```

pub mod client;
pub mod config;
pub mod debounce;
pub mod error;
pub mod generated;
pub mod host;
pub mod logging;
pub mod project;
pub mod state;
pub mod watcher;

pub use client::{
    CapabilityProvider, ChannelClientNotifier, ClientCapabilities, ClientCapability,
    ClientNotifier, OutgoingNotification,
};
pub use config::Settings;
pub use debounce::{BatchHandler, Debouncer, RefreshPublisher};
pub use error::{SyncError, SyncResult};
pub use generated::{
    BackgroundDocumentGenerator, ClientGeneratedDocumentPublisher, DocumentProcessedListener,
    DocumentProcessor, GeneratedDocument, GeneratedDocumentPublisher,
    GeneratedDocumentSynchronizer, GeneratedOutput, IdentityProcessor,
};
pub use host::SyncHost;
pub use project::{
    DocumentKey, DocumentSnapshot, HostDocument, HostProject, ProjectConfiguration, ProjectKey,
    ProjectSnapshot, ProjectWorkspaceState, SourceText, TextSource, WorkspaceSnapshot,
};
pub use state::{
    ProjectChangeEvent, ProjectChangeKind, ProjectOperation, ProjectSnapshotManager, StateError,
    UpdateReport, VersionCache,
};
pub use watcher::{
    DirectoryWalker, FileChange, FileChangeDetector, FileChangeKind, FileChangeListener,
    FileSetReconciler, FileSystem, OsFileSystem, WatchError,
};
