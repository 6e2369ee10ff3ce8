//! Single-writer project/document state.
//!
//! # Architecture
//!
//! ```text
//! update(batch) ──> [updater lock] ──> apply ops to working copy
//!                        │                 │ VersionCache (track/untrack)
//!                        │                 v
//!                        │           ArcSwap::store(new WorkspaceSnapshot)
//!                        v
//!              broadcast ProjectChangeEvent (in revision order)
//! ```
//!
//! Readers call [`ProjectSnapshotManager::snapshot`] and never block.
//! Listeners drain their own broadcast receivers, so a slow listener never
//! holds up the next batch.

mod change;
mod error;
mod manager;
mod operation;
mod version_cache;

pub use change::{ChangeBroadcaster, ProjectChangeEvent, ProjectChangeKind};
pub use error::StateError;
pub use manager::ProjectSnapshotManager;
pub use operation::{ProjectOperation, UpdateReport};
pub use version_cache::VersionCache;
