//! Immutable project and document model.
//!
//! Every value here is a snapshot: a change produces a new value that
//! replaces the old one, nothing is mutated in place. Lazily computed parts
//! (document text, generated output) are memoized inside the snapshot.

mod info;
mod key;
mod snapshot;
mod text;

pub use info::{DocumentInfo, JsonProjectInfoDeserializer, ProjectInfo, ProjectInfoDeserializer};
pub use key::{DocumentKey, ProjectKey};
pub use snapshot::{
    DocumentSnapshot, HostDocument, HostProject, ProjectConfiguration, ProjectSnapshot,
    ProjectWorkspaceState, WorkspaceSnapshot,
};
pub use text::{FileTextSource, SourceText, StaticTextSource, TextSource};
