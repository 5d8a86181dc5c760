//! High-level SDK for Yan.
//!
//! [`Yan`] bundles an object store and a branch store over one KV store and
//! exposes the commit/branch API: writing commits from file changes, moving
//! branch heads under optimistic concurrency, ancestry queries, and the
//! diff/apply pair used to rebase.

pub mod error;
pub mod repository;

pub use error::{YanError, YanResult};
pub use repository::{FileEdits, HeadUpdate, Yan};

// Re-export key types
pub use yan_diff::{Change, Changeset};
pub use yan_refs::{BranchKey, PushStrategy};
pub use yan_store::{Commit, Node, Tree, WorkingTree};
pub use yan_types::{Blob, Hash, RawHash};
