//! Content-addressed object storage for Yan.
//!
//! Every piece of repository content -- blobs, trees, commits -- is stored as
//! an immutable object identified by its BLAKE3 hash (domain-separated by
//! object kind). Objects live in the versioned KV layer under
//! `["objects", <hex>]`.
//!
//! # Object Types
//!
//! - [`Blob`] -- raw content plus headers
//! - [`Tree`] -- directory listing mapping names to [`Node`]s
//! - [`Commit`] -- root tree, optional parent, message, timestamp
//!
//! # Design Rules
//!
//! 1. Objects are immutable once written; writes are idempotent.
//! 2. Reads re-hash the stored bytes and fail on mismatch.
//! 3. Trees are rebuilt bottom-up; empty directories are pruned.
//! 4. Objects are append-only. Nothing here deletes an object.

pub mod error;
pub mod kv;
pub mod object;
pub mod traits;
pub mod tree;
pub mod working;

pub use error::{StoreError, StoreResult};
pub use kv::KvObjectStore;
pub use object::{Commit, Node, Object, ObjectKind, StoredObject, Tree};
pub use traits::{BlobStorage, ObjectStore, ObjectStoreExt};
pub use tree::{build_tree, normalize_path, resolve, FileChanges};
pub use working::WorkingTree;
pub use yan_types::Blob;
