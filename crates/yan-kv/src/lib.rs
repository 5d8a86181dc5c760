//! Versioned key-value storage for Yan.
//!
//! Every row carries a version that starts at 1 and increments by exactly one
//! on each successful mutation. Writers name the version they expect to
//! overwrite; a stale expectation fails instead of silently clobbering the
//! row. Deleted rows are kept as tombstones so the version sequence never
//! restarts.
//!
//! # Layers
//!
//! - [`KvBackend`] -- three physical primitives over encoded string keys
//!   (point read, compare-and-swap write, range scan)
//! - [`InMemoryBackend`] -- `BTreeMap`-based backend for tests and embedding
//! - [`KvStore`] -- versioning semantics, implemented once on top of any backend
//!
//! # Key Encoding
//!
//! A [`Key`] is an ordered list of segments. Segments are joined with `#` and
//! the whole key is wrapped in `#` as well, so a prefix scan for `[a]` cannot
//! match `[aa]`. Segments are limited to printable ASCII 36..=126.

pub mod backend;
pub mod error;
pub mod key;
pub mod memory;
pub mod store;

pub use backend::{KvBackend, Row};
pub use error::{KvError, KvResult};
pub use key::Key;
pub use memory::InMemoryBackend;
pub use store::{KvStore, ListOptions};
