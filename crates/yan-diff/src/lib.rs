//! Diff engine for Yan.
//!
//! Compares two tree snapshots and produces a [`Changeset`]: the per-path
//! blob additions, removals, and modifications that turn one into the other.
//! A changeset converts back into tree-builder input, which is how a diff is
//! replayed on top of a different base during rebase.
//!
//! # Key Types
//!
//! - [`Changeset`] / [`Change`] -- path-keyed file changes

pub mod error;
pub mod tree_diff;

pub use error::{DiffError, DiffResult};
pub use tree_diff::{diff_trees, Change, Changeset};
