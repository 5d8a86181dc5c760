//! Branch references for Yan.
//!
//! A branch is a mutable pointer from `[org, app, name]` to a commit hash.
//! Branch rows live in the versioned KV layer under
//! `["branches", org, app, <name segments>...]`, and every update is a
//! compare-and-swap against the row version that was read. That row is the
//! only shared mutable state in a repository.
//!
//! # Modules
//!
//! - [`error`]: Error types for ref operations
//! - [`types`]: [`BranchKey`], [`BranchHead`], [`PushStrategy`]
//! - [`names`]: Branch and remote name validation
//! - [`store`]: The KV-backed [`RefStore`]

pub mod error;
pub mod names;
pub mod store;
pub mod types;

pub use error::{RefError, Result};
pub use names::{validate_branch_name, validate_namespace, validate_remote_name};
pub use store::RefStore;
pub use types::{BranchHead, BranchKey, PushStrategy};
