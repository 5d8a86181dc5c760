//! Error types for reference operations.

use thiserror::Error;

/// Errors that can occur during reference operations.
#[derive(Debug, Error)]
pub enum RefError {
    /// The branch name is invalid.
    #[error("invalid branch name: {name}: {reason}")]
    InvalidBranchName { name: String, reason: String },

    /// The org or app namespace is invalid.
    #[error("invalid namespace: {name}: {reason}")]
    InvalidNamespace { name: String, reason: String },

    /// The remote name is invalid.
    #[error("invalid remote name: {name}: {reason}")]
    InvalidRemoteName { name: String, reason: String },

    /// A branch row does not hold a commit hash.
    #[error("corrupt branch {name}: {reason}")]
    Corrupt { name: String, reason: String },

    /// Error from the underlying KV layer.
    #[error("kv error: {0}")]
    Kv(#[from] yan_kv::KvError),
}

/// Convenience type alias for ref operations.
pub type Result<T> = std::result::Result<T, RefError>;
