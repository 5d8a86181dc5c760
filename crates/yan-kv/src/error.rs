use crate::key::Key;

/// Errors from KV operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KvError {
    /// The key is absent, tombstoned, or not at the expected version.
    #[error("key not found: {key}{}", version.map(|v| format!(" at version {v}")).unwrap_or_default())]
    KeyNotFound { key: Key, version: Option<u64> },

    /// A create-only write found a live row.
    #[error("key already exists: {key}")]
    KeyExists { key: Key },

    /// A key segment is empty or outside the permitted character range.
    #[error("invalid key segment {segment:?}: {reason}")]
    InvalidKey { segment: String, reason: String },

    /// The physical backend failed.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result alias for KV operations.
pub type KvResult<T> = Result<T, KvError>;
