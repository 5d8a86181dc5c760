//! Error types for the diff crate.

/// Errors that can occur during diff operations.
#[derive(Debug, thiserror::Error)]
pub enum DiffError {
    /// Store operation failed (missing or corrupt tree).
    #[error("store error: {0}")]
    Store(#[from] yan_store::StoreError),
}

/// Convenience alias for diff results.
pub type DiffResult<T> = Result<T, DiffError>;
