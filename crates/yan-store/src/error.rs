use yan_types::RawHash;

/// Errors from object store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The requested object was not found.
    #[error("object not found: {0}")]
    NotFound(RawHash),

    /// Content hash mismatch on read (data corruption).
    #[error("hash mismatch for {id}: computed {computed}")]
    HashMismatch { id: RawHash, computed: RawHash },

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The object data is malformed or of the wrong kind.
    #[error("corrupt object {id}: {reason}")]
    CorruptObject { id: RawHash, reason: String },

    /// A path with no usable segments.
    #[error("invalid path: {0:?}")]
    InvalidPath(String),

    /// Error from the underlying KV layer.
    #[error("kv error: {0}")]
    Kv(#[from] yan_kv::KvError),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
