use thiserror::Error;
use yan_types::RawHash;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("remote not configured: {0}")]
    RemoteNotFound(String),

    #[error("transfer item {claimed} hashes to {computed}")]
    HashMismatch { claimed: RawHash, computed: RawHash },

    #[error("object {id} references missing object {missing}")]
    MissingDependency { id: RawHash, missing: RawHash },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("remote returned {status}: {message}")]
    Remote { status: u16, message: String },

    #[error("protocol error: {0}")]
    Protocol(#[from] yan_protocol::ProtocolError),

    #[error("repository error: {0}")]
    Yan(#[from] yan_sdk::YanError),

    #[error("store error: {0}")]
    Store(#[from] yan_store::StoreError),

    #[error("ref error: {0}")]
    Ref(#[from] yan_refs::RefError),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for SyncError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

pub type SyncResult<T> = Result<T, SyncError>;
