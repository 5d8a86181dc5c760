use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("unknown transfer item type: {0}")]
    UnknownItemType(u8),

    #[error("transfer stream ended before the end marker")]
    Truncated,

    #[error("transfer item too large: {size} bytes (max {max})")]
    ItemTooLarge { size: usize, max: usize },

    #[error("invalid hash: {0:?}")]
    InvalidHash(String),

    #[error("push rejected: {0}")]
    Rejected(String),
}

pub type ProtocolResult<T> = Result<T, ProtocolError>;
