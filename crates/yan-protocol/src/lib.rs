//! Wire protocol for Yan sync.
//!
//! A pull response body and a push request body are both a *transfer
//! stream*: a sequence of self-contained objects, dependencies first,
//! closed by a single zero byte. This crate defines that framing, adapters
//! between item streams and byte streams, and the small JSON/header
//! vocabulary of the HTTP binding.

pub mod codec;
pub mod endpoint;
pub mod error;
pub mod message;
pub mod stream;

pub use codec::{Frame, TransferCodec, TransferItem, END_MARKER, MAX_HASH_LEN, MAX_ITEM_SIZE};
pub use endpoint::{branch_path, endpoints, headers, HealthResponse, HEAD_QUERY};
pub use error::{ProtocolError, ProtocolResult};
pub use message::{
    format_head, parse_head, HeadQuery, PushOutcome, PushResponse, HEAD_MISMATCH, PROTOCOL_VERSION,
};
pub use stream::{decode_stream, encode_stream};
