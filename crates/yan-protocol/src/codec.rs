use bytes::{BufMut, Bytes, BytesMut};
use yan_store::{ObjectKind, StoredObject};
use yan_types::RawHash;

use crate::error::{ProtocolError, ProtocolResult};

/// Type byte that closes a transfer stream.
pub const END_MARKER: u8 = 0;
/// Upper bound on the hash field. Real hashes are 64 hex characters.
pub const MAX_HASH_LEN: usize = 128;
/// Upper bound on a single item's data.
pub const MAX_ITEM_SIZE: usize = 64 * 1024 * 1024;

/// One object on the wire: enough to reconstruct exactly one stored object.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferItem {
    pub kind: ObjectKind,
    pub hash: RawHash,
    pub data: Vec<u8>,
}

impl TransferItem {
    /// Wrap a stored object, computing its hash.
    pub fn from_object(object: StoredObject) -> Self {
        Self {
            kind: object.kind,
            hash: object.compute_id(),
            data: object.data,
        }
    }

    pub fn into_object(self) -> StoredObject {
        StoredObject::new(self.kind, self.data)
    }
}

/// A decoded unit of a transfer stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    Item(TransferItem),
    End,
}

/// Codec for transfer stream framing.
///
/// Item layout: `[1 byte type][4 bytes hash len][hash hex][4 bytes data len][data]`,
/// lengths big-endian. A lone `0` type byte ends the stream.
pub struct TransferCodec;

impl TransferCodec {
    pub fn encode_item(item: &TransferItem) -> ProtocolResult<Bytes> {
        if item.data.len() > MAX_ITEM_SIZE {
            return Err(ProtocolError::ItemTooLarge {
                size: item.data.len(),
                max: MAX_ITEM_SIZE,
            });
        }
        let hash = item.hash.to_hex();
        let mut buf = BytesMut::with_capacity(1 + 4 + hash.len() + 4 + item.data.len());
        buf.put_u8(item.kind.as_byte());
        buf.put_u32(hash.len() as u32);
        buf.put_slice(hash.as_bytes());
        buf.put_u32(item.data.len() as u32);
        buf.put_slice(&item.data);
        Ok(buf.freeze())
    }

    pub fn encode_end() -> Bytes {
        Bytes::from_static(&[END_MARKER])
    }

    /// Decode one frame from the front of `buf`.
    ///
    /// Returns the frame and the number of bytes it occupied, or `None` if
    /// `buf` does not yet hold a complete frame. Errors are reported as soon
    /// as the offending field is visible, before the rest arrives.
    pub fn decode(buf: &[u8]) -> ProtocolResult<Option<(Frame, usize)>> {
        let Some(&tag) = buf.first() else {
            return Ok(None);
        };
        if tag == END_MARKER {
            return Ok(Some((Frame::End, 1)));
        }
        let kind = ObjectKind::from_byte(tag).ok_or(ProtocolError::UnknownItemType(tag))?;

        let mut pos = 1;
        let Some(hash_len) = read_len(buf, pos) else {
            return Ok(None);
        };
        pos += 4;
        if hash_len > MAX_HASH_LEN {
            return Err(ProtocolError::ItemTooLarge {
                size: hash_len,
                max: MAX_HASH_LEN,
            });
        }
        let Some(hash_text) = buf.get(pos..pos + hash_len) else {
            return Ok(None);
        };
        pos += hash_len;
        let hash = std::str::from_utf8(hash_text)
            .ok()
            .and_then(|text| RawHash::from_hex(text).ok())
            .ok_or_else(|| {
                ProtocolError::InvalidHash(String::from_utf8_lossy(hash_text).into_owned())
            })?;

        let Some(data_len) = read_len(buf, pos) else {
            return Ok(None);
        };
        pos += 4;
        if data_len > MAX_ITEM_SIZE {
            return Err(ProtocolError::ItemTooLarge {
                size: data_len,
                max: MAX_ITEM_SIZE,
            });
        }
        let Some(data) = buf.get(pos..pos + data_len) else {
            return Ok(None);
        };
        let item = TransferItem {
            kind,
            hash,
            data: data.to_vec(),
        };
        Ok(Some((Frame::Item(item), pos + data_len)))
    }
}

fn read_len(buf: &[u8], pos: usize) -> Option<usize> {
    let bytes: [u8; 4] = buf.get(pos..pos + 4)?.try_into().ok()?;
    Some(u32::from_be_bytes(bytes) as usize)
}
