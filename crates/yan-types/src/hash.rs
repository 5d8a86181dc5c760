use std::cmp::Ordering;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Marker for hashes whose object kind is only known at runtime.
#[derive(Debug)]
pub enum Untyped {}

/// A hash that has not been tied to a particular object kind.
pub type RawHash = Hash<Untyped>;

/// Content hash of a value of kind `T`.
///
/// A `Hash<T>` is the 32-byte BLAKE3 digest of the canonical serialization of
/// a `T`. The kind parameter is purely a compile-time tag: a `Hash<Tree>` can
/// never be passed where a `Hash<Commit>` is expected. Externally (JSON,
/// headers, the wire protocol) a hash is always 64 lowercase hex characters.
pub struct Hash<T> {
    bytes: [u8; 32],
    _kind: PhantomData<fn() -> T>,
}

impl<T> Hash<T> {
    /// Wrap a pre-computed digest.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self {
            bytes,
            _kind: PhantomData,
        }
    }

    /// The raw 32-byte digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.bytes[..4])
    }

    /// Parse from a 64-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            })?;
        Ok(Self::from_bytes(bytes))
    }

    /// Reinterpret this hash as addressing a different kind.
    pub fn cast<U>(self) -> Hash<U> {
        Hash::from_bytes(self.bytes)
    }

    /// Drop the kind tag.
    pub fn untyped(self) -> RawHash {
        self.cast()
    }
}

impl<T> Clone for Hash<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Hash<T> {}

impl<T> PartialEq for Hash<T> {
    fn eq(&self, other: &Self) -> bool {
        self.bytes == other.bytes
    }
}

impl<T> Eq for Hash<T> {}

impl<T> std::hash::Hash for Hash<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.bytes.hash(state);
    }
}

impl<T> PartialOrd for Hash<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Hash<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bytes.cmp(&other.bytes)
    }
}

impl<T> fmt::Debug for Hash<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash({})", self.short_hex())
    }
}

impl<T> fmt::Display for Hash<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl<T> FromStr for Hash<T> {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl<T> Serialize for Hash<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de, T> Deserialize<'de> for Hash<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Leaf;
    struct Branch;

    #[test]
    fn hex_roundtrip() {
        let h: Hash<Leaf> = Hash::from_bytes([0xab; 32]);
        let parsed: Hash<Leaf> = Hash::from_hex(&h.to_hex()).unwrap();
        assert_eq!(h, parsed);
    }

    #[test]
    fn display_is_full_hex() {
        let h: Hash<Leaf> = Hash::from_bytes([7; 32]);
        let display = format!("{h}");
        assert_eq!(display.len(), 64);
        assert_eq!(display, h.to_hex());
    }

    #[test]
    fn short_hex_is_8_chars() {
        let h: RawHash = Hash::from_bytes([1; 32]);
        assert_eq!(h.short_hex(), "01010101");
    }

    #[test]
    fn from_hex_rejects_bad_input() {
        assert!(matches!(
            RawHash::from_hex("zz"),
            Err(TypeError::InvalidHex(_))
        ));
        assert_eq!(
            RawHash::from_hex("abcd"),
            Err(TypeError::InvalidLength {
                expected: 32,
                actual: 2
            })
        );
    }

    #[test]
    fn cast_preserves_bytes() {
        let leaf: Hash<Leaf> = Hash::from_bytes([3; 32]);
        let branch: Hash<Branch> = leaf.cast();
        assert_eq!(leaf.as_bytes(), branch.as_bytes());
        assert_eq!(leaf.untyped(), branch.untyped());
    }

    #[test]
    fn serde_uses_hex_string() {
        let h: Hash<Leaf> = Hash::from_bytes([0x10; 32]);
        let json = serde_json::to_string(&h).unwrap();
        assert_eq!(json, format!("\"{}\"", h.to_hex()));
        let parsed: Hash<Leaf> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, h);
    }

    #[test]
    fn ordering_follows_bytes() {
        let a: RawHash = Hash::from_bytes([0; 32]);
        let b: RawHash = Hash::from_bytes([1; 32]);
        assert!(a < b);
    }

    proptest::proptest! {
        #[test]
        fn any_digest_roundtrips_through_hex(bytes in proptest::array::uniform32(proptest::num::u8::ANY)) {
            let h: RawHash = Hash::from_bytes(bytes);
            proptest::prop_assert_eq!(h.to_hex().parse::<RawHash>().unwrap(), h);
        }
    }
}
