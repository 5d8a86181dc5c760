use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use yan_crypto::ContentHasher;
use yan_types::{Blob, Hash, RawHash};

use crate::error::{StoreError, StoreResult};

/// The kind of object stored. The discriminant is the wire type byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ObjectKind {
    Blob = 1,
    Tree = 2,
    Commit = 3,
}

impl ObjectKind {
    pub fn as_byte(self) -> u8 {
        self as u8
    }

    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Blob),
            2 => Some(Self::Tree),
            3 => Some(Self::Commit),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blob => "blob",
            Self::Tree => "tree",
            Self::Commit => "commit",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "blob" => Some(Self::Blob),
            "tree" => Some(Self::Tree),
            "commit" => Some(Self::Commit),
            _ => None,
        }
    }

    /// The domain-separated hasher for this kind.
    pub fn hasher(self) -> ContentHasher {
        match self {
            Self::Blob => ContentHasher::BLOB,
            Self::Tree => ContentHasher::TREE,
            Self::Commit => ContentHasher::COMMIT,
        }
    }
}

impl std::fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored object: kind tag + canonical bytes.
///
/// `StoredObject` is the unit of storage and of transfer. The store never
/// interprets `data`; only the typed [`Object`] impls do.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredObject {
    pub kind: ObjectKind,
    pub data: Vec<u8>,
}

impl StoredObject {
    pub fn new(kind: ObjectKind, data: Vec<u8>) -> Self {
        Self { kind, data }
    }

    /// Compute the content-addressed ID for this object.
    pub fn compute_id(&self) -> RawHash {
        self.kind.hasher().hash(&self.data)
    }
}

/// A typed, content-addressed object with a canonical encoding.
pub trait Object: Sized {
    const KIND: ObjectKind;

    /// Canonical bytes. Equal values must always encode identically.
    fn encode(&self) -> StoreResult<Vec<u8>>;

    fn decode(data: &[u8]) -> StoreResult<Self>;

    fn to_stored_object(&self) -> StoreResult<StoredObject> {
        Ok(StoredObject::new(Self::KIND, self.encode()?))
    }

    fn from_stored_object(obj: &StoredObject) -> StoreResult<Self> {
        if obj.kind != Self::KIND {
            return Err(StoreError::CorruptObject {
                id: obj.compute_id(),
                reason: format!("expected {}, got {}", Self::KIND, obj.kind),
            });
        }
        Self::decode(&obj.data)
    }

    fn hash(&self) -> StoreResult<Hash<Self>> {
        Ok(Self::KIND.hasher().hash(&self.encode()?))
    }
}

// ---------------------------------------------------------------------------
// Blob
// ---------------------------------------------------------------------------

impl Object for Blob {
    const KIND: ObjectKind = ObjectKind::Blob;

    /// Content headers and body, bincode-encoded. The KV `version` header is
    /// not content and is left out.
    fn encode(&self) -> StoreResult<Vec<u8>> {
        bincode::serialize(&(self.content_metadata(), &self.body))
            .map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn decode(data: &[u8]) -> StoreResult<Self> {
        let (metadata, body): (BTreeMap<String, String>, Option<Vec<u8>>) =
            bincode::deserialize(data).map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Blob { body, metadata })
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

/// A tree entry: either a file (blob) or a subdirectory (tree).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "hash", rename_all = "lowercase")]
pub enum Node {
    Blob(Hash<Blob>),
    Tree(Hash<Tree>),
}

impl Node {
    pub fn untyped(&self) -> RawHash {
        match self {
            Self::Blob(h) => h.untyped(),
            Self::Tree(h) => h.untyped(),
        }
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::Blob(_) => ObjectKind::Blob,
            Self::Tree(_) => ObjectKind::Tree,
        }
    }
}

/// Directory listing object. Entries are ordered by name, so the JSON
/// encoding (and hence the hash) is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tree {
    pub entries: BTreeMap<String, Node>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

impl Object for Tree {
    const KIND: ObjectKind = ObjectKind::Tree;

    fn encode(&self) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn decode(data: &[u8]) -> StoreResult<Self> {
        serde_json::from_slice(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Commit
// ---------------------------------------------------------------------------

/// A point in history: a root tree plus at most one parent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub tree: Hash<Tree>,
    pub parent: Option<Hash<Commit>>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Commit {
    /// A commit stamped with the current time.
    pub fn new(tree: Hash<Tree>, parent: Option<Hash<Commit>>, message: impl Into<String>) -> Self {
        Self {
            tree,
            parent,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }
}

impl Object for Commit {
    const KIND: ObjectKind = ObjectKind::Commit;

    fn encode(&self) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn decode(data: &[u8]) -> StoreResult<Self> {
        serde_json::from_slice(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_byte_roundtrip() {
        for kind in [ObjectKind::Blob, ObjectKind::Tree, ObjectKind::Commit] {
            assert_eq!(ObjectKind::from_byte(kind.as_byte()), Some(kind));
            assert_eq!(ObjectKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(ObjectKind::from_byte(0), None);
        assert_eq!(ObjectKind::from_byte(4), None);
    }

    #[test]
    fn blob_hash_ignores_version_header() {
        let plain = Blob::from("content");
        let versioned = Blob::from("content").with_version(9);
        assert_eq!(plain.hash().unwrap(), versioned.hash().unwrap());
    }

    #[test]
    fn blob_hash_covers_content_headers() {
        let plain = Blob::from("content");
        let typed = Blob::from("content").with_header("content-type", "text/plain");
        assert_ne!(plain.hash().unwrap(), typed.hash().unwrap());
    }

    #[test]
    fn blob_encoding_roundtrip() {
        let blob = Blob::from("x").with_header("a", "b");
        let decoded = Blob::decode(&blob.encode().unwrap()).unwrap();
        assert_eq!(decoded, blob);
    }

    #[test]
    fn node_serializes_with_kind_tag() {
        let h: Hash<Blob> = Hash::from_bytes([1; 32]);
        let json = serde_json::to_value(Node::Blob(h)).unwrap();
        assert_eq!(json["kind"], "blob");
        assert_eq!(json["hash"], h.to_hex());
    }

    #[test]
    fn tree_hash_is_order_independent() {
        let a: Hash<Blob> = Hash::from_bytes([1; 32]);
        let b: Hash<Blob> = Hash::from_bytes([2; 32]);
        let mut t1 = Tree::new();
        t1.entries.insert("a".into(), Node::Blob(a));
        t1.entries.insert("b".into(), Node::Blob(b));
        let mut t2 = Tree::new();
        t2.entries.insert("b".into(), Node::Blob(b));
        t2.entries.insert("a".into(), Node::Blob(a));
        assert_eq!(t1.hash().unwrap(), t2.hash().unwrap());
    }

    #[test]
    fn commit_roundtrip_preserves_hash() {
        let commit = Commit::new(Hash::from_bytes([5; 32]), None, "init");
        let stored = commit.to_stored_object().unwrap();
        let decoded = Commit::from_stored_object(&stored).unwrap();
        assert_eq!(decoded, commit);
        assert_eq!(stored.compute_id(), commit.hash().unwrap().untyped());
    }

    #[test]
    fn wrong_kind_is_corrupt() {
        let stored = Blob::from("x").to_stored_object().unwrap();
        assert!(matches!(
            Tree::from_stored_object(&stored),
            Err(StoreError::CorruptObject { .. })
        ));
    }
}
