use tracing::debug;
use yan_kv::{Key, KvError, KvStore};
use yan_types::{Blob, RawHash};

use crate::error::{StoreError, StoreResult};
use crate::object::{ObjectKind, StoredObject};
use crate::traits::ObjectStore;

/// KV namespace holding all objects.
const OBJECTS: &str = "objects";

/// Row header naming the object kind.
const KIND_HEADER: &str = "kind";

/// Object store on top of the versioned KV layer.
///
/// Each object is one row at `["objects", <hex id>]` whose body is the
/// object's canonical bytes and whose `kind` header names the object kind.
/// Rows are written once and never updated, so their KV version stays 1.
#[derive(Clone, Debug)]
pub struct KvObjectStore {
    kv: KvStore,
}

impl KvObjectStore {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    /// A store over a fresh in-memory KV backend.
    pub fn in_memory() -> Self {
        Self::new(KvStore::in_memory())
    }

    fn key(id: &RawHash) -> Key {
        Key::new([OBJECTS.to_string(), id.to_hex()])
    }
}

impl ObjectStore for KvObjectStore {
    fn read(&self, id: &RawHash) -> StoreResult<Option<StoredObject>> {
        let row = match self.kv.get(&Self::key(id)) {
            Ok(row) => row,
            Err(KvError::KeyNotFound { .. }) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let kind = row
            .header(KIND_HEADER)
            .and_then(ObjectKind::from_name)
            .ok_or_else(|| StoreError::CorruptObject {
                id: *id,
                reason: "missing or unknown kind header".into(),
            })?;
        let object = StoredObject::new(kind, row.body.unwrap_or_default());
        let computed = object.compute_id();
        if computed != *id {
            return Err(StoreError::HashMismatch { id: *id, computed });
        }
        Ok(Some(object))
    }

    fn write(&self, object: &StoredObject) -> StoreResult<RawHash> {
        let id = object.compute_id();
        let key = Self::key(&id);
        let row = Blob::new(object.data.clone()).with_header(KIND_HEADER, object.kind.as_str());
        match self.kv.insert(&key, row) {
            Ok(_) => debug!(kind = %object.kind, id = %id.short_hex(), "stored object"),
            // Another writer stored the same content first.
            Err(KvError::KeyExists { .. }) => {}
            Err(e) => return Err(e.into()),
        }
        Ok(id)
    }

    fn exists(&self, id: &RawHash) -> StoreResult<bool> {
        match self.kv.get(&Self::key(id)) {
            Ok(_) => Ok(true),
            Err(KvError::KeyNotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
