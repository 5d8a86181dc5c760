use yan_types::{Blob, Hash, RawHash};

use crate::error::{StoreError, StoreResult};
use crate::object::{Object, StoredObject};

/// Content-addressed object store.
///
/// All implementations must satisfy these invariants:
/// - Objects are immutable once written. The same data always produces the
///   same ID, and writing it again is a no-op.
/// - Reads verify the stored bytes against the requested ID.
/// - Concurrent reads are always safe.
/// - The store is append-only; there is no delete.
pub trait ObjectStore: Send + Sync {
    /// Read an object by its content-addressed ID.
    ///
    /// Returns `Ok(None)` if the object does not exist.
    /// Returns `Err` on backend failure or data corruption.
    fn read(&self, id: &RawHash) -> StoreResult<Option<StoredObject>>;

    /// Write an object and return its content-addressed ID.
    ///
    /// If the object already exists, this is a no-op.
    fn write(&self, object: &StoredObject) -> StoreResult<RawHash>;

    /// Check whether an object exists in the store.
    fn exists(&self, id: &RawHash) -> StoreResult<bool>;

    /// Read multiple objects in a batch.
    ///
    /// Default implementation calls `read()` for each ID.
    fn read_batch(&self, ids: &[RawHash]) -> StoreResult<Vec<Option<StoredObject>>> {
        ids.iter().map(|id| self.read(id)).collect()
    }
}

/// Typed access on top of any [`ObjectStore`].
pub trait ObjectStoreExt: ObjectStore {
    /// Read and decode an object, failing if it is absent.
    fn get<T: Object>(&self, id: &Hash<T>) -> StoreResult<T> {
        let raw = id.untyped();
        let stored = self.read(&raw)?.ok_or(StoreError::NotFound(raw))?;
        T::from_stored_object(&stored)
    }

    /// Encode and write an object.
    fn put<T: Object>(&self, object: &T) -> StoreResult<Hash<T>> {
        let id = self.write(&object.to_stored_object()?)?;
        Ok(id.cast())
    }

    fn contains<T>(&self, id: &Hash<T>) -> StoreResult<bool> {
        self.exists(&id.untyped())
    }
}

impl<S: ObjectStore + ?Sized> ObjectStoreExt for S {}

/// The blob-only interface consumed by code that never touches trees or
/// commits directly.
pub trait BlobStorage {
    fn read_blob(&self, hash: &Hash<Blob>) -> StoreResult<Blob>;

    fn write_blob(&self, blob: &Blob) -> StoreResult<Hash<Blob>>;

    /// Blobs that exist among `hashes`, in input order.
    fn read_blobs(&self, hashes: &[Hash<Blob>]) -> StoreResult<Vec<(Hash<Blob>, Blob)>>;
}

impl<S: ObjectStore + ?Sized> BlobStorage for S {
    fn read_blob(&self, hash: &Hash<Blob>) -> StoreResult<Blob> {
        self.get(hash)
    }

    fn write_blob(&self, blob: &Blob) -> StoreResult<Hash<Blob>> {
        self.put(blob)
    }

    fn read_blobs(&self, hashes: &[Hash<Blob>]) -> StoreResult<Vec<(Hash<Blob>, Blob)>> {
        let raw: Vec<RawHash> = hashes.iter().map(|h| h.untyped()).collect();
        let mut found = Vec::with_capacity(hashes.len());
        for (hash, stored) in hashes.iter().zip(self.read_batch(&raw)?) {
            if let Some(stored) = stored {
                found.push((*hash, Blob::from_stored_object(&stored)?));
            }
        }
        Ok(found)
    }
}
