use std::ops::Bound;
use std::sync::Arc;

use tracing::debug;
use yan_types::Blob;

use crate::backend::{KvBackend, Row};
use crate::error::{KvError, KvResult};
use crate::key::Key;
use crate::memory::InMemoryBackend;

/// Options for [`KvStore::list`].
#[derive(Clone, Debug, Default)]
pub struct ListOptions {
    /// Return at most this many entries.
    pub limit: Option<usize>,
    /// Start strictly after this key.
    pub after: Option<Key>,
}

/// Versioned key-value store.
///
/// Cheap to clone: clones share the same backend. Returned blobs always carry
/// the row version in their `version` header; a blob passed to [`KvStore::set`]
/// may carry one to make the write conditional.
///
/// No retries happen at this layer. A conflicting write is reported to the
/// caller as [`KvError::KeyNotFound`] naming the version it expected.
#[derive(Clone)]
pub struct KvStore {
    backend: Arc<dyn KvBackend>,
}

impl KvStore {
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    /// A store over a fresh [`InMemoryBackend`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBackend::new()))
    }

    // ---- Reads ----

    /// Current blob at `key`.
    pub fn get(&self, key: &Key) -> KvResult<Blob> {
        match self.backend.read_row(&key.encode()?)? {
            Some(row) if row.is_live() => Ok(row_to_blob(row)),
            _ => Err(KvError::KeyNotFound {
                key: key.clone(),
                version: None,
            }),
        }
    }

    /// Batched [`get`](Self::get). Missing keys are skipped; order follows
    /// the input.
    pub fn get_many(&self, keys: &[Key]) -> KvResult<Vec<(Key, Blob)>> {
        let mut found = Vec::with_capacity(keys.len());
        for key in keys {
            match self.get(key) {
                Ok(blob) => found.push((key.clone(), blob)),
                Err(KvError::KeyNotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(found)
    }

    /// Live entries under `prefix`, ascending by encoded key.
    pub fn list(&self, prefix: &Key, options: &ListOptions) -> KvResult<Vec<(Key, Blob)>> {
        let (start, end) = prefix.prefix_range()?;
        let cursor = options.after.as_ref().map(Key::encode).transpose()?;
        let lower = match &cursor {
            Some(after) if after.as_str() >= start.as_str() => Bound::Excluded(after.as_str()),
            _ => Bound::Included(start.as_str()),
        };
        self.backend
            .scan(lower, &end, options.limit)?
            .into_iter()
            .map(|(encoded, row)| Ok((Key::decode(&encoded)?, row_to_blob(row))))
            .collect()
    }

    // ---- Writes ----

    /// Write or delete the row at `key`.
    ///
    /// - Null body: delete. The row must be live and, if `blob` carries a
    ///   version, at that version. Leaves a tombstone and returns the null
    ///   blob.
    /// - Body without a version: create at version 1, or overwrite the current
    ///   row unconditionally.
    /// - Body with version `v`: the row must be live at version `v`.
    ///
    /// Existence is checked explicitly and the write is a compare-and-swap
    /// against the version that was read, so a concurrent writer always
    /// surfaces as `KeyNotFound` instead of being overwritten.
    pub fn set(&self, key: &Key, blob: Blob) -> KvResult<Blob> {
        let encoded = key.encode()?;
        let supplied = blob.version();
        let current = self.backend.read_row(&encoded)?;
        let current_version = current.as_ref().map(|row| row.version);
        let live = current.as_ref().is_some_and(Row::is_live);

        let not_found = || KvError::KeyNotFound {
            key: key.clone(),
            version: supplied,
        };

        if blob.is_null() {
            if !live || supplied.is_some_and(|v| Some(v) != current_version) {
                return Err(not_found());
            }
            let version = current_version.unwrap_or(0) + 1;
            let tombstone = Row {
                value: None,
                version,
                metadata: Default::default(),
            };
            if !self.backend.write_row(&encoded, current_version, tombstone)? {
                return Err(not_found());
            }
            debug!(%key, version, "deleted row");
            return Ok(Blob::null());
        }

        if let Some(v) = supplied {
            if !live || current_version != Some(v) {
                return Err(not_found());
            }
        }
        let version = current_version.map_or(1, |v| v + 1);
        self.write(key, &encoded, current_version, version, blob)
    }

    /// Create a row that must not currently be live.
    ///
    /// Any version carried by `blob` is ignored. Writing over a tombstone
    /// continues its version sequence.
    pub fn insert(&self, key: &Key, blob: Blob) -> KvResult<Blob> {
        let encoded = key.encode()?;
        let current = self.backend.read_row(&encoded)?;
        if current.as_ref().is_some_and(Row::is_live) {
            return Err(KvError::KeyExists { key: key.clone() });
        }
        if blob.is_null() {
            return Err(KvError::KeyNotFound {
                key: key.clone(),
                version: None,
            });
        }
        let current_version = current.map(|row| row.version);
        let version = current_version.map_or(1, |v| v + 1);
        match self.write(key, &encoded, current_version, version, blob) {
            Err(KvError::KeyNotFound { .. }) => Err(KvError::KeyExists { key: key.clone() }),
            other => other,
        }
    }

    fn write(
        &self,
        key: &Key,
        encoded: &str,
        expected: Option<u64>,
        version: u64,
        blob: Blob,
    ) -> KvResult<Blob> {
        let metadata = blob.content_metadata();
        let row = Row {
            value: blob.body,
            version,
            metadata,
        };
        if !self.backend.write_row(encoded, expected, row.clone())? {
            return Err(KvError::KeyNotFound {
                key: key.clone(),
                version: expected,
            });
        }
        debug!(%key, version, "wrote row");
        Ok(row_to_blob(row))
    }
}

fn row_to_blob(row: Row) -> Blob {
    Blob {
        body: row.value,
        metadata: row.metadata,
    }
    .with_version(row.version)
}

impl std::fmt::Debug for KvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(segments: &[&str]) -> Key {
        Key::new(segments.iter().copied())
    }

    // -----------------------------------------------------------------------
    // Create / update
    // -----------------------------------------------------------------------

    #[test]
    fn create_starts_at_version_one() {
        let kv = KvStore::in_memory();
        let stored = kv.set(&key(&["a"]), Blob::from("hello")).unwrap();
        assert_eq!(stored.version(), Some(1));
        assert_eq!(stored.bytes(), b"hello");
    }

    #[test]
    fn unversioned_write_overwrites() {
        let kv = KvStore::in_memory();
        kv.set(&key(&["a"]), Blob::from("one")).unwrap();
        let stored = kv.set(&key(&["a"]), Blob::from("two")).unwrap();
        assert_eq!(stored.version(), Some(2));
        assert_eq!(kv.get(&key(&["a"])).unwrap().bytes(), b"two");
    }

    #[test]
    fn versioned_write_requires_matching_version() {
        let kv = KvStore::in_memory();
        kv.set(&key(&["a"]), Blob::from("one")).unwrap();
        let ok = kv
            .set(&key(&["a"]), Blob::from("two").with_version(1))
            .unwrap();
        assert_eq!(ok.version(), Some(2));

        let stale = kv.set(&key(&["a"]), Blob::from("three").with_version(1));
        assert_eq!(
            stale,
            Err(KvError::KeyNotFound {
                key: key(&["a"]),
                version: Some(1)
            })
        );
    }

    #[test]
    fn versioned_write_to_missing_key_fails() {
        let kv = KvStore::in_memory();
        let result = kv.set(&key(&["a"]), Blob::from("x").with_version(1));
        assert!(matches!(result, Err(KvError::KeyNotFound { .. })));
    }

    #[test]
    fn content_headers_are_kept() {
        let kv = KvStore::in_memory();
        kv.set(
            &key(&["a"]),
            Blob::from("x").with_header("content-type", "text/plain"),
        )
        .unwrap();
        let blob = kv.get(&key(&["a"])).unwrap();
        assert_eq!(blob.header("content-type"), Some("text/plain"));
        assert_eq!(blob.version(), Some(1));
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    #[test]
    fn delete_with_current_version_removes_row() {
        let kv = KvStore::in_memory();
        let k = key(&["docs", "readme"]);
        kv.set(&k, Blob::from("v1")).unwrap();
        kv.set(&k, Blob::from("v2")).unwrap();

        let deleted = kv.set(&k, Blob::null().with_version(2)).unwrap();
        assert!(deleted.is_null());
        assert!(deleted.metadata.is_empty());
        assert_eq!(
            kv.get(&k),
            Err(KvError::KeyNotFound {
                key: k.clone(),
                version: None
            })
        );
    }

    #[test]
    fn delete_with_stale_version_fails() {
        let kv = KvStore::in_memory();
        let k = key(&["a"]);
        kv.set(&k, Blob::from("v1")).unwrap();
        kv.set(&k, Blob::from("v2")).unwrap();
        assert!(matches!(
            kv.set(&k, Blob::null().with_version(1)),
            Err(KvError::KeyNotFound {
                version: Some(1),
                ..
            })
        ));
        assert_eq!(kv.get(&k).unwrap().bytes(), b"v2");
    }

    #[test]
    fn delete_missing_key_fails() {
        let kv = KvStore::in_memory();
        assert!(kv.set(&key(&["nope"]), Blob::null()).is_err());
    }

    #[test]
    fn versions_continue_after_tombstone() {
        let kv = KvStore::in_memory();
        let k = key(&["a"]);
        kv.set(&k, Blob::from("v1")).unwrap();
        kv.set(&k, Blob::null()).unwrap();
        let recreated = kv.set(&k, Blob::from("again")).unwrap();
        assert_eq!(recreated.version(), Some(3));
    }

    // -----------------------------------------------------------------------
    // Insert
    // -----------------------------------------------------------------------

    #[test]
    fn insert_refuses_live_rows() {
        let kv = KvStore::in_memory();
        let k = key(&["a"]);
        kv.insert(&k, Blob::from("first")).unwrap();
        assert_eq!(
            kv.insert(&k, Blob::from("second")),
            Err(KvError::KeyExists { key: k.clone() })
        );
        kv.set(&k, Blob::null()).unwrap();
        assert_eq!(kv.insert(&k, Blob::from("third")).unwrap().version(), Some(3));
    }

    // -----------------------------------------------------------------------
    // Batched reads and listing
    // -----------------------------------------------------------------------

    #[test]
    fn get_many_skips_missing_and_keeps_order() {
        let kv = KvStore::in_memory();
        kv.set(&key(&["b"]), Blob::from("B")).unwrap();
        kv.set(&key(&["a"]), Blob::from("A")).unwrap();
        let found = kv
            .get_many(&[key(&["b"]), key(&["missing"]), key(&["a"])])
            .unwrap();
        let keys: Vec<Key> = found.into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![key(&["b"]), key(&["a"])]);
    }

    #[test]
    fn list_prefix_does_not_match_longer_segment() {
        let kv = KvStore::in_memory();
        kv.set(&key(&["a", "1"]), Blob::from("x")).unwrap();
        kv.set(&key(&["a", "2"]), Blob::from("y")).unwrap();
        kv.set(&key(&["aa", "1"]), Blob::from("z")).unwrap();
        kv.set(&key(&["a"]), Blob::from("self")).unwrap();

        let listed = kv.list(&key(&["a"]), &ListOptions::default()).unwrap();
        let keys: Vec<Key> = listed.into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec![key(&["a"]), key(&["a", "1"]), key(&["a", "2"])]);
    }

    #[test]
    fn list_honours_cursor_and_limit() {
        let kv = KvStore::in_memory();
        for name in ["k1", "k2", "k3", "k4"] {
            kv.set(&key(&["p", name]), Blob::from(name)).unwrap();
        }
        let options = ListOptions {
            limit: Some(2),
            after: Some(key(&["p", "k1"])),
        };
        let keys: Vec<Key> = kv
            .list(&key(&["p"]), &options)
            .unwrap()
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(keys, vec![key(&["p", "k2"]), key(&["p", "k3"])]);
    }

    #[test]
    fn list_skips_tombstones() {
        let kv = KvStore::in_memory();
        kv.set(&key(&["p", "a"]), Blob::from("a")).unwrap();
        kv.set(&key(&["p", "b"]), Blob::from("b")).unwrap();
        kv.set(&key(&["p", "a"]), Blob::null()).unwrap();
        let listed = kv.list(&key(&["p"]), &ListOptions::default()).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0, key(&["p", "b"]));
    }

    #[test]
    fn empty_prefix_lists_everything() {
        let kv = KvStore::in_memory();
        kv.set(&key(&["x"]), Blob::from("1")).unwrap();
        kv.set(&key(&["y", "z"]), Blob::from("2")).unwrap();
        let listed = kv.list(&Key::default(), &ListOptions::default()).unwrap();
        assert_eq!(listed.len(), 2);
    }

    // -----------------------------------------------------------------------
    // Properties
    // -----------------------------------------------------------------------

    proptest::proptest! {
        #[test]
        fn n_writes_yield_version_n(n in 1u64..40, conditional in proptest::bool::ANY) {
            let kv = KvStore::in_memory();
            let k = key(&["counter"]);
            let mut last = None;
            for i in 0..n {
                let blob = Blob::new(i.to_be_bytes().to_vec());
                let blob = match (conditional, last) {
                    (true, Some(v)) => blob.with_version(v),
                    _ => blob,
                };
                last = kv.set(&k, blob).unwrap().version();
            }
            proptest::prop_assert_eq!(last, Some(n));
            proptest::prop_assert_eq!(kv.get(&k).unwrap().version(), Some(n));

            if n > 1 {
                let stale = kv.set(&k, Blob::from("late").with_version(n - 1));
                let is_not_found = matches!(stale, Err(KvError::KeyNotFound { .. }));
                proptest::prop_assert!(is_not_found);
            }
        }
    }
}
