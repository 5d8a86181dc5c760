use std::collections::BTreeMap;
use std::ops::Bound;

use crate::error::KvResult;

/// A physical row: value, version, and content headers.
///
/// A row whose `value` is `None` is a tombstone. Tombstones are invisible to
/// readers but keep their version so later writes continue the sequence.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    pub value: Option<Vec<u8>>,
    pub version: u64,
    pub metadata: BTreeMap<String, String>,
}

impl Row {
    /// Returns `true` unless this row is a tombstone.
    pub fn is_live(&self) -> bool {
        self.value.is_some()
    }
}

/// Physical storage underneath [`KvStore`](crate::KvStore).
///
/// Backends only need three primitives over encoded keys. All versioning
/// rules live in `KvStore`, so a backend never interprets row contents.
/// Implementations must be thread-safe; a single `write_row` call must be
/// atomic with respect to other calls on the same key.
pub trait KvBackend: Send + Sync {
    /// Read a row, tombstones included. `Ok(None)` if the key was never written.
    fn read_row(&self, key: &str) -> KvResult<Option<Row>>;

    /// Compare-and-swap a row.
    ///
    /// Stores `row` only if the current version equals `expected` (`None`
    /// meaning the key has never been written). Returns `Ok(false)` when the
    /// expectation does not hold and nothing was written.
    fn write_row(&self, key: &str, expected: Option<u64>, row: Row) -> KvResult<bool>;

    /// Live rows with `start <= key < end` (or `start < key` for an excluded
    /// start), ascending, at most `limit` of them.
    fn scan(
        &self,
        start: Bound<&str>,
        end: &str,
        limit: Option<usize>,
    ) -> KvResult<Vec<(String, Row)>>;
}
