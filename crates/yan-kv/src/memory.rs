use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

use crate::backend::{KvBackend, Row};
use crate::error::KvResult;

/// In-memory, `BTreeMap`-based KV backend.
///
/// Intended for tests and embedding. Rows are held behind a `RwLock`; the
/// ordered map gives range scans for free.
pub struct InMemoryBackend {
    rows: RwLock<BTreeMap<String, Row>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of physical rows, tombstones included.
    pub fn len(&self) -> usize {
        self.rows.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().expect("lock poisoned").is_empty()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl KvBackend for InMemoryBackend {
    fn read_row(&self, key: &str) -> KvResult<Option<Row>> {
        Ok(self.rows.read().expect("lock poisoned").get(key).cloned())
    }

    fn write_row(&self, key: &str, expected: Option<u64>, row: Row) -> KvResult<bool> {
        let mut rows = self.rows.write().expect("lock poisoned");
        let current = rows.get(key).map(|r| r.version);
        if current != expected {
            return Ok(false);
        }
        rows.insert(key.to_string(), row);
        Ok(true)
    }

    fn scan(
        &self,
        start: Bound<&str>,
        end: &str,
        limit: Option<usize>,
    ) -> KvResult<Vec<(String, Row)>> {
        let empty = match start {
            Bound::Included(s) | Bound::Excluded(s) => s >= end,
            Bound::Unbounded => false,
        };
        if empty {
            return Ok(Vec::new());
        }
        let rows = self.rows.read().expect("lock poisoned");
        let live = rows
            .range::<str, _>((start, Bound::Excluded(end)))
            .filter(|(_, row)| row.is_live())
            .map(|(k, row)| (k.clone(), row.clone()));
        Ok(match limit {
            Some(n) => live.take(n).collect(),
            None => live.collect(),
        })
    }
}

impl std::fmt::Debug for InMemoryBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBackend")
            .field("row_count", &self.len())
            .finish()
    }
}
