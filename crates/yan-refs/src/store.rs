//! The KV-backed [`RefStore`].

use tracing::debug;
use yan_kv::{KvError, KvStore, ListOptions};
use yan_store::Commit;
use yan_types::{Blob, Hash};

use crate::error::{RefError, Result};
use crate::types::{BranchHead, BranchKey};

/// Branch pointers stored as KV rows.
///
/// A row's body is the head commit's hex hash. Every mutation names the row
/// state it expects to replace, so two writers racing on one branch can never
/// both succeed.
#[derive(Clone, Debug)]
pub struct RefStore {
    kv: KvStore,
}

impl RefStore {
    pub fn new(kv: KvStore) -> Self {
        Self { kv }
    }

    /// Current head of `branch`, or `None` if it has never been set (or was
    /// deleted).
    pub fn read(&self, branch: &BranchKey) -> Result<Option<BranchHead>> {
        match self.kv.get(&branch.kv_key()) {
            Ok(row) => Ok(Some(decode_row(branch, &row)?)),
            Err(KvError::KeyNotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Point `branch` at `head` if it is still in state `current`.
    ///
    /// `current == None` means the branch must not exist yet. Returns
    /// `Ok(false)` when another writer got there first.
    pub fn update(
        &self,
        branch: &BranchKey,
        head: &Hash<Commit>,
        current: Option<&BranchHead>,
    ) -> Result<bool> {
        let key = branch.kv_key();
        let body = Blob::from(head.to_hex().as_str());
        let result = match current {
            None => self.kv.insert(&key, body),
            Some(current) => self.kv.set(&key, body.with_version(current.version)),
        };
        match result {
            Ok(row) => {
                debug!(%branch, head = %head.short_hex(), version = ?row.version(), "updated branch");
                Ok(true)
            }
            Err(KvError::KeyNotFound { .. } | KvError::KeyExists { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove `branch` if it is still in state `current`.
    pub fn delete(&self, branch: &BranchKey, current: &BranchHead) -> Result<bool> {
        match self
            .kv
            .set(&branch.kv_key(), Blob::null().with_version(current.version))
        {
            Ok(_) => {
                debug!(%branch, "deleted branch");
                Ok(true)
            }
            Err(KvError::KeyNotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Every branch of `org/app` with its head, ordered by KV key.
    pub fn list(&self, org: &str, app: &str) -> Result<Vec<(BranchKey, Hash<Commit>)>> {
        let prefix = BranchKey::namespace_key(org, app);
        let rows = self.kv.list(&prefix, &ListOptions::default())?;
        let mut branches = Vec::with_capacity(rows.len());
        for (key, row) in rows {
            let Some(branch) = BranchKey::from_kv_key(&key) else {
                continue;
            };
            let head = decode_row(&branch, &row)?.head;
            branches.push((branch, head));
        }
        Ok(branches)
    }
}

fn decode_row(branch: &BranchKey, row: &Blob) -> Result<BranchHead> {
    let corrupt = |reason: String| RefError::Corrupt {
        name: branch.to_string(),
        reason,
    };
    let text = std::str::from_utf8(row.bytes()).map_err(|e| corrupt(e.to_string()))?;
    let head = Hash::from_hex(text).map_err(|e| corrupt(e.to_string()))?;
    let version = row
        .version()
        .ok_or_else(|| corrupt("row has no version".into()))?;
    Ok(BranchHead { head, version })
}
