use std::sync::Arc;

use yan_types::{Blob, Hash};

use crate::error::{StoreError, StoreResult};
use crate::object::{Node, Tree};
use crate::traits::{BlobStorage, ObjectStore, ObjectStoreExt};
use crate::tree::{build_tree, normalize_path, resolve, FileChanges};

/// A mutable staging view over an immutable tree snapshot.
///
/// Writes are recorded as pending changes against the base tree; blobs are
/// persisted as soon as they are written (unreferenced blobs are harmless in
/// an append-only store). Reads see the pending changes. A working tree with
/// no pending changes is *fresh*: committing it would only repeat its base.
pub struct WorkingTree {
    store: Arc<dyn ObjectStore>,
    base: Hash<Tree>,
    pending: FileChanges,
}

impl WorkingTree {
    pub fn new(store: Arc<dyn ObjectStore>, base: Hash<Tree>) -> Self {
        Self {
            store,
            base,
            pending: FileChanges::new(),
        }
    }

    /// The snapshot this view started from.
    pub fn base(&self) -> Hash<Tree> {
        self.base
    }

    /// `true` until the first write.
    pub fn is_fresh(&self) -> bool {
        self.pending.is_empty()
    }

    /// Changes staged so far, keyed by normalized path.
    pub fn changes(&self) -> &FileChanges {
        &self.pending
    }

    /// Stage a file write, or a deletion when `blob` is `None`.
    pub fn write(&mut self, path: &str, blob: Option<&Blob>) -> StoreResult<()> {
        let path = normalize_path(path);
        if path.is_empty() {
            return Err(StoreError::InvalidPath(path));
        }
        let hash = blob.map(|b| self.store.write_blob(b)).transpose()?;
        self.pending.insert(path, hash);
        Ok(())
    }

    /// The root tree including pending changes. Builds and persists the
    /// changed trees when there are any.
    pub fn root(&self) -> StoreResult<Hash<Tree>> {
        if self.is_fresh() {
            return Ok(self.base);
        }
        build_tree(self.store.as_ref(), Some(&self.base), &self.pending)
    }

    /// The node at `path`, if any.
    pub fn find(&self, path: &str) -> StoreResult<Option<Node>> {
        if let Some(staged) = self.pending.get(&normalize_path(path)) {
            return Ok(staged.map(Node::Blob));
        }
        resolve(self.store.as_ref(), &self.root()?, path)
    }

    /// The file at `path`, or `None` if it is absent or a directory.
    pub fn read(&self, path: &str) -> StoreResult<Option<Blob>> {
        match self.find(path)? {
            Some(Node::Blob(hash)) => Ok(Some(self.store.read_blob(&hash)?)),
            _ => Ok(None),
        }
    }

    /// Entries of the directory at `path`, or `None` if it is absent or a
    /// file. The empty path lists the root.
    pub fn list(&self, path: &str) -> StoreResult<Option<Vec<(String, Node)>>> {
        match self.find(path)? {
            Some(Node::Tree(id)) => {
                let tree: Tree = self.store.get(&id)?;
                Ok(Some(tree.entries.into_iter().collect()))
            }
            _ => Ok(None),
        }
    }
}

impl std::fmt::Debug for WorkingTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkingTree")
            .field("base", &self.base)
            .field("pending", &self.pending.len())
            .finish()
    }
}
