use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info};
use yan_diff::{diff_trees, Changeset};
use yan_kv::KvStore;
use yan_refs::{BranchKey, PushStrategy, RefStore};
use yan_store::{
    build_tree, resolve, BlobStorage, Commit, FileChanges, KvObjectStore, Node, ObjectStore,
    ObjectStoreExt, StoreError, Tree, WorkingTree,
};
use yan_types::{Blob, Hash};

use crate::error::{YanError, YanResult};

/// File edits for [`Yan::write`]: path to new content, `None` deletes.
pub type FileEdits = BTreeMap<String, Option<Blob>>;

/// Outcome of [`Yan::compare_and_push`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HeadUpdate {
    /// The branch now points at the new head.
    Updated,
    /// The branch was not at the expected head. Nothing changed.
    Mismatch { actual: Option<Hash<Commit>> },
}

/// High-level Yan repository API.
///
/// Cheap to clone: clones share the same stores.
#[derive(Clone)]
pub struct Yan {
    objects: Arc<dyn ObjectStore>,
    refs: RefStore,
}

impl Yan {
    /// Objects and branches over one KV store.
    pub fn new(kv: KvStore) -> Self {
        Self {
            objects: Arc::new(KvObjectStore::new(kv.clone())),
            refs: RefStore::new(kv),
        }
    }

    /// A repository over a fresh in-memory KV store.
    pub fn in_memory() -> Self {
        Self::new(KvStore::in_memory())
    }

    /// Assemble from separately constructed stores.
    pub fn with_stores(objects: Arc<dyn ObjectStore>, refs: RefStore) -> Self {
        Self { objects, refs }
    }

    // ---- Content operations ----

    pub fn write_blob(&self, blob: &Blob) -> YanResult<Hash<Blob>> {
        Ok(self.objects.write_blob(blob)?)
    }

    pub fn read_blob(&self, hash: &Hash<Blob>) -> YanResult<Blob> {
        Ok(self.objects.read_blob(hash)?)
    }

    // ---- Commit operations ----

    /// Commit `edits` on top of `parent` (or on an empty tree).
    ///
    /// Blobs are written first, then every changed tree bottom-up, then the
    /// commit, so no object is ever stored before the objects it references.
    pub fn write(
        &self,
        parent: Option<Hash<Commit>>,
        edits: FileEdits,
        message: &str,
    ) -> YanResult<Hash<Commit>> {
        let mut changes = FileChanges::new();
        for (path, blob) in edits {
            let hash = blob.map(|b| self.objects.write_blob(&b)).transpose()?;
            changes.insert(path, hash);
        }
        let base = parent.map(|p| self.tree(&p)).transpose()?;
        let tree = build_tree(self.objects.as_ref(), base.as_ref(), &changes)?;
        self.write_commit(Commit::new(tree, parent, message))
    }

    fn write_commit(&self, commit: Commit) -> YanResult<Hash<Commit>> {
        let hash = self.objects.put(&commit)?;
        debug!(commit = %hash.short_hex(), parent = ?commit.parent, "wrote commit");
        Ok(hash)
    }

    pub fn commit(&self, hash: &Hash<Commit>) -> YanResult<Commit> {
        Ok(self.objects.get(hash)?)
    }

    pub fn has_commit(&self, hash: &Hash<Commit>) -> YanResult<bool> {
        Ok(self.objects.contains(hash)?)
    }

    pub fn parent(&self, hash: &Hash<Commit>) -> YanResult<Option<Hash<Commit>>> {
        Ok(self.commit(hash)?.parent)
    }

    /// Root tree of a commit.
    pub fn tree(&self, hash: &Hash<Commit>) -> YanResult<Hash<Tree>> {
        Ok(self.commit(hash)?.tree)
    }

    /// Commits from `head` back towards the root, newest first.
    pub fn log(
        &self,
        head: &Hash<Commit>,
        limit: Option<usize>,
    ) -> YanResult<Vec<(Hash<Commit>, Commit)>> {
        let mut entries = Vec::new();
        let mut cursor = Some(*head);
        while let Some(hash) = cursor {
            if limit.is_some_and(|n| entries.len() >= n) {
                break;
            }
            let commit = self.commit(&hash)?;
            cursor = commit.parent;
            entries.push((hash, commit));
        }
        Ok(entries)
    }

    // ---- Ancestry ----

    /// `true` if `ancestor` is `descendant` or one of its parents.
    pub fn is_ancestor(
        &self,
        ancestor: &Hash<Commit>,
        descendant: &Hash<Commit>,
    ) -> YanResult<bool> {
        let mut cursor = Some(*descendant);
        while let Some(hash) = cursor {
            if hash == *ancestor {
                return Ok(true);
            }
            cursor = self.parent(&hash)?;
        }
        Ok(false)
    }

    /// Nearest commit that is an ancestor of both `a` and `b` (each commit
    /// counts as its own ancestor). `None` for disjoint histories.
    pub fn lca(&self, a: &Hash<Commit>, b: &Hash<Commit>) -> YanResult<Option<Hash<Commit>>> {
        let mut seen = HashSet::new();
        let mut cursor = Some(*a);
        while let Some(hash) = cursor {
            seen.insert(hash);
            cursor = self.parent(&hash)?;
        }
        let mut cursor = Some(*b);
        while let Some(hash) = cursor {
            if seen.contains(&hash) {
                return Ok(Some(hash));
            }
            cursor = self.parent(&hash)?;
        }
        Ok(None)
    }

    // ---- Branch operations ----

    pub fn head(&self, branch: &BranchKey) -> YanResult<Option<Hash<Commit>>> {
        Ok(self.refs.read(branch)?.map(|current| current.head))
    }

    /// Point `branch` at `hash`.
    ///
    /// Under [`PushStrategy::FastForward`] the current head must be an
    /// ancestor of `hash`. [`PushStrategy::Replace`] moves the pointer
    /// unconditionally. Either way the write is a compare-and-swap against
    /// the state just read; losing that race is [`YanError::ConcurrentUpdate`].
    pub fn push(
        &self,
        branch: &BranchKey,
        hash: &Hash<Commit>,
        strategy: PushStrategy,
    ) -> YanResult<()> {
        if !self.has_commit(hash)? {
            return Err(StoreError::NotFound(hash.untyped()).into());
        }
        let current = self.refs.read(branch)?;
        if let Some(current) = &current {
            if current.head == *hash {
                return Ok(());
            }
            if strategy == PushStrategy::FastForward && !self.is_ancestor(&current.head, hash)? {
                return Err(YanError::NotFastForward {
                    branch: branch.to_string(),
                    current: current.head,
                    attempted: *hash,
                });
            }
        }
        if !self.refs.update(branch, hash, current.as_ref())? {
            return Err(YanError::ConcurrentUpdate {
                branch: branch.to_string(),
            });
        }
        info!(%branch, head = %hash.short_hex(), ?strategy, "branch moved");
        Ok(())
    }

    /// Fast-forward `branch` to `hash` only if it currently points at
    /// `expected` (`None` meaning unset).
    ///
    /// A head that differs from `expected`, either up front or because
    /// another writer won the compare-and-swap, is reported as
    /// [`HeadUpdate::Mismatch`] with the head actually found.
    pub fn compare_and_push(
        &self,
        branch: &BranchKey,
        expected: Option<Hash<Commit>>,
        hash: &Hash<Commit>,
    ) -> YanResult<HeadUpdate> {
        if !self.has_commit(hash)? {
            return Err(StoreError::NotFound(hash.untyped()).into());
        }
        let current = self.refs.read(branch)?;
        let actual = current.map(|c| c.head);
        if actual != expected {
            return Ok(HeadUpdate::Mismatch { actual });
        }
        if let Some(head) = actual {
            if head == *hash {
                return Ok(HeadUpdate::Updated);
            }
            if !self.is_ancestor(&head, hash)? {
                return Err(YanError::NotFastForward {
                    branch: branch.to_string(),
                    current: head,
                    attempted: *hash,
                });
            }
        }
        if self.refs.update(branch, hash, current.as_ref())? {
            info!(%branch, head = %hash.short_hex(), "branch advanced");
            Ok(HeadUpdate::Updated)
        } else {
            Ok(HeadUpdate::Mismatch {
                actual: self.head(branch)?,
            })
        }
    }

    /// Every branch of `org/app` with its head.
    pub fn branches(&self, org: &str, app: &str) -> YanResult<Vec<(BranchKey, Hash<Commit>)>> {
        Ok(self.refs.list(org, app)?)
    }

    pub fn delete_branch(&self, branch: &BranchKey) -> YanResult<()> {
        let current = self
            .refs
            .read(branch)?
            .ok_or_else(|| YanError::BranchNotFound {
                name: branch.to_string(),
            })?;
        if !self.refs.delete(branch, &current)? {
            return Err(YanError::ConcurrentUpdate {
                branch: branch.to_string(),
            });
        }
        info!(%branch, "branch deleted");
        Ok(())
    }

    /// A working tree over the head of `branch`.
    pub fn checkout(&self, branch: &BranchKey) -> YanResult<WorkingTree> {
        let head = self.head(branch)?.ok_or_else(|| YanError::BranchNotFound {
            name: branch.to_string(),
        })?;
        Ok(self.working_tree(self.tree(&head)?))
    }

    // ---- Diff and apply ----

    /// File-level changes from `from` (or the empty tree) to `to`.
    pub fn diff(&self, from: Option<&Hash<Commit>>, to: &Hash<Commit>) -> YanResult<Changeset> {
        let from_tree = from.map(|c| self.tree(c)).transpose()?;
        let to_tree = self.tree(to)?;
        Ok(diff_trees(
            self.objects.as_ref(),
            from_tree.as_ref(),
            Some(&to_tree),
        )?)
    }

    /// Commit `changeset` on top of `base`.
    pub fn apply(
        &self,
        base: &Hash<Commit>,
        changeset: &Changeset,
        message: &str,
    ) -> YanResult<Hash<Commit>> {
        let base_tree = self.tree(base)?;
        let tree = build_tree(
            self.objects.as_ref(),
            Some(&base_tree),
            &changeset.to_file_changes(),
        )?;
        self.write_commit(Commit::new(tree, Some(*base), message))
    }

    // ---- Paths and working trees ----

    /// The file at `path` in `commit`.
    pub fn read(&self, commit: &Hash<Commit>, path: &str) -> YanResult<Blob> {
        match resolve(self.objects.as_ref(), &self.tree(commit)?, path)? {
            Some(Node::Blob(hash)) => self.read_blob(&hash),
            _ => Err(YanError::NotFound {
                path: path.to_string(),
            }),
        }
    }

    /// Entries of the directory at `path` in `commit`.
    pub fn list(&self, commit: &Hash<Commit>, path: &str) -> YanResult<Vec<(String, Node)>> {
        match resolve(self.objects.as_ref(), &self.tree(commit)?, path)? {
            Some(Node::Tree(id)) => {
                let tree: Tree = self.objects.get(&id)?;
                Ok(tree.entries.into_iter().collect())
            }
            _ => Err(YanError::NotFound {
                path: path.to_string(),
            }),
        }
    }

    pub fn working_tree(&self, tree: Hash<Tree>) -> WorkingTree {
        WorkingTree::new(self.objects.clone(), tree)
    }

    /// Commit a working tree onto `branch` and fast-forward it.
    ///
    /// Returns `None` without writing anything when the working tree is fresh.
    pub fn commit_working_tree(
        &self,
        branch: &BranchKey,
        working: &WorkingTree,
        message: &str,
    ) -> YanResult<Option<Hash<Commit>>> {
        if working.is_fresh() {
            return Ok(None);
        }
        let parent = self.head(branch)?;
        let hash = self.write_commit(Commit::new(working.root()?, parent, message))?;
        self.push(branch, &hash, PushStrategy::FastForward)?;
        Ok(Some(hash))
    }

    // ---- Accessors ----

    pub fn objects(&self) -> &Arc<dyn ObjectStore> {
        &self.objects
    }

    pub fn refs(&self) -> &RefStore {
        &self.refs
    }
}

impl std::fmt::Debug for Yan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Yan").field("refs", &self.refs).finish_non_exhaustive()
    }
}
