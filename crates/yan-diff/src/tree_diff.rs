//! Tree-level diff: compare two trees and produce per-path file changes.
//!
//! Subtrees with equal hashes are skipped without being read, so the cost is
//! proportional to the changed part of the tree.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use yan_store::{FileChanges, Node, ObjectStore, ObjectStoreExt, Tree};
use yan_types::{Blob, Hash};

use crate::error::DiffResult;

/// A change to a single file path.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Change {
    Added { new: Hash<Blob> },
    Removed { old: Hash<Blob> },
    Modified { old: Hash<Blob>, new: Hash<Blob> },
}

impl Change {
    /// The blob the path holds after the change, `None` if removed.
    pub fn target(&self) -> Option<Hash<Blob>> {
        match self {
            Self::Added { new } | Self::Modified { new, .. } => Some(*new),
            Self::Removed { .. } => None,
        }
    }
}

/// The structural difference between two snapshots, keyed by file path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changeset {
    pub changes: BTreeMap<String, Change>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if there are no changes.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Number of changed paths.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn get(&self, path: &str) -> Option<&Change> {
        self.changes.get(path)
    }

    /// Tree-builder input that reproduces this changeset on any base.
    pub fn to_file_changes(&self) -> FileChanges {
        self.changes
            .iter()
            .map(|(path, change)| (path.clone(), change.target()))
            .collect()
    }
}

/// Compare two trees. `None` stands for the empty tree.
pub fn diff_trees(
    store: &dyn ObjectStore,
    from: Option<&Hash<Tree>>,
    to: Option<&Hash<Tree>>,
) -> DiffResult<Changeset> {
    let mut changeset = Changeset::new();
    diff_into(store, "", from.copied(), to.copied(), &mut changeset)?;
    Ok(changeset)
}

fn diff_into(
    store: &dyn ObjectStore,
    prefix: &str,
    from: Option<Hash<Tree>>,
    to: Option<Hash<Tree>>,
    out: &mut Changeset,
) -> DiffResult<()> {
    if from == to {
        return Ok(());
    }
    let old = load(store, from)?;
    let new = load(store, to)?;
    let names: BTreeSet<&String> = old.entries.keys().chain(new.entries.keys()).collect();

    for name in names {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        match (old.get(name).copied(), new.get(name).copied()) {
            (Some(a), Some(b)) if a == b => {}
            (Some(Node::Blob(old)), Some(Node::Blob(new))) => {
                out.changes.insert(path, Change::Modified { old, new });
            }
            (Some(Node::Tree(a)), Some(Node::Tree(b))) => {
                diff_into(store, &path, Some(a), Some(b), out)?;
            }
            (old_node, new_node) => {
                match old_node {
                    Some(Node::Blob(old)) => {
                        out.changes.insert(path.clone(), Change::Removed { old });
                    }
                    Some(Node::Tree(a)) => diff_into(store, &path, Some(a), None, out)?,
                    None => {}
                }
                match new_node {
                    Some(Node::Blob(new)) => {
                        out.changes.insert(path, Change::Added { new });
                    }
                    Some(Node::Tree(b)) => diff_into(store, &path, None, Some(b), out)?,
                    None => {}
                }
            }
        }
    }
    Ok(())
}

fn load(store: &dyn ObjectStore, id: Option<Hash<Tree>>) -> DiffResult<Tree> {
    Ok(match id {
        Some(id) => store.get(&id)?,
        None => Tree::new(),
    })
}
