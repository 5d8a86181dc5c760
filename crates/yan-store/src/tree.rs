//! Path resolution and bottom-up tree building.

use std::collections::BTreeMap;

use yan_types::{Blob, Hash};

use crate::error::{StoreError, StoreResult};
use crate::object::{Node, Tree};
use crate::traits::{ObjectStore, ObjectStoreExt};

/// Pending file edits keyed by path. `None` deletes the file.
pub type FileChanges = BTreeMap<String, Option<Hash<Blob>>>;

/// Split a `/`-separated path, ignoring empty segments.
fn segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Canonical form of a path: segments joined by a single `/`, no leading or
/// trailing slash.
pub fn normalize_path(path: &str) -> String {
    segments(path).join("/")
}

/// Look up `path` under `root`. The empty path resolves to `root` itself.
pub fn resolve(
    store: &dyn ObjectStore,
    root: &Hash<Tree>,
    path: &str,
) -> StoreResult<Option<Node>> {
    let mut node = Node::Tree(*root);
    for segment in segments(path) {
        let Node::Tree(tree_id) = node else {
            return Ok(None);
        };
        let tree: Tree = store.get(&tree_id)?;
        match tree.get(segment) {
            Some(child) => node = *child,
            None => return Ok(None),
        }
    }
    Ok(Some(node))
}

/// Apply `changes` on top of `base` and return the new root tree.
///
/// Every changed directory is rebuilt bottom-up and persisted; untouched
/// subtrees are shared with `base` by hash. Directories left empty are
/// pruned, except the root, which always exists (possibly empty).
pub fn build_tree(
    store: &dyn ObjectStore,
    base: Option<&Hash<Tree>>,
    changes: &FileChanges,
) -> StoreResult<Hash<Tree>> {
    let mut edits = Vec::with_capacity(changes.len());
    for (path, blob) in changes {
        let parts = segments(path);
        if parts.is_empty() {
            return Err(StoreError::InvalidPath(path.clone()));
        }
        edits.push((parts, *blob));
    }
    match rebuild(store, base.copied(), edits)? {
        Some(root) => Ok(root),
        None => store.put(&Tree::new()),
    }
}

type Edit<'a> = (Vec<&'a str>, Option<Hash<Blob>>);

fn rebuild(
    store: &dyn ObjectStore,
    base: Option<Hash<Tree>>,
    edits: Vec<Edit<'_>>,
) -> StoreResult<Option<Hash<Tree>>> {
    let mut tree = match base {
        Some(id) => store.get(&id)?,
        None => Tree::new(),
    };

    let mut nested: BTreeMap<&str, Vec<Edit<'_>>> = BTreeMap::new();
    for (parts, blob) in edits {
        match parts.split_first() {
            Some((name, [])) => match blob {
                Some(hash) => {
                    tree.entries.insert(name.to_string(), Node::Blob(hash));
                }
                None => {
                    tree.entries.remove(*name);
                }
            },
            Some((dir, rest)) => nested.entry(*dir).or_default().push((rest.to_vec(), blob)),
            None => {}
        }
    }

    for (dir, sub_edits) in nested {
        let existing = tree.entries.get(dir).copied();
        let sub_base = match existing {
            Some(Node::Tree(id)) => Some(id),
            _ => None,
        };
        match (rebuild(store, sub_base, sub_edits)?, existing) {
            (Some(id), _) => {
                tree.entries.insert(dir.to_string(), Node::Tree(id));
            }
            (None, Some(Node::Tree(_))) => {
                tree.entries.remove(dir);
            }
            // Deleting beneath a file (or nothing) leaves the entry alone.
            (None, _) => {}
        }
    }

    if tree.is_empty() {
        return Ok(None);
    }
    Ok(Some(store.put(&tree)?))
}
