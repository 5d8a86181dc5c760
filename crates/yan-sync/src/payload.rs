//! Producing and consuming transfer payloads.
//!
//! A payload for `(head, base)` holds every object reachable from `head`
//! that is not already part of `base`, in an order where each object comes
//! after everything it references: blobs and subtrees before their tree,
//! a commit's tree before the commit, older commits before newer ones.
//! A receiver can therefore write objects as they arrive.

use std::collections::HashSet;

use futures::{Stream, StreamExt};
use tracing::{debug, info};
use yan_protocol::TransferItem;
use yan_sdk::Yan;
use yan_store::{Commit, Node, Object, ObjectKind, StoreError, StoredObject, Tree};
use yan_types::{Hash, RawHash};

use crate::error::{SyncError, SyncResult};

enum Step {
    Visit(Node),
    Emit(TransferItem),
}

/// Lazy, single-pass producer of a payload.
///
/// Objects are read from the store only as the iterator is advanced. The
/// first error ends the iteration.
pub struct PayloadIter {
    yan: Yan,
    /// Commits still to send, newest first.
    commits: Vec<Hash<Commit>>,
    known: HashSet<RawHash>,
    work: Vec<Step>,
    failed: bool,
}

/// Start a payload of everything reachable from `head` but not from `base`.
///
/// The commit chain is walked back from `head` until `base` (exclusive) or
/// the root. Objects reachable from `base`'s tree are assumed present at
/// the receiver and never sent.
pub fn create_payload(
    yan: &Yan,
    head: &Hash<Commit>,
    base: Option<&Hash<Commit>>,
) -> SyncResult<PayloadIter> {
    let mut commits = Vec::new();
    let mut cursor = Some(*head);
    while let Some(hash) = cursor {
        if Some(&hash) == base {
            break;
        }
        commits.push(hash);
        cursor = yan.parent(&hash)?;
    }

    let mut known = HashSet::new();
    if let Some(base) = base {
        seed_known(yan, yan.tree(base)?, &mut known)?;
    }
    debug!(
        head = %head.short_hex(),
        commits = commits.len(),
        known = known.len(),
        "creating payload"
    );

    Ok(PayloadIter {
        yan: yan.clone(),
        commits,
        known,
        work: Vec::new(),
        failed: false,
    })
}

fn seed_known(yan: &Yan, root: Hash<Tree>, known: &mut HashSet<RawHash>) -> SyncResult<()> {
    let mut pending = vec![root];
    while let Some(id) = pending.pop() {
        if !known.insert(id.untyped()) {
            continue;
        }
        let tree = read_typed::<Tree>(yan, id.untyped())?;
        for node in tree.entries.values() {
            match node {
                Node::Blob(blob) => {
                    known.insert(blob.untyped());
                }
                Node::Tree(subtree) => pending.push(*subtree),
            }
        }
    }
    Ok(())
}

fn read_stored(yan: &Yan, id: RawHash) -> SyncResult<StoredObject> {
    Ok(yan.objects().read(&id)?.ok_or(StoreError::NotFound(id))?)
}

fn read_typed<T: Object>(yan: &Yan, id: RawHash) -> SyncResult<T> {
    Ok(T::from_stored_object(&read_stored(yan, id)?)?)
}

impl PayloadIter {
    /// Queue the next commit: its tree is visited first, then the commit
    /// itself is emitted.
    fn schedule_commit(&mut self, id: Hash<Commit>) -> SyncResult<()> {
        let stored = read_stored(&self.yan, id.untyped())?;
        let commit = Commit::from_stored_object(&stored)?;
        self.known.insert(id.untyped());
        self.work.push(Step::Emit(TransferItem {
            kind: ObjectKind::Commit,
            hash: id.untyped(),
            data: stored.data,
        }));
        self.work.push(Step::Visit(Node::Tree(commit.tree)));
        Ok(())
    }

    fn visit(&mut self, node: Node) -> SyncResult<()> {
        let id = node.untyped();
        if !self.known.insert(id) {
            return Ok(());
        }
        let stored = read_stored(&self.yan, id)?;
        match node {
            Node::Blob(_) => self.work.push(Step::Emit(TransferItem {
                kind: ObjectKind::Blob,
                hash: id,
                data: stored.data,
            })),
            Node::Tree(_) => {
                let tree = Tree::from_stored_object(&stored)?;
                self.work.push(Step::Emit(TransferItem {
                    kind: ObjectKind::Tree,
                    hash: id,
                    data: stored.data,
                }));
                // Reversed so entries come off the stack in name order.
                for child in tree.entries.values().rev() {
                    self.work.push(Step::Visit(*child));
                }
            }
        }
        Ok(())
    }

    fn advance(&mut self) -> SyncResult<Option<TransferItem>> {
        loop {
            match self.work.pop() {
                Some(Step::Emit(item)) => return Ok(Some(item)),
                Some(Step::Visit(node)) => self.visit(node)?,
                None => match self.commits.pop() {
                    Some(commit) => self.schedule_commit(commit)?,
                    None => return Ok(None),
                },
            }
        }
    }
}

impl Iterator for PayloadIter {
    type Item = SyncResult<TransferItem>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.advance() {
            Ok(item) => item.map(Ok),
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

/// Write a payload into `yan`'s object store as it arrives.
///
/// Every item is checked against its claimed hash, and every object it
/// references must already be stored (either from earlier in the payload
/// or from before). Returns the hash of the last commit received.
pub async fn receive_payload<S>(yan: &Yan, items: S) -> SyncResult<Option<Hash<Commit>>>
where
    S: Stream<Item = SyncResult<TransferItem>>,
{
    let mut items = std::pin::pin!(items);
    let mut head = None;
    let mut received = 0usize;
    while let Some(item) = items.next().await {
        let item = item?;
        let claimed = item.hash;
        let object = item.into_object();
        let computed = object.compute_id();
        if computed != claimed {
            return Err(SyncError::HashMismatch { claimed, computed });
        }
        check_dependencies(yan, &object, claimed)?;
        yan.objects().write(&object)?;
        if object.kind == ObjectKind::Commit {
            head = Some(claimed.cast());
        }
        received += 1;
    }
    info!(received, head = ?head, "received payload");
    Ok(head)
}

fn check_dependencies(yan: &Yan, object: &StoredObject, id: RawHash) -> SyncResult<()> {
    let references: Vec<RawHash> = match object.kind {
        ObjectKind::Blob => return Ok(()),
        ObjectKind::Tree => Tree::from_stored_object(object)?
            .entries
            .values()
            .map(Node::untyped)
            .collect(),
        ObjectKind::Commit => {
            let commit = Commit::from_stored_object(object)?;
            std::iter::once(commit.tree.untyped())
                .chain(commit.parent.map(Hash::untyped))
                .collect()
        }
    };
    for missing in references {
        if !yan.objects().exists(&missing)? {
            return Err(SyncError::MissingDependency { id, missing });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use yan_sdk::FileEdits;
    use yan_types::Blob;

    fn edits(files: &[(&str, Option<&str>)]) -> FileEdits {
        files
            .iter()
            .map(|(path, content)| (path.to_string(), content.map(Blob::from)))
            .collect()
    }

    /// Every object hash reachable from `head`.
    fn reachable(yan: &Yan, head: &Hash<Commit>) -> HashSet<RawHash> {
        let mut out = HashSet::new();
        for (hash, commit) in yan.log(head, None).unwrap() {
            out.insert(hash.untyped());
            seed_known(yan, commit.tree, &mut out).unwrap();
        }
        out
    }

    fn collect(iter: PayloadIter) -> Vec<TransferItem> {
        iter.collect::<SyncResult<Vec<_>>>().unwrap()
    }

    fn positions(items: &[TransferItem]) -> std::collections::HashMap<RawHash, usize> {
        items.iter().enumerate().map(|(i, item)| (item.hash, i)).collect()
    }

    // -----------------------------------------------------------------------
    // Producer
    // -----------------------------------------------------------------------

    #[test]
    fn full_payload_orders_dependencies_first() {
        let yan = Yan::in_memory();
        let c0 = yan
            .write(None, edits(&[("a", Some("1")), ("d/b", Some("2")), ("d/e/c", Some("3"))]), "c0")
            .unwrap();
        let c1 = yan
            .write(Some(c0), edits(&[("d/e/c", Some("4"))]), "c1")
            .unwrap();

        let items = collect(create_payload(&yan, &c1, None).unwrap());
        let at = positions(&items);
        assert_eq!(at.len(), items.len(), "no object is sent twice");
        assert_eq!(items.last().unwrap().hash, c1.untyped());

        for item in &items {
            let object = item.clone().into_object();
            let refs: Vec<RawHash> = match item.kind {
                ObjectKind::Blob => vec![],
                ObjectKind::Tree => Tree::from_stored_object(&object)
                    .unwrap()
                    .entries
                    .values()
                    .map(Node::untyped)
                    .collect(),
                ObjectKind::Commit => {
                    let commit = Commit::from_stored_object(&object).unwrap();
                    std::iter::once(commit.tree.untyped())
                        .chain(commit.parent.map(Hash::untyped))
                        .collect()
                }
            };
            for r in refs {
                assert!(at[&r] < at[&item.hash], "{} before {}", r, item.hash);
            }
        }
    }

    #[test]
    fn base_objects_are_not_resent() {
        let yan = Yan::in_memory();
        let c0 = yan
            .write(None, edits(&[("big", Some("unchanged")), ("x", Some("1"))]), "c0")
            .unwrap();
        let c1 = yan.write(Some(c0), edits(&[("x", Some("2"))]), "c1").unwrap();

        let items = collect(create_payload(&yan, &c1, Some(&c0)).unwrap());
        let unchanged = Blob::from("unchanged").hash().unwrap().untyped();
        assert!(items.iter().all(|i| i.hash != unchanged));
        assert!(items.iter().all(|i| i.hash != c0.untyped()));
        let kinds: Vec<ObjectKind> = items.iter().map(|i| i.kind).collect();
        assert_eq!(kinds, vec![ObjectKind::Blob, ObjectKind::Tree, ObjectKind::Commit]);
    }

    #[test]
    fn head_equal_to_base_is_empty() {
        let yan = Yan::in_memory();
        let c0 = yan.write(None, edits(&[("a", Some("1"))]), "c0").unwrap();
        assert!(collect(create_payload(&yan, &c0, Some(&c0)).unwrap()).is_empty());
    }

    #[test]
    fn missing_object_ends_iteration_with_error() {
        let yan = Yan::in_memory();
        let ghost: Hash<Commit> = Hash::from_bytes([1; 32]);
        assert!(create_payload(&yan, &ghost, None).is_err());
    }

    // -----------------------------------------------------------------------
    // Receiver
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn receive_reports_last_commit() {
        let sender = Yan::in_memory();
        let c0 = sender.write(None, edits(&[("a", Some("1"))]), "c0").unwrap();
        let c1 = sender.write(Some(c0), edits(&[("b", Some("2"))]), "c1").unwrap();

        let receiver = Yan::in_memory();
        let payload = stream::iter(create_payload(&sender, &c1, None).unwrap());
        assert_eq!(receive_payload(&receiver, payload).await.unwrap(), Some(c1));
        assert_eq!(receiver.read(&c1, "a").unwrap(), Blob::from("1"));
        assert_eq!(receiver.parent(&c1).unwrap(), Some(c0));
    }

    #[tokio::test]
    async fn receive_without_commits_is_none() {
        let receiver = Yan::in_memory();
        let blob = Blob::from("loose").to_stored_object().unwrap();
        let items = stream::iter(vec![Ok(TransferItem::from_object(blob))]);
        assert_eq!(receive_payload(&receiver, items).await.unwrap(), None);
    }

    #[tokio::test]
    async fn tampered_item_is_rejected() {
        let receiver = Yan::in_memory();
        let mut item = TransferItem::from_object(Blob::from("real").to_stored_object().unwrap());
        item.data = Blob::from("fake").encode().unwrap();
        let result = receive_payload(&receiver, stream::iter(vec![Ok(item)])).await;
        assert!(matches!(result, Err(SyncError::HashMismatch { .. })));
    }

    #[tokio::test]
    async fn dangling_reference_is_rejected() {
        let sender = Yan::in_memory();
        let c0 = sender.write(None, edits(&[("a", Some("1"))]), "c0").unwrap();
        let mut items = collect(create_payload(&sender, &c0, None).unwrap());
        items.remove(0); // the blob

        let receiver = Yan::in_memory();
        let result = receive_payload(&receiver, stream::iter(items.into_iter().map(Ok))).await;
        assert!(matches!(result, Err(SyncError::MissingDependency { .. })));
    }

    // -----------------------------------------------------------------------
    // Round trip
    // -----------------------------------------------------------------------

    proptest::proptest! {
        #![proptest_config(proptest::prelude::ProptestConfig::with_cases(24))]

        #[test]
        fn delta_is_exactly_the_unreachable_part(
            history in proptest::collection::vec(
                proptest::collection::vec((0u8..6, proptest::option::of(0u8..4)), 1..4),
                1..6,
            ),
            base_at in 0usize..6,
        ) {
            let sender = Yan::in_memory();
            let mut commits = Vec::new();
            let mut parent = None;
            for (n, changes) in history.iter().enumerate() {
                let edits: FileEdits = changes
                    .iter()
                    .map(|(file, content)| {
                        let path = format!("dir{}/f{}", file % 2, file);
                        (path, content.map(|c| Blob::from(format!("v{c}").as_str())))
                    })
                    .collect();
                let c = sender.write(parent, edits, &format!("c{n}")).unwrap();
                commits.push(c);
                parent = Some(c);
            }
            let head = *commits.last().unwrap();
            let base = (base_at < commits.len() - 1).then(|| commits[base_at]);

            let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let receiver = Yan::in_memory();
            if let Some(base) = base {
                let seed = stream::iter(create_payload(&sender, &base, None).unwrap());
                rt.block_on(receive_payload(&receiver, seed)).unwrap();
            }

            let delta = collect(create_payload(&sender, &head, base.as_ref()).unwrap());
            let sent: HashSet<RawHash> = delta.iter().map(|i| i.hash).collect();
            // Only base's own snapshot is skipped; content that existed in an
            // older snapshot and comes back later is sent again.
            let mut expected = reachable(&sender, &head);
            if let Some(base) = base {
                let mut skipped = HashSet::new();
                seed_known(&sender, sender.tree(&base).unwrap(), &mut skipped).unwrap();
                for (hash, _) in sender.log(&base, None).unwrap() {
                    skipped.insert(hash.untyped());
                }
                expected.retain(|id| !skipped.contains(id));
            }
            proptest::prop_assert_eq!(sent.len(), delta.len());
            proptest::prop_assert_eq!(&sent, &expected);

            let got = rt
                .block_on(receive_payload(&receiver, stream::iter(delta.into_iter().map(Ok))))
                .unwrap();
            proptest::prop_assert_eq!(got, Some(head));
            for id in reachable(&sender, &head) {
                proptest::prop_assert!(receiver.objects().exists(&id).unwrap());
            }
        }
    }
}
