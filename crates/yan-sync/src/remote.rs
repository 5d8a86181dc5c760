use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use yan_protocol::{PushOutcome, TransferItem};
use yan_refs::BranchKey;
use yan_store::Commit;
use yan_types::Hash;

use crate::error::SyncResult;

/// A lazily produced or consumed sequence of transfer items.
pub type TransferStream = BoxStream<'static, SyncResult<TransferItem>>;

/// What a remote returns for a pull.
pub struct PullResponse {
    /// Common ancestor of the client's head and `head`, if any.
    pub lca: Option<Hash<Commit>>,
    /// The remote branch head.
    pub head: Option<Hash<Commit>>,
    /// Objects reachable from `head` but not from `lca`, dependencies first.
    pub payload: TransferStream,
}

impl PullResponse {
    /// A response that carries no objects.
    pub fn empty(lca: Option<Hash<Commit>>, head: Option<Hash<Commit>>) -> Self {
        Self {
            lca,
            head,
            payload: stream::empty().boxed(),
        }
    }
}

impl std::fmt::Debug for PullResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PullResponse")
            .field("lca", &self.lca)
            .field("head", &self.head)
            .finish_non_exhaustive()
    }
}

/// The server side of sync, as seen by a client.
#[async_trait]
pub trait Remote: Send + Sync {
    /// Fetch `branch`, telling the remote the last head the client knows.
    async fn pull(&self, branch: &BranchKey, head: Option<Hash<Commit>>)
        -> SyncResult<PullResponse>;

    /// Upload `payload` and move `branch` to its last commit, provided the
    /// branch is still at `expected`.
    async fn push(
        &self,
        branch: &BranchKey,
        expected: Option<Hash<Commit>>,
        payload: TransferStream,
    ) -> SyncResult<PushOutcome>;
}
