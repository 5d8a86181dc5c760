use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use tracing::{info, warn};
use yan_protocol::PushOutcome;
use yan_refs::BranchKey;
use yan_sdk::{HeadUpdate, Yan};
use yan_store::Commit;
use yan_types::Hash;

use crate::error::SyncResult;
use crate::payload::{create_payload, receive_payload};
use crate::remote::{PullResponse, Remote, TransferStream};

/// The authoritative side of sync.
///
/// Holds no per-client state: every call is a complete transaction against
/// the branch as it is at that moment.
#[derive(Clone, Debug)]
pub struct SyncServer {
    yan: Yan,
}

impl SyncServer {
    pub fn new(yan: Yan) -> Self {
        Self { yan }
    }

    pub fn yan(&self) -> &Yan {
        &self.yan
    }

    /// Everything the client is missing to reach the branch head.
    ///
    /// `client_head` is the last head of this branch the client has seen.
    /// A head this server has never stored shares no history with it.
    pub fn pull(
        &self,
        branch: &BranchKey,
        client_head: Option<Hash<Commit>>,
    ) -> SyncResult<PullResponse> {
        let Some(head) = self.yan.head(branch)? else {
            return Ok(PullResponse::empty(None, None));
        };
        let lca = match client_head {
            Some(client) if self.yan.has_commit(&client)? => self.yan.lca(&client, &head)?,
            _ => None,
        };
        if lca == Some(head) {
            return Ok(PullResponse::empty(lca, Some(head)));
        }
        let payload = create_payload(&self.yan, &head, lca.as_ref())?;
        info!(%branch, head = %head.short_hex(), lca = ?lca, "serving pull");
        Ok(PullResponse {
            lca,
            head: Some(head),
            payload: stream::iter(payload).boxed(),
        })
    }

    /// Apply a client's payload if the branch is still at `expected`.
    ///
    /// The expected-head check is the only concurrency control. A push that
    /// loses it, before or after its objects are received, gets
    /// [`PushOutcome::HeadMismatch`] with the head that won.
    pub async fn push(
        &self,
        branch: &BranchKey,
        expected: Option<Hash<Commit>>,
        payload: TransferStream,
    ) -> SyncResult<PushOutcome> {
        let current = self.yan.head(branch)?;
        if current != expected {
            warn!(%branch, ?expected, actual = ?current, "push rejected: head mismatch");
            return Ok(PushOutcome::HeadMismatch { actual: current });
        }
        let Some(new_head) = receive_payload(&self.yan, payload).await? else {
            return Ok(PushOutcome::Accepted { head: current });
        };
        match self.yan.compare_and_push(branch, expected, &new_head)? {
            HeadUpdate::Updated => {
                info!(%branch, head = %new_head.short_hex(), "push accepted");
                Ok(PushOutcome::Accepted {
                    head: Some(new_head),
                })
            }
            HeadUpdate::Mismatch { actual } => {
                warn!(%branch, ?expected, ?actual, "push lost race for branch");
                Ok(PushOutcome::HeadMismatch { actual })
            }
        }
    }
}

#[async_trait]
impl Remote for SyncServer {
    async fn pull(
        &self,
        branch: &BranchKey,
        head: Option<Hash<Commit>>,
    ) -> SyncResult<PullResponse> {
        SyncServer::pull(self, branch, head)
    }

    async fn push(
        &self,
        branch: &BranchKey,
        expected: Option<Hash<Commit>>,
        payload: TransferStream,
    ) -> SyncResult<PushOutcome> {
        SyncServer::push(self, branch, expected, payload).await
    }
}
