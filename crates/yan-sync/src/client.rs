use std::collections::BTreeMap;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};
use yan_protocol::PushOutcome;
use yan_refs::{validate_remote_name, BranchKey, PushStrategy};
use yan_sdk::Yan;
use yan_store::Commit;
use yan_types::Hash;

use crate::error::{SyncError, SyncResult};
use crate::payload::{create_payload, receive_payload};
use crate::remote::{Remote, TransferStream};
use crate::tracking::RemoteStore;
use crate::types::{MergeStatus, PullResult, PushResult, SyncReport};

/// Message of the commit produced when local changes are replayed onto a
/// new remote head.
pub const REBASE_MESSAGE: &str = "rebased commit";

/// The replica side of sync.
pub struct SyncClient {
    yan: Yan,
    remotes: BTreeMap<String, Arc<dyn Remote>>,
    tracking: Arc<dyn RemoteStore>,
}

impl SyncClient {
    pub fn new(yan: Yan, tracking: Arc<dyn RemoteStore>) -> Self {
        Self {
            yan,
            remotes: BTreeMap::new(),
            tracking,
        }
    }

    pub fn yan(&self) -> &Yan {
        &self.yan
    }

    // ---- Remotes ----

    /// Register `remote` under `name`, replacing any remote of that name.
    pub fn add_remote(&mut self, name: &str, remote: Arc<dyn Remote>) -> SyncResult<()> {
        validate_remote_name(name)?;
        self.remotes.insert(name.to_string(), remote);
        Ok(())
    }

    /// Forget a remote together with its tracking entries.
    pub fn remove_remote(&mut self, name: &str) -> SyncResult<()> {
        if self.remotes.remove(name).is_none() {
            return Err(SyncError::RemoteNotFound(name.to_string()));
        }
        let mut table = self.tracking.read()?;
        if table.remove(name).is_some() {
            self.tracking.write(&table)?;
        }
        Ok(())
    }

    pub fn remotes(&self) -> impl Iterator<Item = &str> {
        self.remotes.keys().map(String::as_str)
    }

    fn remote(&self, name: &str) -> SyncResult<&Arc<dyn Remote>> {
        self.remotes
            .get(name)
            .ok_or_else(|| SyncError::RemoteNotFound(name.to_string()))
    }

    /// The last head of `branch` seen on `remote`.
    pub fn tracked_head(&self, remote: &str, branch: &BranchKey) -> SyncResult<Option<Hash<Commit>>> {
        let table = self.tracking.read()?;
        Ok(table
            .get(remote)
            .and_then(|branches| branches.get(&branch.to_string()))
            .copied())
    }

    fn track(&self, remote: &str, branch: &BranchKey, head: Option<Hash<Commit>>) -> SyncResult<()> {
        let mut table = self.tracking.read()?;
        let key = branch.to_string();
        match head {
            Some(head) => {
                table.entry(remote.to_string()).or_default().insert(key, head);
            }
            None => {
                let Some(branches) = table.get_mut(remote) else {
                    return Ok(());
                };
                branches.remove(&key);
                if branches.is_empty() {
                    table.remove(remote);
                }
            }
        }
        self.tracking.write(&table)
    }

    // ---- Sync operations ----

    /// Fetch `branch` from `remote` and bring the local branch up to date.
    ///
    /// Diverged histories are resolved by replaying the local changes since
    /// the common ancestor on top of the remote head as one new commit; the
    /// local branch is then moved there regardless of ancestry.
    pub async fn pull(&self, remote: &str, branch: &BranchKey) -> SyncResult<PullResult> {
        let last = self.tracked_head(remote, branch)?;
        let response = self.remote(remote)?.pull(branch, last).await?;
        receive_payload(&self.yan, response.payload).await?;

        let local = self.yan.head(branch)?;
        let status = self.reconcile(branch, local, response.head)?;
        self.track(remote, branch, response.head)?;
        info!(remote, %branch, ?status, "pulled");
        Ok(PullResult {
            lca: response.lca,
            head: response.head,
            status,
        })
    }

    /// Move the local branch toward the remote head after a pull.
    ///
    /// A rebase replays `diff(lca, local)`, the changes local made since the
    /// shared base, on top of the remote head. Diffing against the remote
    /// head instead would revert the remote's own changes.
    fn reconcile(
        &self,
        branch: &BranchKey,
        local: Option<Hash<Commit>>,
        remote: Option<Hash<Commit>>,
    ) -> SyncResult<MergeStatus> {
        let Some(remote) = remote else {
            return Ok(MergeStatus::Empty);
        };
        let Some(local) = local else {
            self.yan.push(branch, &remote, PushStrategy::FastForward)?;
            return Ok(MergeStatus::FastForward);
        };
        if local == remote {
            return Ok(MergeStatus::UpToDate);
        }
        let lca = self.yan.lca(&local, &remote)?;
        if lca == Some(local) {
            self.yan.push(branch, &remote, PushStrategy::FastForward)?;
            return Ok(MergeStatus::FastForward);
        }
        if lca == Some(remote) {
            return Ok(MergeStatus::Ahead);
        }
        let changes = self.yan.diff(lca.as_ref(), &local)?;
        let rebased = self.yan.apply(&remote, &changes, REBASE_MESSAGE)?;
        self.yan.push(branch, &rebased, PushStrategy::Replace)?;
        info!(
            %branch,
            local = %local.short_hex(),
            remote = %remote.short_hex(),
            rebased = %rebased.short_hex(),
            changes = changes.len(),
            "rebased local changes"
        );
        Ok(MergeStatus::Rebased { commit: rebased })
    }

    /// Send the local head of `branch` to `remote`.
    ///
    /// Only objects the remote is missing relative to the tracked head are
    /// sent. A [`PushOutcome::HeadMismatch`] means the remote moved since the
    /// last pull; nothing is retried here.
    pub async fn push(&self, remote: &str, branch: &BranchKey) -> SyncResult<PushResult> {
        let target = self.remote(remote)?;
        let tracked = self.tracked_head(remote, branch)?;
        let local = self.yan.head(branch)?;
        if local == tracked {
            return Ok(PushResult {
                outcome: PushOutcome::Accepted { head: local },
                up_to_date: true,
            });
        }

        let payload: TransferStream = match &local {
            Some(head) => stream::iter(create_payload(&self.yan, head, tracked.as_ref())?).boxed(),
            None => stream::empty().boxed(),
        };
        let outcome = target.push(branch, tracked, payload).await?;
        match outcome {
            PushOutcome::Accepted { head } => {
                self.track(remote, branch, head)?;
                info!(remote, %branch, head = ?head, "pushed");
            }
            PushOutcome::HeadMismatch { actual } => {
                warn!(remote, %branch, expected = ?tracked, ?actual, "push rejected");
            }
        }
        Ok(PushResult {
            outcome,
            up_to_date: false,
        })
    }

    /// Pull, then push if the local branch is still ahead of the remote.
    pub async fn sync(&self, remote: &str, branch: &BranchKey) -> SyncResult<SyncReport> {
        let pull = self.pull(remote, branch).await?;
        let local = self.yan.head(branch)?;
        let push = if local.is_some() && local != self.tracked_head(remote, branch)? {
            Some(self.push(remote, branch).await?)
        } else {
            None
        };
        Ok(SyncReport { pull, push })
    }
}

impl std::fmt::Debug for SyncClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncClient")
            .field("yan", &self.yan)
            .field("remotes", &self.remotes.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::SyncServer;
    use crate::tracking::InMemoryRemoteStore;
    use yan_sdk::FileEdits;
    use yan_types::Blob;

    fn main_branch() -> BranchKey {
        BranchKey::new("acme", "site", "main").unwrap()
    }

    fn edits(path: &str, content: &str) -> FileEdits {
        FileEdits::from([(path.to_string(), Some(Blob::from(content)))])
    }

    fn setup() -> (SyncServer, SyncClient) {
        let server = SyncServer::new(Yan::in_memory());
        let mut client = SyncClient::new(Yan::in_memory(), Arc::new(InMemoryRemoteStore::new()));
        client
            .add_remote("origin", Arc::new(server.clone()))
            .unwrap();
        (server, client)
    }

    #[test]
    fn remote_names_are_validated() {
        let (server, mut client) = setup();
        assert!(client.add_remote("bad/name", Arc::new(server.clone())).is_err());
        assert!(client.add_remote("", Arc::new(server)).is_err());
        assert_eq!(client.remotes().collect::<Vec<_>>(), vec!["origin"]);
    }

    #[tokio::test]
    async fn unknown_remote() {
        let (_, mut client) = setup();
        assert!(matches!(
            client.pull("upstream", &main_branch()).await,
            Err(SyncError::RemoteNotFound(name)) if name == "upstream"
        ));
        assert!(matches!(
            client.push("upstream", &main_branch()).await,
            Err(SyncError::RemoteNotFound(_))
        ));
        client.remove_remote("origin").unwrap();
        assert!(matches!(
            client.remove_remote("origin"),
            Err(SyncError::RemoteNotFound(_))
        ));
    }

    #[tokio::test]
    async fn pull_of_empty_remote() {
        let (_, client) = setup();
        let result = client.pull("origin", &main_branch()).await.unwrap();
        assert_eq!(result.status, MergeStatus::Empty);
        assert_eq!(client.tracked_head("origin", &main_branch()).unwrap(), None);
    }

    #[tokio::test]
    async fn first_push_creates_remote_branch() {
        let (server, client) = setup();
        let c0 = client.yan().write(None, edits("a", "1"), "c0").unwrap();
        client
            .yan()
            .push(&main_branch(), &c0, PushStrategy::default())
            .unwrap();

        let result = client.push("origin", &main_branch()).await.unwrap();
        assert!(result.is_accepted());
        assert!(!result.up_to_date);
        assert_eq!(server.yan().head(&main_branch()).unwrap(), Some(c0));
        assert_eq!(client.tracked_head("origin", &main_branch()).unwrap(), Some(c0));

        let again = client.push("origin", &main_branch()).await.unwrap();
        assert!(again.up_to_date);
    }

    #[tokio::test]
    async fn pull_when_local_is_ahead() {
        let (server, client) = setup();
        let c0 = server.yan().write(None, edits("a", "1"), "c0").unwrap();
        server
            .yan()
            .push(&main_branch(), &c0, PushStrategy::default())
            .unwrap();
        client.pull("origin", &main_branch()).await.unwrap();

        let c1 = client.yan().write(Some(c0), edits("b", "2"), "c1").unwrap();
        client
            .yan()
            .push(&main_branch(), &c1, PushStrategy::default())
            .unwrap();
        let result = client.pull("origin", &main_branch()).await.unwrap();
        assert_eq!(result.status, MergeStatus::Ahead);
        assert_eq!(client.yan().head(&main_branch()).unwrap(), Some(c1));
    }

    #[tokio::test]
    async fn sync_pushes_only_when_ahead() {
        let (server, client) = setup();
        let c0 = server.yan().write(None, edits("a", "1"), "c0").unwrap();
        server
            .yan()
            .push(&main_branch(), &c0, PushStrategy::default())
            .unwrap();

        let report = client.sync("origin", &main_branch()).await.unwrap();
        assert_eq!(report.pull.status, MergeStatus::FastForward);
        assert_eq!(report.push, None);

        let c1 = client.yan().write(Some(c0), edits("b", "2"), "c1").unwrap();
        client
            .yan()
            .push(&main_branch(), &c1, PushStrategy::default())
            .unwrap();
        let report = client.sync("origin", &main_branch()).await.unwrap();
        assert_eq!(report.pull.status, MergeStatus::Ahead);
        assert!(report.push.unwrap().is_accepted());
        assert_eq!(server.yan().head(&main_branch()).unwrap(), Some(c1));
    }

    #[tokio::test]
    async fn removing_remote_drops_tracking() {
        let (server, mut client) = setup();
        let c0 = server.yan().write(None, edits("a", "1"), "c0").unwrap();
        server
            .yan()
            .push(&main_branch(), &c0, PushStrategy::default())
            .unwrap();
        client.pull("origin", &main_branch()).await.unwrap();
        assert!(client.tracked_head("origin", &main_branch()).unwrap().is_some());

        client.remove_remote("origin").unwrap();
        client
            .add_remote("origin", Arc::new(server))
            .unwrap();
        assert_eq!(client.tracked_head("origin", &main_branch()).unwrap(), None);
    }
}
