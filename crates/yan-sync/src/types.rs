use yan_protocol::PushOutcome;
use yan_store::Commit;
use yan_types::Hash;

/// How a pull left the local branch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MergeStatus {
    /// Local and remote heads are equal.
    #[default]
    UpToDate,
    /// The local branch moved forward to the remote head.
    FastForward,
    /// The local branch already contains the remote head; push to publish.
    Ahead,
    /// Histories diverged; local changes were replayed onto the remote head.
    Rebased { commit: Hash<Commit> },
    /// The remote branch does not exist.
    Empty,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PullResult {
    /// Common ancestor reported by the remote.
    pub lca: Option<Hash<Commit>>,
    /// Remote head at the time of the pull.
    pub head: Option<Hash<Commit>>,
    pub status: MergeStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PushResult {
    pub outcome: PushOutcome,
    /// `true` when nothing was sent because the remote already had the head.
    pub up_to_date: bool,
}

impl PushResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self.outcome, PushOutcome::Accepted { .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SyncReport {
    pub pull: PullResult,
    /// `None` when the pull left nothing to push.
    pub push: Option<PushResult>,
}
