use thiserror::Error;
use yan_types::Hash;

use yan_store::Commit;

#[derive(Debug, Error)]
pub enum YanError {
    #[error("path not found: {path}")]
    NotFound { path: String },

    #[error("branch not found: {name}")]
    BranchNotFound { name: String },

    #[error("not a fast-forward update of {branch}: {attempted} does not descend from {current}")]
    NotFastForward {
        branch: String,
        current: Hash<Commit>,
        attempted: Hash<Commit>,
    },

    #[error("branch {branch} was updated concurrently")]
    ConcurrentUpdate { branch: String },

    #[error("store error: {0}")]
    Store(#[from] yan_store::StoreError),

    #[error("ref error: {0}")]
    Ref(#[from] yan_refs::RefError),

    #[error("diff error: {0}")]
    Diff(#[from] yan_diff::DiffError),
}

pub type YanResult<T> = Result<T, YanError>;
