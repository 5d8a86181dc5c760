//! Synchronization between Yan replicas.
//!
//! A [`SyncServer`] is the authority for a set of branches. A [`SyncClient`]
//! pulls from and pushes to any number of named [`Remote`]s, either a server
//! in the same process or an [`HttpRemote`], and remembers the last head it
//! saw for every remote branch in a [`RemoteStore`].
//!
//! Pulls reconcile by fast-forward or, when histories have diverged, by
//! replaying the local changes on top of the remote head. Pushes are guarded
//! by the expected remote head; losing that race is reported as a
//! [`PushOutcome::HeadMismatch`] and the caller decides whether to sync again.

pub mod client;
pub mod error;
pub mod http;
pub mod payload;
pub mod remote;
pub mod server;
pub mod tracking;
pub mod types;

pub use client::SyncClient;
pub use error::{SyncError, SyncResult};
pub use http::{HttpRemote, DEFAULT_TIMEOUT};
pub use payload::{create_payload, receive_payload, PayloadIter};
pub use remote::{PullResponse, Remote, TransferStream};
pub use server::SyncServer;
pub use tracking::{FileRemoteStore, InMemoryRemoteStore, RemoteStore, RemoteTable};
pub use types::{MergeStatus, PullResult, PushResult, SyncReport};
pub use yan_protocol::PushOutcome;
