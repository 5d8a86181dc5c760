use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use yan_protocol::ProtocolError;
use yan_refs::RefError;
use yan_sdk::YanError;
use yan_store::StoreError;
use yan_sync::SyncError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("ref error: {0}")]
    Ref(#[from] RefError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl ServerError {
    /// The HTTP status this error is reported with.
    ///
    /// Malformed input (bad names, bad hashes, broken or inconsistent
    /// transfer streams) is the client's fault. A push that would rewrite
    /// history conflicts with the branch.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Sync(e) => sync_status(e),
            Self::Protocol(_) => StatusCode::BAD_REQUEST,
            Self::Ref(e) => ref_status(e),
            Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

fn sync_status(e: &SyncError) -> StatusCode {
    match e {
        SyncError::Protocol(_)
        | SyncError::HashMismatch { .. }
        | SyncError::MissingDependency { .. }
        | SyncError::Transport(_) => StatusCode::BAD_REQUEST,
        SyncError::Yan(e) => yan_status(e),
        SyncError::Store(e) => store_status(e),
        SyncError::Ref(e) => ref_status(e),
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn yan_status(e: &YanError) -> StatusCode {
    match e {
        YanError::NotFound { .. } | YanError::BranchNotFound { .. } => StatusCode::NOT_FOUND,
        YanError::NotFastForward { .. } | YanError::ConcurrentUpdate { .. } => {
            StatusCode::CONFLICT
        }
        YanError::Store(e) => store_status(e),
        YanError::Ref(e) => ref_status(e),
        YanError::Diff(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn store_status(e: &StoreError) -> StatusCode {
    match e {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Kv(_) => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::BAD_REQUEST,
    }
}

fn ref_status(e: &RefError) -> StatusCode {
    match e {
        RefError::InvalidBranchName { .. }
        | RefError::InvalidNamespace { .. }
        | RefError::InvalidRemoteName { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, %status, "request rejected");
        }
        let body = serde_json::json!({
            "error": status.canonical_reason().unwrap_or("error"),
            "message": self.to_string(),
        });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yan_types::Hash;

    #[test]
    fn client_mistakes_are_bad_requests() {
        let bad_hash = ServerError::from(ProtocolError::InvalidHash("zz".into()));
        assert_eq!(bad_hash.status(), StatusCode::BAD_REQUEST);

        let truncated = ServerError::from(SyncError::from(ProtocolError::Truncated));
        assert_eq!(truncated.status(), StatusCode::BAD_REQUEST);

        let missing = ServerError::from(SyncError::MissingDependency {
            id: Hash::from_bytes([1; 32]),
            missing: Hash::from_bytes([2; 32]),
        });
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn history_rewrite_conflicts() {
        let e = ServerError::from(SyncError::from(YanError::NotFastForward {
            branch: "acme/site/main".into(),
            current: Hash::from_bytes([1; 32]),
            attempted: Hash::from_bytes([2; 32]),
        }));
        assert_eq!(e.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn unknown_paths_are_not_found() {
        let e = ServerError::from(SyncError::from(YanError::NotFound {
            path: "index.html".into(),
        }));
        assert_eq!(e.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn config_errors_are_internal() {
        assert_eq!(
            ServerError::Config("bad".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
