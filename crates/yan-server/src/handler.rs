use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::{StreamExt, TryStreamExt};
use yan_protocol::{
    decode_stream, encode_stream, format_head, headers, HeadQuery, HealthResponse, PushResponse,
};
use yan_refs::BranchKey;
use yan_sync::{SyncError, SyncServer};

use crate::error::ServerResult;

const OCTET_STREAM: &str = "application/octet-stream";

/// `GET /v1/health`
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// `GET /:org/:app/*branch?head=<client head>`
///
/// Responds with the lca and head in headers and the transfer stream as the
/// body.
pub async fn pull_handler(
    State(server): State<SyncServer>,
    Path((org, app, name)): Path<(String, String, String)>,
    Query(query): Query<HeadQuery>,
) -> ServerResult<Response> {
    let branch = branch_key(org, app, &name)?;
    let pull = server.pull(&branch, query.head()?)?;
    let headers = [
        (headers::SYNC_LCA, format_head(pull.lca.as_ref())),
        (headers::SYNC_HEAD, format_head(pull.head.as_ref())),
    ];
    let body = Body::from_stream(encode_stream(pull.payload));
    Ok(([(CONTENT_TYPE, OCTET_STREAM)], headers, body).into_response())
}

/// `POST /:org/:app/*branch?head=<expected head>` with a transfer stream body.
pub async fn push_handler(
    State(server): State<SyncServer>,
    Path((org, app, name)): Path<(String, String, String)>,
    Query(query): Query<HeadQuery>,
    body: Body,
) -> ServerResult<Json<PushResponse>> {
    let branch = branch_key(org, app, &name)?;
    let expected = query.head()?;
    let chunks = body
        .into_data_stream()
        .map_err(|e| SyncError::Transport(e.to_string()));
    let outcome = server
        .push(&branch, expected, decode_stream(chunks).boxed())
        .await?;
    Ok(Json(outcome.into()))
}

fn branch_key(org: String, app: String, name: &str) -> ServerResult<BranchKey> {
    Ok(BranchKey::new(org, app, name.trim_start_matches('/'))?)
}
