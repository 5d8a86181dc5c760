//! [`Remote`] over HTTP.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Body, Client, Response, StatusCode};
use tracing::debug;
use yan_protocol::{
    branch_path, decode_stream, encode_stream, headers, parse_head, HeadQuery, PushOutcome,
    PushResponse,
};
use yan_refs::BranchKey;
use yan_store::Commit;
use yan_types::Hash;

use crate::error::{SyncError, SyncResult};
use crate::remote::{PullResponse, Remote, TransferStream};

/// Applied to every request unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

const OCTET_STREAM: &str = "application/octet-stream";

/// A sync server reached over HTTP.
///
/// Bodies are streamed in both directions. Each request, body included,
/// must finish within the configured timeout; dropping the returned future
/// or pull stream aborts the request. Objects already received by either
/// side are left in place and no branch moves.
#[derive(Clone, Debug)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
}

impl HttpRemote {
    /// A remote rooted at `base_url`, e.g. `http://host:9418`.
    pub fn new(base_url: impl Into<String>) -> SyncResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> SyncResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, branch: &BranchKey) -> String {
        format!("{}{}", self.base_url, branch_path(branch))
    }
}

#[async_trait]
impl Remote for HttpRemote {
    async fn pull(
        &self,
        branch: &BranchKey,
        head: Option<Hash<Commit>>,
    ) -> SyncResult<PullResponse> {
        let url = self.url(branch);
        debug!(%url, ?head, "GET");
        let response = self
            .client
            .get(&url)
            .query(&HeadQuery::new(head.as_ref()))
            .send()
            .await?;
        let response = check_status(response).await?;
        let lca = parse_head(header(&response, headers::SYNC_LCA))?;
        let head = parse_head(header(&response, headers::SYNC_HEAD))?;
        let chunks = response.bytes_stream().map_err(SyncError::from);
        Ok(PullResponse {
            lca,
            head,
            payload: decode_stream(chunks).boxed(),
        })
    }

    async fn push(
        &self,
        branch: &BranchKey,
        expected: Option<Hash<Commit>>,
        payload: TransferStream,
    ) -> SyncResult<PushOutcome> {
        let url = self.url(branch);
        debug!(%url, ?expected, "POST");
        let response = self
            .client
            .post(&url)
            .query(&HeadQuery::new(expected.as_ref()))
            .header(CONTENT_TYPE, OCTET_STREAM)
            .body(Body::wrap_stream(encode_stream(payload)))
            .send()
            .await?;
        let response = check_status(response).await?;
        let body: PushResponse = response.json().await?;
        Ok(PushOutcome::try_from(body)?)
    }
}

fn header<'a>(response: &'a Response, name: &str) -> &'a str {
    response
        .headers()
        .get(name)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

/// Turn a non-2xx response into [`SyncError::Remote`].
async fn check_status(response: Response) -> SyncResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(remote_error(status, response.text().await))
}

/// Prefer the `message` field of a JSON error body, then the raw body. A body
/// that could not be read is reported next to the status reason.
fn remote_error(status: StatusCode, body: Result<String, impl fmt::Display>) -> SyncError {
    let message = match body {
        Ok(text) => serde_json::from_str::<serde_json::Value>(&text)
            .ok()
            .and_then(|json| json.get("message")?.as_str().map(str::to_string))
            .unwrap_or(text),
        Err(e) => format!(
            "{} (error body unreadable: {e})",
            status.canonical_reason().unwrap_or("unknown status")
        ),
    };
    SyncError::Remote {
        status: status.as_u16(),
        message,
    }
}
