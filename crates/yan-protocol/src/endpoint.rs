use yan_refs::BranchKey;

use crate::message::PROTOCOL_VERSION;

/// HTTP endpoint paths.
pub mod endpoints {
    pub const HEALTH: &str = "/v1/health";
    /// Pull (`GET`) and push (`POST`) for one branch.
    pub const BRANCH: &str = "/:org/:app/*branch";
}

/// Response headers of a pull. Empty when the value is null.
pub mod headers {
    pub const SYNC_LCA: &str = "x-sync-lca";
    pub const SYNC_HEAD: &str = "x-sync-head";
}

/// Query parameter carrying the client's head (pull) or expected head (push).
pub const HEAD_QUERY: &str = "head";

/// The request path for `branch`: `/<org>/<app>/<branch name>`.
///
/// Every segment is percent-encoded; the `/` between the parts of a nested
/// branch name is kept.
pub fn branch_path(branch: &BranchKey) -> String {
    let name: Vec<_> = branch.name.split('/').map(urlencoding::encode).collect();
    format!(
        "/{}/{}/{}",
        urlencoding::encode(&branch.org),
        urlencoding::encode(&branch.app),
        name.join("/")
    )
}

/// Health check response.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub protocol_version: u32,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
            protocol_version: PROTOCOL_VERSION,
        }
    }
}
