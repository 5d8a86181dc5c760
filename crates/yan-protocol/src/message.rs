//! JSON and header values exchanged over the HTTP binding.

use serde::{Deserialize, Serialize};
use yan_store::Commit;
use yan_types::Hash;

use crate::error::{ProtocolError, ProtocolResult};

pub const PROTOCOL_VERSION: u32 = 1;

/// `error` value of a push rejected because the branch moved.
pub const HEAD_MISMATCH: &str = "head_mismatch";

/// Result of a push as seen by both ends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    /// The branch now points at `head` (`None` if it was and stays unset).
    Accepted { head: Option<Hash<Commit>> },
    /// The branch was not at the expected head; nothing moved.
    HeadMismatch { actual: Option<Hash<Commit>> },
}

/// JSON body of a push response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub head: Option<Hash<Commit>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_head: Option<Hash<Commit>>,
}

impl From<PushOutcome> for PushResponse {
    fn from(outcome: PushOutcome) -> Self {
        match outcome {
            PushOutcome::Accepted { head } => Self {
                success: true,
                head,
                error: None,
                actual_head: None,
            },
            PushOutcome::HeadMismatch { actual } => Self {
                success: false,
                head: None,
                error: Some(HEAD_MISMATCH.into()),
                actual_head: actual,
            },
        }
    }
}

impl TryFrom<PushResponse> for PushOutcome {
    type Error = ProtocolError;

    fn try_from(response: PushResponse) -> ProtocolResult<Self> {
        if response.success {
            return Ok(Self::Accepted {
                head: response.head,
            });
        }
        match response.error.as_deref() {
            Some(HEAD_MISMATCH) => Ok(Self::HeadMismatch {
                actual: response.actual_head,
            }),
            other => Err(ProtocolError::Rejected(
                other.unwrap_or("unspecified").to_string(),
            )),
        }
    }
}

/// The `?head=` query of both branch endpoints.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HeadQuery {
    #[serde(default)]
    pub head: Option<String>,
}

impl HeadQuery {
    pub fn new(head: Option<&Hash<Commit>>) -> Self {
        Self {
            head: head.map(Hash::to_hex),
        }
    }

    /// The parsed head; missing and empty both mean `None`.
    pub fn head(&self) -> ProtocolResult<Option<Hash<Commit>>> {
        parse_head(self.head.as_deref().unwrap_or_default())
    }
}

/// Render an optional head for a header or query value.
pub fn format_head(head: Option<&Hash<Commit>>) -> String {
    head.map(Hash::to_hex).unwrap_or_default()
}

/// Parse a header or query value written by [`format_head`].
pub fn parse_head(value: &str) -> ProtocolResult<Option<Hash<Commit>>> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    Hash::from_hex(value)
        .map(Some)
        .map_err(|_| ProtocolError::InvalidHash(value.to_string()))
}
