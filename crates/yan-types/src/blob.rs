use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// An opaque byte payload plus string headers.
///
/// `Blob` is the value type of the versioned KV layer and the leaf object of
/// the content store. A blob with no body (`body == None`) is the null blob:
/// writing it to a KV key deletes the row.
///
/// The `version` header is assigned by the KV layer and is not part of the
/// blob's content; it is excluded from [`Blob::content_metadata`] and hence
/// from the content hash.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blob {
    pub body: Option<Vec<u8>>,
    pub metadata: BTreeMap<String, String>,
}

impl Blob {
    /// Header carrying the KV row version.
    pub const VERSION_HEADER: &'static str = "version";

    /// Create a blob with the given body and no headers.
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: Some(body.into()),
            metadata: BTreeMap::new(),
        }
    }

    /// The null blob (no body, no headers).
    pub fn null() -> Self {
        Self::default()
    }

    /// Returns `true` if this blob has no body.
    pub fn is_null(&self) -> bool {
        self.body.is_none()
    }

    /// The body bytes, empty for the null blob.
    pub fn bytes(&self) -> &[u8] {
        self.body.as_deref().unwrap_or_default()
    }

    /// Builder-style header setter.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(name.into(), value.into());
        self
    }

    /// Look up a header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.metadata.get(name).map(String::as_str)
    }

    /// The KV version carried in the headers, if any.
    ///
    /// A malformed version header is treated as absent.
    pub fn version(&self) -> Option<u64> {
        self.header(Self::VERSION_HEADER)?.parse().ok()
    }

    /// Attach a KV version.
    pub fn with_version(self, version: u64) -> Self {
        self.with_header(Self::VERSION_HEADER, version.to_string())
    }

    /// Strip the KV version.
    pub fn without_version(mut self) -> Self {
        self.metadata.remove(Self::VERSION_HEADER);
        self
    }

    /// Headers that belong to the content (everything but `version`).
    pub fn content_metadata(&self) -> BTreeMap<String, String> {
        self.metadata
            .iter()
            .filter(|(name, _)| name.as_str() != Self::VERSION_HEADER)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

impl From<&str> for Blob {
    fn from(body: &str) -> Self {
        Self::new(body.as_bytes())
    }
}

impl From<Vec<u8>> for Blob {
    fn from(body: Vec<u8>) -> Self {
        Self::new(body)
    }
}
