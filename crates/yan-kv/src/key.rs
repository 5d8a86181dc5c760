//! Segmented keys and their order-preserving string encoding.

use std::fmt;

use crate::error::{KvError, KvResult};

/// Separator between encoded segments (ASCII 35).
pub const SEPARATOR: char = '#';

/// The character immediately after [`SEPARATOR`]; closes a prefix range.
const SEPARATOR_SUCCESSOR: char = '$';

/// Lowest byte permitted inside a segment (`$`).
const MIN_SEGMENT_BYTE: u8 = 36;

/// Highest byte permitted inside a segment (`~`).
const MAX_SEGMENT_BYTE: u8 = 126;

/// An ordered sequence of string segments addressing a KV row.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Key(Vec<String>);

impl Key {
    /// Build a key from segments.
    pub fn new<I>(segments: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    /// Return a copy of this key with one more trailing segment.
    pub fn child(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Self(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check that a single segment can be encoded.
    pub fn validate_segment(segment: &str) -> KvResult<()> {
        if segment.is_empty() {
            return Err(KvError::InvalidKey {
                segment: segment.to_string(),
                reason: "segment must not be empty".into(),
            });
        }
        if let Some(byte) = segment
            .bytes()
            .find(|b| !(MIN_SEGMENT_BYTE..=MAX_SEGMENT_BYTE).contains(b))
        {
            return Err(KvError::InvalidKey {
                segment: segment.to_string(),
                reason: format!(
                    "byte {byte} outside permitted range {MIN_SEGMENT_BYTE}..={MAX_SEGMENT_BYTE}"
                ),
            });
        }
        Ok(())
    }

    /// Encode as a row key. Row keys need at least one segment.
    pub fn encode(&self) -> KvResult<String> {
        if self.0.is_empty() {
            return Err(KvError::InvalidKey {
                segment: String::new(),
                reason: "key must have at least one segment".into(),
            });
        }
        self.encode_prefix()
    }

    /// Encode as a scan prefix. The empty key encodes to a bare separator
    /// and matches every row.
    pub fn encode_prefix(&self) -> KvResult<String> {
        let mut out = String::with_capacity(1 + self.0.iter().map(|s| s.len() + 1).sum::<usize>());
        out.push(SEPARATOR);
        for segment in &self.0 {
            Self::validate_segment(segment)?;
            out.push_str(segment);
            out.push(SEPARATOR);
        }
        Ok(out)
    }

    /// The half-open encoded range `[start, end)` covering every row at or
    /// below this key.
    pub fn prefix_range(&self) -> KvResult<(String, String)> {
        let start = self.encode_prefix()?;
        let mut end = start.clone();
        end.pop();
        end.push(SEPARATOR_SUCCESSOR);
        Ok((start, end))
    }

    /// Inverse of [`Key::encode`].
    pub fn decode(encoded: &str) -> KvResult<Self> {
        let inner = encoded
            .strip_prefix(SEPARATOR)
            .and_then(|rest| rest.strip_suffix(SEPARATOR))
            .ok_or_else(|| KvError::InvalidKey {
                segment: encoded.to_string(),
                reason: "encoded key must start and end with the separator".into(),
            })?;
        let key = Self::new(inner.split(SEPARATOR));
        for segment in &key.0 {
            Self::validate_segment(segment)?;
        }
        Ok(key)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

impl<const N: usize> From<[&str; N]> for Key {
    fn from(segments: [&str; N]) -> Self {
        Self::new(segments)
    }
}
