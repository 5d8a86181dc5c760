//! Core reference types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use yan_kv::Key;
use yan_store::Commit;
use yan_types::Hash;

use crate::error::{RefError, Result};
use crate::names::{validate_branch_name, validate_namespace};

/// KV namespace holding branch rows.
pub(crate) const BRANCHES: &str = "branches";

/// Identifies one branch: `[org, app, name]`.
///
/// Rendered (and parsed) as `org/app/name`; the name itself may contain
/// further slashes.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BranchKey {
    pub org: String,
    pub app: String,
    pub name: String,
}

impl BranchKey {
    /// Build a validated branch key.
    pub fn new(
        org: impl Into<String>,
        app: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self> {
        let key = Self {
            org: org.into(),
            app: app.into(),
            name: name.into(),
        };
        validate_namespace(&key.org)?;
        validate_namespace(&key.app)?;
        validate_branch_name(&key.name)?;
        Ok(key)
    }

    /// The KV key of this branch's row.
    pub fn kv_key(&self) -> Key {
        Key::new(
            [BRANCHES, self.org.as_str(), self.app.as_str()]
                .into_iter()
                .chain(self.name.split('/')),
        )
    }

    /// The KV prefix shared by every branch of `org/app`.
    pub(crate) fn namespace_key(org: &str, app: &str) -> Key {
        Key::new([BRANCHES, org, app])
    }

    /// Recover a branch key from its KV key.
    pub(crate) fn from_kv_key(key: &Key) -> Option<Self> {
        match key.segments() {
            [ns, org, app, name @ ..] if ns == BRANCHES && !name.is_empty() => Some(Self {
                org: org.clone(),
                app: app.clone(),
                name: name.join("/"),
            }),
            _ => None,
        }
    }
}

impl fmt::Display for BranchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.org, self.app, self.name)
    }
}

impl FromStr for BranchKey {
    type Err = RefError;

    fn from_str(s: &str) -> Result<Self> {
        let mut parts = s.splitn(3, '/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(org), Some(app), Some(name)) => Self::new(org, app, name),
            _ => Err(RefError::InvalidBranchName {
                name: s.to_string(),
                reason: "expected org/app/branch".into(),
            }),
        }
    }
}

/// A branch's current head together with the KV version of its row.
///
/// The version is what a subsequent compare-and-swap must name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BranchHead {
    pub head: Hash<Commit>,
    pub version: u64,
}

/// How a branch push treats the existing head.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PushStrategy {
    /// The new head must descend from the current head.
    #[default]
    FastForward,
    /// Move the pointer regardless of ancestry.
    Replace,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_and_parse_roundtrip() {
        let key = BranchKey::new("acme", "site", "feature/login").unwrap();
        assert_eq!(key.to_string(), "acme/site/feature/login");
        assert_eq!("acme/site/feature/login".parse::<BranchKey>().unwrap(), key);
    }

    #[test]
    fn parse_requires_three_parts() {
        assert!("acme/site".parse::<BranchKey>().is_err());
        assert!("acme//main".parse::<BranchKey>().is_err());
    }

    #[test]
    fn kv_key_splits_nested_names() {
        let key = BranchKey::new("acme", "site", "feature/login").unwrap();
        let kv = key.kv_key();
        assert_eq!(kv.segments(), ["branches", "acme", "site", "feature", "login"]);
        assert_eq!(BranchKey::from_kv_key(&kv), Some(key));
    }

    #[test]
    fn invalid_parts_are_rejected() {
        assert!(BranchKey::new("ac/me", "site", "main").is_err());
        assert!(BranchKey::new("acme", "", "main").is_err());
        assert!(BranchKey::new("acme", "site", "bad..name").is_err());
    }

    #[test]
    fn push_strategy_serde() {
        assert_eq!(PushStrategy::default(), PushStrategy::FastForward);
        assert_eq!(
            serde_json::to_string(&PushStrategy::FastForward).unwrap(),
            "\"fast-forward\""
        );
        assert_eq!(
            serde_json::to_string(&PushStrategy::Replace).unwrap(),
            "\"replace\""
        );
    }
}
