//! Name validation for branches, namespaces, and remotes.
//!
//! Valid branch names:
//! - Must be non-empty
//! - Must not contain whitespace, `~`, `^`, `:`, `?`, `*`, `[`, `\`
//! - Must not contain `..` or `@{`
//! - Must not start or end with `.` or `/`
//! - Must not end with `.lock`
//! - Components between slashes must be non-empty, must not start with `.`,
//!   and must be valid KV key segments (printable ASCII, no `#`)

use yan_kv::Key;

use crate::error::{RefError, Result};

/// Characters that are forbidden anywhere in a branch or remote name.
const FORBIDDEN_CHARS: &[char] = &[' ', '\t', '\n', '\r', '~', '^', ':', '?', '*', '[', '\\'];

/// Validate a branch name, returning `Ok(())` if valid.
///
/// # Examples
///
/// ```
/// use yan_refs::names::validate_branch_name;
///
/// assert!(validate_branch_name("main").is_ok());
/// assert!(validate_branch_name("feature/auth").is_ok());
/// assert!(validate_branch_name("").is_err());
/// assert!(validate_branch_name("bad..name").is_err());
/// ```
pub fn validate_branch_name(name: &str) -> Result<()> {
    let invalid = |reason: String| RefError::InvalidBranchName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("branch name must not be empty".into()));
    }
    if let Some(ch) = FORBIDDEN_CHARS.iter().find(|ch| name.contains(**ch)) {
        return Err(invalid(format!("contains forbidden character: {ch:?}")));
    }
    for pattern in ["..", "@{"] {
        if name.contains(pattern) {
            return Err(invalid(format!("must not contain '{pattern}'")));
        }
    }
    for edge in ['.', '/'] {
        if name.starts_with(edge) || name.ends_with(edge) {
            return Err(invalid(format!("must not start or end with '{edge}'")));
        }
    }
    if name.ends_with(".lock") {
        return Err(invalid("must not end with '.lock'".into()));
    }
    for component in name.split('/') {
        if component.is_empty() {
            return Err(invalid("path components must not be empty".into()));
        }
        if component.starts_with('.') {
            return Err(invalid(format!(
                "component must not start with '.': {component:?}"
            )));
        }
        Key::validate_segment(component).map_err(|e| invalid(e.to_string()))?;
    }
    Ok(())
}

/// Validate an org or app name: a single KV key segment without slashes.
pub fn validate_namespace(name: &str) -> Result<()> {
    if name.contains('/') {
        return Err(RefError::InvalidNamespace {
            name: name.to_string(),
            reason: "must not contain '/'".into(),
        });
    }
    Key::validate_segment(name).map_err(|e| RefError::InvalidNamespace {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Validate a remote name. Must be a simple identifier (no slashes).
pub fn validate_remote_name(name: &str) -> Result<()> {
    let invalid = |reason: String| RefError::InvalidRemoteName {
        name: name.to_string(),
        reason,
    };
    if name.is_empty() {
        return Err(invalid("remote name must not be empty".into()));
    }
    if name.contains('/') {
        return Err(invalid("remote name must not contain '/'".into()));
    }
    if let Some(ch) = FORBIDDEN_CHARS.iter().find(|ch| name.contains(**ch)) {
        return Err(invalid(format!("contains forbidden character: {ch:?}")));
    }
    Ok(())
}
