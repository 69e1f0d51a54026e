//! Event key normalization.
//!
//! # Format
//! ```text
//! "*"               global wildcard (subscription only)
//! "NAMESPACE:NAME"  exact key
//! "NAMESPACE:*"     every event in a namespace
//! "*:NAME"          one event name across namespaces
//! ```
//!
//! # Design Decisions
//! - Keys are trimmed, spaces become `_`, anything outside
//!   `[A-Za-z0-9_:*]` is dropped, the result is upper-cased
//! - A key other than `*` must have exactly one colon and two
//!   non-empty parts, checked before anything is stored

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// The global wildcard.
pub const GLOBAL: &str = "*";

/// Errors raised while parsing an event key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// The key is not of the form `NAMESPACE:NAME`.
    #[error("event key must be properly namespaced, e.g. 'CUSTOM_NS:CLEAR' or 'CONNECTION:NEW', got '{0}'")]
    MalformedKey(String),
}

/// A normalized event key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    normalized: String,
}

impl EventKey {
    /// Parse and normalize a raw key.
    pub fn parse(raw: &str) -> Result<Self, EventError> {
        let trimmed = raw.trim();
        if trimmed == GLOBAL {
            return Ok(Self::global());
        }
        if trimmed.split(':').count() != 2 {
            return Err(EventError::MalformedKey(trimmed.to_string()));
        }

        let normalized: String = trimmed
            .chars()
            .map(|c| if c == ' ' { '_' } else { c })
            .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | ':' | '*'))
            .collect::<String>()
            .to_uppercase();

        match normalized.split_once(':') {
            Some((ns, name)) if !ns.is_empty() && !name.is_empty() => Ok(Self { normalized }),
            _ => Err(EventError::MalformedKey(trimmed.to_string())),
        }
    }

    /// The global wildcard key.
    pub fn global() -> Self {
        Self {
            normalized: GLOBAL.to_string(),
        }
    }

    pub fn is_global(&self) -> bool {
        self.normalized == GLOBAL
    }

    /// True if either part is a wildcard.
    pub fn is_wildcard(&self) -> bool {
        self.normalized.contains('*')
    }

    /// Namespace part; `*` for the global key.
    pub fn namespace(&self) -> &str {
        self.normalized
            .split_once(':')
            .map(|(ns, _)| ns)
            .unwrap_or(GLOBAL)
    }

    /// Name part; `*` for the global key.
    pub fn name(&self) -> &str {
        self.normalized
            .split_once(':')
            .map(|(_, name)| name)
            .unwrap_or(GLOBAL)
    }

    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// The `NAMESPACE:*` key covering this one.
    pub(crate) fn namespace_wildcard(&self) -> String {
        format!("{}:*", self.namespace())
    }

    /// The `*:NAME` key covering this one.
    pub(crate) fn name_wildcard(&self) -> String {
        format!("*:{}", self.name())
    }
}

impl FromStr for EventKey {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizes_key() {
        let key = EventKey::parse("  custom ns:clear-all! ").unwrap();
        assert_eq!(key.as_str(), "CUSTOM_NS:CLEARALL");
        assert_eq!(key.namespace(), "CUSTOM_NS");
        assert_eq!(key.name(), "CLEARALL");
    }

    #[test]
    fn test_global_key() {
        let key = EventKey::parse(" * ").unwrap();
        assert!(key.is_global());
        assert_eq!(key.namespace(), "*");
    }

    #[test]
    fn test_rejects_unnamespaced_keys() {
        assert_eq!(
            EventKey::parse("bad_key_no_colon"),
            Err(EventError::MalformedKey("bad_key_no_colon".into()))
        );
        assert!(EventKey::parse("A:B:C").is_err());
        assert!(EventKey::parse("!!:NAME").is_err());
    }

    #[test]
    fn test_wildcard_parts() {
        let ns = EventKey::parse("request:*").unwrap();
        assert!(ns.is_wildcard());
        assert_eq!(ns.as_str(), "REQUEST:*");

        let exact = EventKey::parse("REQUEST:ERRORED").unwrap();
        assert!(!exact.is_wildcard());
        assert_eq!(exact.namespace_wildcard(), "REQUEST:*");
        assert_eq!(exact.name_wildcard(), "*:ERRORED");
    }
}
