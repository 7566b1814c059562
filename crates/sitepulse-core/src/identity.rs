//! Validated caller identity.
//!
//! Every engine entry point requires a [`CallerIdentity`]. The engine does
//! no role-based checks beyond "present and well-formed"; membership and
//! permissions belong to the surrounding system.

use serde::Serialize;
use std::fmt;

use crate::error::HealthError;

/// Maximum identity length, in characters.
pub const MAX_IDENTITY_LEN: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct CallerIdentity(String);

impl CallerIdentity {
    /// Validate a resolved identity string.
    ///
    /// # Errors
    ///
    /// Returns [`HealthError::MissingIdentity`] for blank input and
    /// [`HealthError::InvalidIdentity`] for overlong input or input
    /// containing whitespace or control characters.
    pub fn parse(raw: &str) -> Result<Self, HealthError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(HealthError::MissingIdentity);
        }

        let reject = |reason| HealthError::InvalidIdentity {
            raw: raw.to_string(),
            reason,
        };
        if trimmed.chars().count() > MAX_IDENTITY_LEN {
            return Err(reject("identity exceeds 64 characters"));
        }
        if trimmed
            .chars()
            .any(|c| c.is_whitespace() || c.is_control())
        {
            return Err(reject("identity contains whitespace or control characters"));
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Validate an optional identity, treating `None` as missing.
    ///
    /// # Errors
    ///
    /// See [`CallerIdentity::parse`].
    pub fn require(raw: Option<&str>) -> Result<Self, HealthError> {
        raw.map_or(Err(HealthError::MissingIdentity), Self::parse)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_agent_style_names() {
        let id = CallerIdentity::parse(" site-ops/0/keen-engine ").expect("valid");
        assert_eq!(id.as_str(), "site-ops/0/keen-engine");
    }

    #[test]
    fn missing_and_blank_are_missing() {
        assert!(matches!(
            CallerIdentity::require(None),
            Err(HealthError::MissingIdentity)
        ));
        assert!(matches!(
            CallerIdentity::require(Some("  ")),
            Err(HealthError::MissingIdentity)
        ));
    }

    #[test]
    fn whitespace_inside_is_invalid() {
        assert!(matches!(
            CallerIdentity::parse("jane doe"),
            Err(HealthError::InvalidIdentity { .. })
        ));
    }

    #[test]
    fn overlong_is_invalid() {
        let raw = "a".repeat(MAX_IDENTITY_LEN + 1);
        assert!(matches!(
            CallerIdentity::parse(&raw),
            Err(HealthError::InvalidIdentity { .. })
        ));
    }
}
