use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::HealthError;

/// Maximum accepted project identifier length, in bytes.
pub const MAX_PROJECT_ID_LEN: usize = 128;

/// Validated project identifier.
///
/// Construct through [`ProjectId::parse`]; every engine entry point
/// validates the raw id before touching a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectId(String);

impl ProjectId {
    /// Parse and validate a raw project identifier.
    ///
    /// Surrounding whitespace is trimmed. The remainder must be 1-128 bytes
    /// of ASCII alphanumerics or `-`, `_`, `.`, `:`.
    ///
    /// # Errors
    ///
    /// Returns [`HealthError::InvalidProjectId`] when the id is empty, too
    /// long, or contains a disallowed character.
    pub fn parse(raw: &str) -> Result<Self, HealthError> {
        let trimmed = raw.trim();
        let reject = |reason| HealthError::InvalidProjectId {
            raw: raw.to_string(),
            reason,
        };

        if trimmed.is_empty() {
            return Err(reject("project id is empty"));
        }
        if trimmed.len() > MAX_PROJECT_ID_LEN {
            return Err(reject("project id exceeds 128 bytes"));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'))
        {
            return Err(reject("project id contains a disallowed character"));
        }

        Ok(Self(trimmed.to_string()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ProjectId {
    type Err = HealthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ProjectId {
    type Error = HealthError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ProjectId> for String {
    fn from(value: ProjectId) -> Self {
        value.0
    }
}

impl AsRef<str> for ProjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
