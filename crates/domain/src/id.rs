//! Identifier types and ID generation.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};

/// Generates a new UUID v7 as a string.
///
/// UUID v7 includes timestamp information and is sortable.
#[must_use]
pub fn generate_id() -> String {
    Uuid::now_v7().to_string()
}

fn validate(kind: &str, value: String) -> DomainResult<String> {
    if value.is_empty() || value.trim() != value {
        return Err(DomainError::InvalidIdentifier(format!(
            "{kind} must be non-empty without surrounding whitespace: {value:?}"
        )));
    }
    Ok(value)
}

/// Identifier of one user session.
///
/// Every session owns an independent token record store keyed by this id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SessionId(String);

impl SessionId {
    /// Creates a session id from an opaque string.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidIdentifier`] if the value is empty or
    /// carries leading/trailing whitespace.
    pub fn new(value: impl Into<String>) -> DomainResult<Self> {
        validate("session id", value.into()).map(Self)
    }

    /// Generates a fresh, sortable session id.
    #[must_use]
    pub fn generate() -> Self {
        Self(generate_id())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for SessionId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SessionId> for String {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

/// Tenant (organisation) scoping carried alongside an access token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrgId(String);

impl OrgId {
    /// Creates an organisation id.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidIdentifier`] if the value is empty or
    /// carries leading/trailing whitespace.
    pub fn new(value: impl Into<String>) -> DomainResult<Self> {
        validate("org id", value.into()).map(Self)
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OrgId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OrgId> for String {
    fn from(id: OrgId) -> Self {
        id.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_format() {
        let id = generate_id();
        // 8-4-4-4-12 = 36 chars
        assert_eq!(id.len(), 36);
        assert!(Uuid::parse_str(&id).is_ok());
    }

    #[test]
    fn test_generated_session_ids_are_unique() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn test_session_id_rejects_blank_values() {
        assert!(SessionId::new("").is_err());
        assert!(SessionId::new("  sess-1 ").is_err());
        assert_eq!(SessionId::new("sess-1").unwrap().as_str(), "sess-1");
    }

    #[test]
    fn test_org_id_serde_is_transparent() {
        let org = OrgId::new("org-42").unwrap();
        let json = serde_json::to_string(&org).unwrap();
        assert_eq!(json, "\"org-42\"");
        let parsed: OrgId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, org);
    }

    #[test]
    fn test_session_id_deserialization_validates() {
        let result: Result<SessionId, _> = serde_json::from_str("\"\"");
        assert!(result.is_err());
    }
}
