//! Token record: the unit of truth for one session's credential.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::failure::SessionErrorKind;
use crate::error::{DomainError, DomainResult};
use crate::id::OrgId;

/// Lifetime assumed when a provider omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: u64 = 3600;

/// Tokens issued by the identity provider, before they are anchored in time.
///
/// `expires_in` is relative to the moment the grant was received; a
/// [`TokenRecord`] converts it into an absolute instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
    /// The new bearer credential.
    pub access_token: String,
    /// A rotated refresh token, if the provider issued one.
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires.
    pub expires_in: u64,
    /// Tenant scoping, if the provider reports it.
    pub org_id: Option<OrgId>,
}

impl TokenGrant {
    /// Creates a grant with only the access token and its lifetime.
    #[must_use]
    pub fn new(access_token: impl Into<String>, expires_in: u64) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            expires_in,
            org_id: None,
        }
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Sets the organisation scope.
    #[must_use]
    pub fn with_org_id(mut self, org_id: OrgId) -> Self {
        self.org_id = Some(org_id);
        self
    }
}

/// Current credential of one session.
///
/// The access token and its absolute expiry only ever change together:
/// there is no way to build or mutate a record that has one without the
/// other. A session without any record is unauthenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTokenRecord", into = "RawTokenRecord")]
pub struct TokenRecord {
    access_token: String,
    refresh_token: Option<String>,
    org_id: Option<OrgId>,
    access_token_expires: DateTime<Utc>,
    error: Option<SessionErrorKind>,
}

impl TokenRecord {
    /// Creates a record from an access token and its absolute expiry.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidTokenRecord`] if the access token is empty.
    pub fn new(
        access_token: impl Into<String>,
        access_token_expires: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return Err(DomainError::InvalidTokenRecord(
                "access token must not be empty".to_string(),
            ));
        }
        Ok(Self {
            access_token,
            refresh_token: None,
            org_id: None,
            access_token_expires,
            error: None,
        })
    }

    /// Creates the first record of a session from an initial token exchange.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidTokenRecord`] if the granted access token is empty.
    pub fn from_grant(grant: TokenGrant, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut record = Self::new(grant.access_token, expiry_after(now, grant.expires_in))?;
        record.refresh_token = grant.refresh_token.filter(|t| !t.is_empty());
        record.org_id = grant.org_id;
        Ok(record)
    }

    /// Builds the successor of this record after a successful refresh.
    ///
    /// The refresh token is replaced only if the provider rotated it, and
    /// the organisation scope is carried over unless the provider reissued
    /// one. The error classification is cleared.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::InvalidTokenRecord`] if the granted access token is empty.
    pub fn renewed(&self, grant: TokenGrant, now: DateTime<Utc>) -> DomainResult<Self> {
        let mut record = Self::new(grant.access_token, expiry_after(now, grant.expires_in))?;
        record.refresh_token = grant
            .refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| self.refresh_token.clone());
        record.org_id = grant.org_id.or_else(|| self.org_id.clone());
        Ok(record)
    }

    /// Sets the refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Sets the organisation scope.
    #[must_use]
    pub fn with_org_id(mut self, org_id: OrgId) -> Self {
        self.org_id = Some(org_id);
        self
    }

    /// Records a refresh failure.
    ///
    /// An [`SessionErrorKind::InvalidGrant`] also drops the refresh token:
    /// the provider rejected it, so it must never be presented again.
    #[must_use]
    pub fn with_error(mut self, kind: SessionErrorKind) -> Self {
        if kind == SessionErrorKind::InvalidGrant {
            self.refresh_token = None;
        }
        self.error = Some(kind);
        self
    }

    /// The bearer credential.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// The refresh token, if one was issued and not invalidated.
    #[must_use]
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Tenant scoping carried with the token.
    #[must_use]
    pub const fn org_id(&self) -> Option<&OrgId> {
        self.org_id.as_ref()
    }

    /// Absolute expiry of the access token.
    #[must_use]
    pub const fn access_token_expires(&self) -> DateTime<Utc> {
        self.access_token_expires
    }

    /// Classification of the last refresh failure, if any.
    #[must_use]
    pub const fn error(&self) -> Option<SessionErrorKind> {
        self.error
    }

    /// Check if the token can be refreshed.
    #[must_use]
    pub const fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    /// Returns true once `now` has reached the expiry instant.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.access_token_expires
    }

    /// Whole seconds until expiry (negative once expired).
    #[must_use]
    pub fn seconds_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.access_token_expires - now).num_seconds()
    }
}

/// Anchors a relative lifetime at `now`, saturating instead of overflowing.
fn expiry_after(now: DateTime<Utc>, expires_in: u64) -> DateTime<Utc> {
    let lifetime = i64::try_from(expires_in)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX);
    now.checked_add_signed(lifetime)
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Wire form of [`TokenRecord`], validated on the way in.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTokenRecord {
    access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    org_id: Option<OrgId>,
    access_token_expires: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<SessionErrorKind>,
}

impl TryFrom<RawTokenRecord> for TokenRecord {
    type Error = DomainError;

    fn try_from(raw: RawTokenRecord) -> Result<Self, Self::Error> {
        let mut record = Self::new(raw.access_token, raw.access_token_expires)?;
        record.refresh_token = raw.refresh_token;
        record.org_id = raw.org_id;
        record.error = raw.error;
        Ok(record)
    }
}

impl From<TokenRecord> for RawTokenRecord {
    fn from(record: TokenRecord) -> Self {
        Self {
            access_token: record.access_token,
            refresh_token: record.refresh_token,
            org_id: record.org_id,
            access_token_expires: record.access_token_expires,
            error: record.error,
        }
    }
}
