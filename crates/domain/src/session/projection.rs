//! Session state and the externally visible session shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::failure::SessionErrorKind;
use super::token::TokenRecord;
use crate::id::OrgId;

/// Lifecycle state of one session.
///
/// ```text
/// UNAUTHENTICATED -> VALID -> REFRESHING -> VALID
///                                        -> VALID_WITH_WARNING (transient, token still live)
///                                        -> ERRORED (invalid grant, or token already expired)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionState {
    /// No token has been issued for this session.
    Unauthenticated,
    /// The access token is usable and no failure is recorded.
    Valid,
    /// A refresh exchange is in flight.
    Refreshing,
    /// The last refresh failed, but the prior access token has not expired.
    ValidWithWarning,
    /// No usable access token.
    ///
    /// Only an `InvalidGrant` failure is terminal. After a `Transient` or
    /// `Unknown` failure on an expired token the refresh token is kept, and
    /// the next lookup retries the exchange.
    Errored,
}

impl SessionState {
    /// Derives the state of a session from its record at `now`.
    ///
    /// An expired access token is never usable; the projector refreshes
    /// such records before projecting them, so an expired record seen here
    /// is reported as `Errored`.
    #[must_use]
    pub fn derive(record: Option<&TokenRecord>, now: DateTime<Utc>) -> Self {
        let Some(record) = record else {
            return Self::Unauthenticated;
        };
        match record.error() {
            Some(kind) if kind.is_terminal() => Self::Errored,
            _ if record.is_expired_at(now) => Self::Errored,
            Some(_) => Self::ValidWithWarning,
            None => Self::Valid,
        }
    }

    /// Returns true if an access token may be presented in this state.
    #[must_use]
    pub const fn exposes_token(self) -> bool {
        matches!(self, Self::Valid | Self::ValidWithWarning)
    }

    /// Stable name used in logs and headers.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unauthenticated => "UNAUTHENTICATED",
            Self::Valid => "VALID",
            Self::Refreshing => "REFRESHING",
            Self::ValidWithWarning => "VALID_WITH_WARNING",
            Self::Errored => "ERRORED",
        }
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The session as seen by downstream callers.
///
/// This `{accessToken?, orgId?, error?}` shape is the only contract the
/// rest of the system depends on. Callers must check `error` before
/// trusting `access_token`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectedSession {
    /// Usable bearer credential, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    /// Tenant scoping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<OrgId>,
    /// Last refresh failure classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<SessionErrorKind>,
}

impl ProjectedSession {
    /// The projection of a session without credentials.
    #[must_use]
    pub fn unauthenticated() -> Self {
        Self::default()
    }

    /// Projects a record at `now`.
    #[must_use]
    pub fn project(record: Option<&TokenRecord>, now: DateTime<Utc>) -> Self {
        let Some(record) = record else {
            return Self::unauthenticated();
        };
        let state = SessionState::derive(Some(record), now);
        Self {
            access_token: state
                .exposes_token()
                .then(|| record.access_token().to_string()),
            org_id: record.org_id().cloned(),
            error: record.error(),
        }
    }

    /// Returns true if an access token is present.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Returns true if the token is present and no failure is recorded.
    #[must_use]
    pub const fn is_trusted(&self) -> bool {
        self.access_token.is_some() && self.error.is_none()
    }

    /// Returns the Authorization header value, if a token is present.
    #[must_use]
    pub fn authorization_header(&self) -> Option<String> {
        self.access_token
            .as_ref()
            .map(|token| format!("Bearer {token}"))
    }
}
