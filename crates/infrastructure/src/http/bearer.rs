//! Attaching a projected session to outgoing requests.

use thiserror::Error;
use waybill_domain::{ProjectedSession, SessionErrorKind};

/// Why a session cannot authenticate a downstream request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DownstreamAuthError {
    /// No credential was ever issued for the session.
    #[error("session is not authenticated")]
    Unauthenticated,

    /// The session has no usable credential.
    #[error("session has no usable access token: {0}")]
    SessionError(SessionErrorKind),
}

/// Adds `Authorization: Bearer <token>` from a projected session.
pub trait BearerAuth: Sized {
    /// Attaches the session's access token.
    ///
    /// A token projected together with a non-terminal error is still
    /// attached; the warning is logged.
    ///
    /// # Errors
    ///
    /// Returns [`DownstreamAuthError`] if the session carries no token.
    fn session_bearer(self, session: &ProjectedSession) -> Result<Self, DownstreamAuthError>;
}

impl BearerAuth for reqwest::RequestBuilder {
    fn session_bearer(self, session: &ProjectedSession) -> Result<Self, DownstreamAuthError> {
        match (&session.access_token, session.error) {
            (Some(token), None) => Ok(self.bearer_auth(token)),
            (Some(token), Some(kind)) => {
                tracing::warn!(error = %kind, "attaching access token from a session with a refresh warning");
                Ok(self.bearer_auth(token))
            }
            (None, Some(kind)) => Err(DownstreamAuthError::SessionError(kind)),
            (None, None) => Err(DownstreamAuthError::Unauthenticated),
        }
    }
}
