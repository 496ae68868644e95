//! HTTP routes.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use waybill_application::ports::{Clock, TokenExchanger};
use waybill_application::{ApplicationError, SessionRegistry};
use waybill_domain::{DomainError, OrgId, SessionId, TokenGrant};

/// Response header carrying the session state name.
pub const SESSION_STATE_HEADER: &str = "x-session-state";

/// Body of `POST /sessions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    /// Reuse this session id instead of generating one.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Initial access token.
    pub access_token: String,
    /// Initial refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Tenant scope.
    #[serde(default)]
    pub org_id: Option<String>,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Body of a successful `POST /sessions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInResponse {
    /// The session the token was recorded under.
    pub session_id: SessionId,
}

#[derive(Debug, Default, Deserialize)]
struct LookupParams {
    /// Longest to wait for an in-flight refresh.
    deadline_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(ErrorBody { error: self.1 })).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        Self(StatusCode::BAD_REQUEST, error.to_string())
    }
}

impl From<ApplicationError> for ApiError {
    fn from(error: ApplicationError) -> Self {
        let status = match &error {
            ApplicationError::Domain(_) => StatusCode::BAD_REQUEST,
            ApplicationError::NotFound(_) => StatusCode::NOT_FOUND,
            ApplicationError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApplicationError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            ApplicationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            tracing::warn!(error = %error, "session request failed");
        }
        Self(status, error.to_string())
    }
}

/// Builds the gateway router over `registry`.
pub fn router<X, C>(registry: Arc<SessionRegistry<X, C>>) -> Router
where
    X: TokenExchanger + 'static,
    C: Clock + 'static,
{
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/sessions", post(sign_in::<X, C>))
        .route(
            "/sessions/{id}",
            get(get_session::<X, C>).delete(sign_out::<X, C>),
        )
        .with_state(registry)
}

async fn sign_in<X, C>(
    State(registry): State<Arc<SessionRegistry<X, C>>>,
    Json(request): Json<SignInRequest>,
) -> Result<(StatusCode, Json<SignInResponse>), ApiError>
where
    X: TokenExchanger + 'static,
    C: Clock + 'static,
{
    let session_id = request.session_id.map(SessionId::new).transpose()?;
    let mut grant = TokenGrant::new(request.access_token, request.expires_in);
    if let Some(refresh_token) = request.refresh_token {
        grant = grant.with_refresh_token(refresh_token);
    }
    if let Some(org_id) = request.org_id {
        grant = grant.with_org_id(OrgId::new(org_id)?);
    }

    let session_id = registry.sign_in(session_id, grant).await?;
    Ok((StatusCode::CREATED, Json(SignInResponse { session_id })))
}

async fn get_session<X, C>(
    State(registry): State<Arc<SessionRegistry<X, C>>>,
    Path(id): Path<String>,
    Query(params): Query<LookupParams>,
) -> Result<Response, ApiError>
where
    X: TokenExchanger + 'static,
    C: Clock + 'static,
{
    let session_id = SessionId::new(id)?;
    let deadline = params.deadline_ms.map(Duration::from_millis);
    let (session, state) = registry.lookup(&session_id, deadline).await;

    tracing::debug!(session_id = %session_id, status = %state, "session looked up");

    Ok((
        [(
            HeaderName::from_static(SESSION_STATE_HEADER),
            HeaderValue::from_static(state.as_str()),
        )],
        Json(session),
    )
        .into_response())
}

async fn sign_out<X, C>(
    State(registry): State<Arc<SessionRegistry<X, C>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
    X: TokenExchanger + 'static,
    C: Clock + 'static,
{
    let session_id = SessionId::new(id)?;
    if registry.sign_out(&session_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Ok(StatusCode::NOT_FOUND)
    }
}
