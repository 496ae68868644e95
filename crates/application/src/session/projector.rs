//! Session projection with coalesced refresh.
//!
//! `get_session` evaluates the current record, refreshes it if needed and
//! returns the externally visible session. Concurrent lookups of one
//! session share a single refresh exchange: each caller remembers the
//! store generation it observed, and a caller that wins the session's
//! exclusion after the generation moved adopts the committed outcome
//! instead of exchanging again.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use waybill_domain::{
    ExpiryStatus, ProjectedSession, SessionErrorKind, SessionState, TokenRecord, evaluate,
};

use super::executor::RefreshExecutor;
use super::store::TokenRecordStore;
use crate::ports::{Clock, TokenExchanger};

/// Default lookahead window before expiry.
pub const DEFAULT_SKEW_SECONDS: i64 = 30;

/// When and how the projector refreshes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// Lookahead window; tokens expiring within it are refreshed.
    pub skew: TimeDelta,
    /// Longest a caller waits for an in-flight refresh.
    pub await_deadline: Option<Duration>,
    /// Refresh `EXPIRING_SOON` tokens off the request path.
    pub background: bool,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            skew: TimeDelta::seconds(DEFAULT_SKEW_SECONDS),
            await_deadline: None,
            background: false,
        }
    }
}

/// Merges a store's record and refresh outcomes into the projected session.
pub struct SessionProjector<X, C> {
    executor: Arc<RefreshExecutor<X, C>>,
    policy: RefreshPolicy,
}

impl<X, C> Clone for SessionProjector<X, C> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            policy: self.policy,
        }
    }
}

impl<X, C> SessionProjector<X, C>
where
    X: TokenExchanger + 'static,
    C: Clock + 'static,
{
    /// Creates a projector with the default policy.
    #[must_use]
    pub fn new(executor: RefreshExecutor<X, C>) -> Self {
        Self {
            executor: Arc::new(executor),
            policy: RefreshPolicy::default(),
        }
    }

    /// Replace the refresh policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The active refresh policy.
    #[must_use]
    pub const fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    /// Current time according to the executor's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.executor.clock().now()
    }

    /// Returns the session, refreshing the token first if needed.
    pub async fn get_session(&self, store: &Arc<TokenRecordStore>) -> ProjectedSession {
        self.project(store, self.policy.await_deadline).await.0
    }

    /// Like [`Self::get_session`], but waits at most `deadline` for a refresh.
    ///
    /// On deadline the last known record is projected with a `Transient`
    /// error; the refresh itself keeps running and commits when done.
    pub async fn get_session_within(
        &self,
        store: &Arc<TokenRecordStore>,
        deadline: Duration,
    ) -> ProjectedSession {
        self.project(store, Some(deadline)).await.0
    }

    /// Returns the session together with the state it was projected from.
    pub async fn project(
        &self,
        store: &Arc<TokenRecordStore>,
        deadline: Option<Duration>,
    ) -> (ProjectedSession, SessionState) {
        let record = self.resolve(store, deadline).await;
        let now = self.now();
        (
            ProjectedSession::project(record.as_ref(), now),
            SessionState::derive(record.as_ref(), now),
        )
    }

    /// Determines the record to project, refreshing when required.
    async fn resolve(
        &self,
        store: &Arc<TokenRecordStore>,
        deadline: Option<Duration>,
    ) -> Option<TokenRecord> {
        let snapshot = store.snapshot().await;
        let record = snapshot.record?;
        if record.error().is_some_and(SessionErrorKind::is_terminal) {
            return Some(record);
        }

        let status = evaluate(&record, self.now(), self.policy.skew);
        match status {
            ExpiryStatus::Valid => return Some(record),
            ExpiryStatus::ExpiringSoon if self.policy.background => {
                if !store.is_refreshing() {
                    tracing::debug!(
                        session_id = %store.session_id(),
                        "scheduling background token refresh"
                    );
                    drop(self.spawn_refresh(store, snapshot.generation));
                }
                return Some(record);
            }
            _ => {}
        }

        tracing::debug!(
            session_id = %store.session_id(),
            ?status,
            "access token needs refresh"
        );

        // The exchange runs in its own task so a caller that gives up (or is
        // cancelled) never aborts a refresh other callers are waiting on.
        let task = self.spawn_refresh(store, snapshot.generation);
        let joined = match deadline {
            Some(deadline) => match tokio::time::timeout(deadline, task).await {
                Ok(joined) => joined,
                Err(_) => {
                    tracing::debug!(
                        session_id = %store.session_id(),
                        deadline_ms = deadline.as_millis(),
                        "refresh still in flight at caller deadline"
                    );
                    return Self::stale(store).await;
                }
            },
            None => task.await,
        };

        match joined {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!(
                    session_id = %store.session_id(),
                    error = %e,
                    "refresh task failed"
                );
                Self::stale(store).await
            }
        }
    }

    fn spawn_refresh(
        &self,
        store: &Arc<TokenRecordStore>,
        observed_generation: u64,
    ) -> tokio::task::JoinHandle<Option<TokenRecord>> {
        let projector = self.clone();
        let store = Arc::clone(store);
        tokio::spawn(async move { projector.refresh_once(&store, observed_generation).await })
    }

    /// Runs at most one exchange for the generation the caller observed.
    async fn refresh_once(
        &self,
        store: &TokenRecordStore,
        observed_generation: u64,
    ) -> Option<TokenRecord> {
        let guard = store.lock().await;
        let current = guard.snapshot().await;
        if store.is_closed() {
            return current.record;
        }
        if current.generation != observed_generation {
            tracing::debug!(
                session_id = %store.session_id(),
                "joined completed refresh"
            );
            return current.record;
        }
        let record = current.record?;
        // Nothing to exchange and nothing new to record.
        if !record.can_refresh() && record.error() == Some(SessionErrorKind::NoRefreshToken) {
            return Some(record);
        }

        let next = match self.executor.refresh(&record).await {
            Ok(renewed) => {
                tracing::info!(
                    session_id = %store.session_id(),
                    token_preview = %super::token_preview(renewed.access_token()),
                    expires_in = renewed.seconds_until_expiry(self.now()),
                    "access token refreshed"
                );
                renewed
            }
            Err(failure) => {
                let kind = failure.kind();
                if kind.is_terminal() {
                    tracing::info!(
                        session_id = %store.session_id(),
                        error = %failure,
                        "refresh token rejected, session requires sign-in"
                    );
                } else {
                    tracing::warn!(
                        session_id = %store.session_id(),
                        error = %failure,
                        retryable = failure.is_retryable(),
                        "token refresh failed"
                    );
                }
                record.with_error(kind)
            }
        };

        guard.commit(next).await.record
    }

    /// The last known record, flagged as possibly stale.
    async fn stale(store: &TokenRecordStore) -> Option<TokenRecord> {
        let record = store.snapshot().await.record?;
        if record.error().is_some() {
            Some(record)
        } else {
            Some(record.with_error(SessionErrorKind::Transient))
        }
    }
}
