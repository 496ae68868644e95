//! Sessions keyed by id.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use waybill_domain::{ProjectedSession, SessionId, SessionState, TokenGrant, TokenRecord};

use super::projector::SessionProjector;
use super::store::{TokenRecordStore, storage_key};
use crate::error::ApplicationResult;
use crate::ports::{Clock, SessionStorage, TokenExchanger};

/// Owns one [`TokenRecordStore`] per session and routes lookups through
/// the shared [`SessionProjector`].
///
/// With storage configured, issued records are persisted under
/// `session:<id>` and sessions unknown in memory are hydrated on first
/// lookup.
pub struct SessionRegistry<X, C> {
    projector: SessionProjector<X, C>,
    storage: Option<Arc<dyn SessionStorage>>,
    sessions: RwLock<HashMap<SessionId, Arc<TokenRecordStore>>>,
}

impl<X, C> SessionRegistry<X, C>
where
    X: TokenExchanger + 'static,
    C: Clock + 'static,
{
    /// Creates an in-memory registry.
    #[must_use]
    pub fn new(projector: SessionProjector<X, C>) -> Self {
        Self {
            projector,
            storage: None,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Persist sessions through `storage`.
    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// The projector lookups go through.
    #[must_use]
    pub const fn projector(&self) -> &SessionProjector<X, C> {
        &self.projector
    }

    /// Records an initial token issuance.
    ///
    /// Generates a session id when none is given. Signing in to an existing
    /// session replaces its record, including any terminal error.
    ///
    /// # Errors
    ///
    /// Returns an error if the grant carries an empty access token or the
    /// record cannot be persisted.
    pub async fn sign_in(
        &self,
        session_id: Option<SessionId>,
        grant: TokenGrant,
    ) -> ApplicationResult<SessionId> {
        let session_id = session_id.unwrap_or_else(SessionId::generate);
        let record = TokenRecord::from_grant(grant, self.projector.now())?;

        // A refresh still running on the replaced store must not overwrite
        // the new record.
        let previous = self.sessions.read().await.get(&session_id).cloned();
        if let Some(previous) = previous {
            previous.close().await;
        }

        if let Some(storage) = &self.storage {
            let json = serde_json::to_string(&record).map_err(crate::ports::StorageError::from)?;
            storage.set(&storage_key(&session_id), json).await?;
        }

        tracing::info!(
            session_id = %session_id,
            token_preview = %super::token_preview(record.access_token()),
            expires_in = record.seconds_until_expiry(self.projector.now()),
            "session signed in"
        );

        let store = Arc::new(self.new_store(session_id.clone(), Some(record)));
        self.sessions.write().await.insert(session_id.clone(), store);
        Ok(session_id)
    }

    /// Returns the projected session, refreshing first if needed.
    ///
    /// Unknown sessions project as unauthenticated.
    pub async fn get_session(&self, session_id: &SessionId) -> ProjectedSession {
        self.lookup(session_id, None).await.0
    }

    /// Like [`Self::get_session`], waiting at most `deadline` for a refresh.
    pub async fn get_session_within(
        &self,
        session_id: &SessionId,
        deadline: Duration,
    ) -> ProjectedSession {
        self.lookup(session_id, Some(deadline)).await.0
    }

    /// Returns the projected session and the state it was derived from.
    ///
    /// `deadline` overrides the policy's await deadline when set.
    pub async fn lookup(
        &self,
        session_id: &SessionId,
        deadline: Option<Duration>,
    ) -> (ProjectedSession, SessionState) {
        let Some(store) = self.store(session_id).await else {
            return (
                ProjectedSession::unauthenticated(),
                SessionState::Unauthenticated,
            );
        };
        let deadline = deadline.or(self.projector.policy().await_deadline);
        self.projector.project(&store, deadline).await
    }

    /// Current state without triggering a refresh.
    pub async fn state(&self, session_id: &SessionId) -> SessionState {
        let Some(store) = self.store(session_id).await else {
            return SessionState::Unauthenticated;
        };
        if store.is_refreshing() {
            return SessionState::Refreshing;
        }
        let snapshot = store.snapshot().await;
        SessionState::derive(snapshot.record.as_ref(), self.projector.now())
    }

    /// Forgets a session and its persisted record.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted record cannot be removed.
    pub async fn sign_out(&self, session_id: &SessionId) -> ApplicationResult<bool> {
        // Close first: the store stays in the map, so lookups meanwhile
        // neither refresh nor hydrate the entry about to be removed.
        let store = self.sessions.read().await.get(session_id).cloned();
        if let Some(store) = &store {
            store.close().await;
        }

        let persisted = match &self.storage {
            Some(storage) => storage.remove(&storage_key(session_id)).await?,
            None => false,
        };

        let in_memory = match store {
            Some(closed) => {
                let mut sessions = self.sessions.write().await;
                // A concurrent sign-in may already hold the id again.
                if sessions
                    .get(session_id)
                    .is_some_and(|current| Arc::ptr_eq(current, &closed))
                {
                    sessions.remove(session_id);
                }
                true
            }
            None => false,
        };
        let removed = in_memory || persisted;
        if removed {
            tracing::info!(session_id = %session_id, "session signed out");
        }
        Ok(removed)
    }

    /// Number of sessions held in memory.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Returns true if no sessions are held in memory.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    fn new_store(&self, session_id: SessionId, record: Option<TokenRecord>) -> TokenRecordStore {
        let store = match record {
            Some(record) => TokenRecordStore::with_record(session_id, record),
            None => TokenRecordStore::new(session_id),
        };
        match &self.storage {
            Some(storage) => store.with_storage(Arc::clone(storage)),
            None => store,
        }
    }

    async fn store(&self, session_id: &SessionId) -> Option<Arc<TokenRecordStore>> {
        if let Some(store) = self.sessions.read().await.get(session_id) {
            return Some(Arc::clone(store));
        }

        let record = self.hydrate(session_id).await?;
        let mut sessions = self.sessions.write().await;
        // Another lookup may have hydrated it meanwhile.
        let store = sessions
            .entry(session_id.clone())
            .or_insert_with(|| Arc::new(self.new_store(session_id.clone(), Some(record))));
        Some(Arc::clone(store))
    }

    async fn hydrate(&self, session_id: &SessionId) -> Option<TokenRecord> {
        let storage = self.storage.as_ref()?;
        let raw = match storage.get(&storage_key(session_id)).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "failed to read persisted session");
                return None;
            }
        };
        match serde_json::from_str::<TokenRecord>(&raw) {
            Ok(record) => {
                tracing::debug!(session_id = %session_id, "hydrated session from storage");
                Some(record)
            }
            Err(e) => {
                tracing::warn!(session_id = %session_id, error = %e, "discarding unreadable persisted session");
                None
            }
        }
    }
}

impl<X, C> std::fmt::Debug for SessionRegistry<X, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("persistent", &self.storage.is_some())
            .finish_non_exhaustive()
    }
}
