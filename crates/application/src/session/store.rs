//! Per-session token record store.
//!
//! Each session owns one store. Readers get cloned snapshots; the record is
//! only replaced through a [`RecordGuard`], which holds the session's refresh
//! exclusion, so a refresh in progress is never observed half-written.
//!
//! A store is closed when its session ends or is replaced. Closing waits for
//! the refresh in flight; commits after that are discarded, so a late
//! exchange can never write its record back to storage.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, MutexGuard, RwLock};
use waybill_domain::{SessionId, TokenRecord};

use crate::ports::SessionStorage;

/// Returns the storage name a session's record is persisted under.
#[must_use]
pub fn storage_key(session_id: &SessionId) -> String {
    format!("session:{session_id}")
}

/// Immutable view of a store at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSnapshot {
    /// The current record, or `None` before the first issuance.
    pub record: Option<TokenRecord>,
    /// Incremented on every committed refresh outcome.
    pub generation: u64,
}

/// Token state of a single session.
pub struct TokenRecordStore {
    session_id: SessionId,
    current: RwLock<RecordSnapshot>,
    refresh_gate: Mutex<()>,
    refreshing: AtomicBool,
    closed: AtomicBool,
    storage: Option<Arc<dyn SessionStorage>>,
}

impl TokenRecordStore {
    /// Creates an empty (unauthenticated) store.
    #[must_use]
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            current: RwLock::new(RecordSnapshot {
                record: None,
                generation: 0,
            }),
            refresh_gate: Mutex::new(()),
            refreshing: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            storage: None,
        }
    }

    /// Creates a store holding an issued record.
    #[must_use]
    pub fn with_record(session_id: SessionId, record: TokenRecord) -> Self {
        let store = Self::new(session_id);
        Self {
            current: RwLock::new(RecordSnapshot {
                record: Some(record),
                generation: 0,
            }),
            ..store
        }
    }

    /// Persist every committed record through `storage`.
    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// The session this store belongs to.
    #[must_use]
    pub const fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Returns a copy of the current record and generation.
    pub async fn snapshot(&self) -> RecordSnapshot {
        self.current.read().await.clone()
    }

    /// Returns true while some task holds the refresh exclusion.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        self.refreshing.load(Ordering::Acquire)
    }

    /// Returns true once the store has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Ends the store's lifetime.
    ///
    /// Waits for a refresh in flight to commit, then rejects all later
    /// commits. The persisted entry is left to the caller.
    pub async fn close(&self) {
        let _gate = self.refresh_gate.lock().await;
        self.closed.store(true, Ordering::Release);
    }

    /// Acquires the session's refresh exclusion.
    ///
    /// Waits for any refresh already in flight to finish.
    pub async fn lock(&self) -> RecordGuard<'_> {
        let gate = self.refresh_gate.lock().await;
        self.refreshing.store(true, Ordering::Release);
        RecordGuard { store: self, _gate: gate }
    }

    async fn persist(&self, record: &TokenRecord) {
        let Some(storage) = &self.storage else {
            return;
        };
        let key = storage_key(&self.session_id);
        let result = if record.error().is_some_and(|kind| kind.is_terminal()) {
            storage.remove(&key).await.map(|_| ())
        } else {
            match serde_json::to_string(record) {
                Ok(json) => storage.set(&key, json).await,
                Err(e) => Err(e.into()),
            }
        };
        if let Err(e) = result {
            tracing::warn!(session_id = %self.session_id, error = %e, "failed to persist token record");
        }
    }
}

impl std::fmt::Debug for TokenRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRecordStore")
            .field("session_id", &self.session_id)
            .field("refreshing", &self.is_refreshing())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

/// Exclusive access to a store's record for the duration of a refresh.
pub struct RecordGuard<'a> {
    store: &'a TokenRecordStore,
    _gate: MutexGuard<'a, ()>,
}

impl RecordGuard<'_> {
    /// Returns a copy of the current record and generation.
    pub async fn snapshot(&self) -> RecordSnapshot {
        self.store.snapshot().await
    }

    /// Replaces the record, bumps the generation and persists the result.
    ///
    /// On a closed store nothing is written and the current snapshot is
    /// returned.
    pub async fn commit(self, record: TokenRecord) -> RecordSnapshot {
        if self.store.is_closed() {
            tracing::debug!(session_id = %self.store.session_id, "discarding commit to closed session");
            return self.store.snapshot().await;
        }
        let snapshot = {
            let mut current = self.store.current.write().await;
            current.record = Some(record);
            current.generation += 1;
            current.clone()
        };
        if let Some(record) = &snapshot.record {
            self.store.persist(record).await;
        }
        snapshot
    }
}

impl Drop for RecordGuard<'_> {
    fn drop(&mut self) {
        self.store.refreshing.store(false, Ordering::Release);
    }
}
