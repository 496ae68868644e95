//! Test doubles for the session ports.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use waybill_domain::{RefreshFailure, TokenGrant};

use crate::ports::{Clock, SessionStorage, StorageError, TokenExchanger};

/// Instant `secs` seconds after the Unix epoch.
pub fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn at(secs: i64) -> Self {
        Self {
            now: Arc::new(Mutex::new(at(secs))),
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[derive(Debug, Default)]
struct Script {
    responses: VecDeque<Result<TokenGrant, RefreshFailure>>,
    presented: Vec<String>,
}

/// Exchanger that replays queued outcomes; the last one repeats.
#[derive(Debug, Clone)]
pub struct ScriptedExchanger {
    script: Arc<Mutex<Script>>,
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl ScriptedExchanger {
    fn with_first(response: Result<TokenGrant, RefreshFailure>) -> Self {
        Self {
            script: Arc::new(Mutex::new(Script {
                responses: VecDeque::from([response]),
                presented: Vec::new(),
            })),
            calls: Arc::new(AtomicUsize::new(0)),
            delay: None,
        }
    }

    pub fn succeeding(grant: TokenGrant) -> Self {
        Self::with_first(Ok(grant))
    }

    pub fn failing(failure: RefreshFailure) -> Self {
        Self::with_first(Err(failure))
    }

    /// Queue another outcome after the ones already scripted.
    pub fn then(self, response: Result<TokenGrant, RefreshFailure>) -> Self {
        self.script.lock().unwrap().responses.push_back(response);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn presented(&self) -> Vec<String> {
        self.script.lock().unwrap().presented.clone()
    }
}

#[async_trait]
impl TokenExchanger for ScriptedExchanger {
    async fn exchange_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenGrant, RefreshFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = {
            let mut script = self.script.lock().unwrap();
            script.presented.push(refresh_token.to_string());
            if script.responses.len() > 1 {
                script.responses.pop_front().unwrap()
            } else {
                script.responses.front().cloned().unwrap()
            }
        };
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        response
    }
}

#[derive(Debug)]
struct Rotation {
    current: String,
    issued: usize,
}

/// Provider that rotates the refresh token on every exchange and rejects
/// any token it has already consumed.
#[derive(Debug, Clone)]
pub struct RotatingProvider {
    rotation: Arc<Mutex<Rotation>>,
    rejections: Arc<AtomicUsize>,
    delay: Duration,
}

impl RotatingProvider {
    pub fn new(initial: &str, delay: Duration) -> Self {
        Self {
            rotation: Arc::new(Mutex::new(Rotation {
                current: initial.to_string(),
                issued: 0,
            })),
            rejections: Arc::new(AtomicUsize::new(0)),
            delay,
        }
    }

    pub fn exchanges(&self) -> usize {
        self.rotation.lock().unwrap().issued
    }

    pub fn rejections(&self) -> usize {
        self.rejections.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenExchanger for RotatingProvider {
    async fn exchange_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenGrant, RefreshFailure> {
        tokio::time::sleep(self.delay).await;
        let mut rotation = self.rotation.lock().unwrap();
        if rotation.current != refresh_token {
            self.rejections.fetch_add(1, Ordering::SeqCst);
            return Err(RefreshFailure::invalid_grant("refresh token reused"));
        }
        rotation.issued += 1;
        let next = format!("refresh-{}", rotation.issued + 1);
        rotation.current.clone_from(&next);
        Ok(TokenGrant::new(format!("access-{}", rotation.issued), 3600).with_refresh_token(next))
    }
}

/// In-memory storage double with switchable failure.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    values: Arc<Mutex<HashMap<String, String>>>,
    failing: Arc<AtomicBool>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(self) -> Self {
        self.failing.store(true, Ordering::SeqCst);
        self
    }

    pub fn value(&self, name: &str) -> Option<String> {
        self.values.lock().unwrap().get(name).cloned()
    }

    pub fn insert(&self, name: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
    }

    fn check(&self) -> Result<(), StorageError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(StorageError::Backend("storage unavailable".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn get(&self, name: &str) -> Result<Option<String>, StorageError> {
        self.check()?;
        Ok(self.value(name))
    }

    async fn set(&self, name: &str, value: String) -> Result<(), StorageError> {
        self.check()?;
        self.values.lock().unwrap().insert(name.to_string(), value);
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<bool, StorageError> {
        self.check()?;
        Ok(self.values.lock().unwrap().remove(name).is_some())
    }
}
