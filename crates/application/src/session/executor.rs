//! Refresh exchange against the identity provider.

use std::time::Duration;

use waybill_domain::{RefreshFailure, TokenRecord};

use crate::ports::{Clock, TokenExchanger};

/// Upper bound on a single exchange call.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

/// Performs one refresh exchange per call and builds the successor record.
///
/// The executor never touches a store; committing the outcome is the
/// projector's job.
#[derive(Debug)]
pub struct RefreshExecutor<X, C> {
    exchanger: X,
    clock: C,
    timeout: Duration,
}

impl<X: TokenExchanger, C: Clock> RefreshExecutor<X, C> {
    /// Creates an executor with the default exchange timeout.
    pub const fn new(exchanger: X, clock: C) -> Self {
        Self {
            exchanger,
            clock,
            timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }

    /// Set the bound on one exchange call.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The exchange timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The time source used to anchor new expiries.
    pub const fn clock(&self) -> &C {
        &self.clock
    }

    /// Exchanges the record's refresh token for a new record.
    ///
    /// A timed-out exchange is classified as [`RefreshFailure::Transient`].
    ///
    /// # Errors
    ///
    /// - [`RefreshFailure::NoRefreshToken`] if the record has no refresh
    ///   token; no exchange is attempted.
    /// - Whatever classification the exchanger reports.
    /// - [`RefreshFailure::Unknown`] if the provider granted an empty token.
    pub async fn refresh(&self, record: &TokenRecord) -> Result<TokenRecord, RefreshFailure> {
        let refresh_token = record
            .refresh_token()
            .ok_or(RefreshFailure::NoRefreshToken)?;

        let exchange = self.exchanger.exchange_refresh_token(refresh_token);
        let grant = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| {
                RefreshFailure::transient(format!(
                    "token exchange timed out after {} ms",
                    self.timeout.as_millis()
                ))
            })??;

        record
            .renewed(grant, self.clock.now())
            .map_err(|e| RefreshFailure::unknown(e.to_string()))
    }
}
