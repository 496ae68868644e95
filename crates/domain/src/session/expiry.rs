//! Expiry evaluation.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::token::TokenRecord;

/// Freshness of an access token relative to a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    /// Not expiring within the lookahead window.
    Valid,
    /// Still usable, but expires within the lookahead window.
    ExpiringSoon,
    /// `now` has reached the expiry instant.
    Expired,
}

impl ExpiryStatus {
    /// Returns true if a refresh should be attempted.
    #[must_use]
    pub const fn needs_refresh(self) -> bool {
        !matches!(self, Self::Valid)
    }

    /// Returns true if the access token may still be presented.
    #[must_use]
    pub const fn is_usable(self) -> bool {
        !matches!(self, Self::Expired)
    }
}

/// Classifies a record's access token at `now` with a lookahead of `skew`.
///
/// `Expired` when `now >= expires`, `ExpiringSoon` when
/// `expires - now <= skew`, `Valid` otherwise. Pure and total.
#[must_use]
pub fn evaluate(record: &TokenRecord, now: DateTime<Utc>, skew: TimeDelta) -> ExpiryStatus {
    let expires = record.access_token_expires();
    if now >= expires {
        ExpiryStatus::Expired
    } else if expires.signed_duration_since(now) <= skew {
        ExpiryStatus::ExpiringSoon
    } else {
        ExpiryStatus::Valid
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use rand::Rng;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn record_expiring_at(expires: DateTime<Utc>) -> TokenRecord {
        TokenRecord::new("access", expires).unwrap()
    }

    #[test]
    fn test_boundaries() {
        let skew = TimeDelta::seconds(30);

        let at_expiry = record_expiring_at(now());
        assert_eq!(evaluate(&at_expiry, now(), skew), ExpiryStatus::Expired);

        let at_skew = record_expiring_at(now() + skew);
        assert_eq!(evaluate(&at_skew, now(), skew), ExpiryStatus::ExpiringSoon);

        let past_skew = record_expiring_at(now() + skew + TimeDelta::milliseconds(1));
        assert_eq!(evaluate(&past_skew, now(), skew), ExpiryStatus::Valid);
    }

    #[test]
    fn test_zero_skew_never_reports_expiring_soon() {
        let record = record_expiring_at(now() + TimeDelta::milliseconds(1));
        assert_eq!(
            evaluate(&record, now(), TimeDelta::zero()),
            ExpiryStatus::Valid
        );
    }

    #[test]
    fn test_randomized_offsets_match_classification() {
        let mut rng = rand::rng();

        for _ in 0..2_000 {
            let skew = TimeDelta::seconds(rng.random_range(0..=600));
            let offset = TimeDelta::milliseconds(rng.random_range(-3_600_000..=3_600_000));
            let record = record_expiring_at(now() + offset);

            let expected = if offset <= TimeDelta::zero() {
                ExpiryStatus::Expired
            } else if offset <= skew {
                ExpiryStatus::ExpiringSoon
            } else {
                ExpiryStatus::Valid
            };

            assert_eq!(
                evaluate(&record, now(), skew),
                expected,
                "offset={offset} skew={skew}"
            );
        }
    }

    #[test]
    fn test_status_helpers() {
        assert!(!ExpiryStatus::Valid.needs_refresh());
        assert!(ExpiryStatus::ExpiringSoon.needs_refresh());
        assert!(ExpiryStatus::Expired.needs_refresh());
        assert!(ExpiryStatus::ExpiringSoon.is_usable());
        assert!(!ExpiryStatus::Expired.is_usable());
    }
}
