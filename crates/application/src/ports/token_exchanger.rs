//! Identity provider port.

use async_trait::async_trait;
use waybill_domain::{RefreshFailure, TokenGrant};

/// The refresh-token exchange against an identity provider.
///
/// Providers differ in whether they rotate refresh tokens, how they name
/// response fields and how they report errors; implementations absorb
/// those differences and classify every failure into [`RefreshFailure`].
///
/// One call is exactly one exchange. Implementations must not retry.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Exchanges a refresh token for a new access token.
    ///
    /// # Arguments
    /// * `refresh_token` - The refresh token currently held by the session.
    ///
    /// # Returns
    /// The grant issued by the provider, with `refresh_token` set only if
    /// the provider rotated it.
    async fn exchange_refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<TokenGrant, RefreshFailure>;
}
