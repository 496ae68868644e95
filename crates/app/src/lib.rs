//! Waybill session gateway.
//!
//! A small HTTP front for the session registry: request-handling code
//! signs sessions in, looks them up (refreshing tokens as needed) and
//! signs them out.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use waybill_application::ports::SessionStorage;
use waybill_application::{RefreshExecutor, SessionProjector, SessionRegistry};
use waybill_infrastructure::{
    ConfigError, FileSessionStorage, MemorySessionStorage, OAuth2TokenExchanger, SessionSettings,
    StorageKind, SystemClock,
};

mod routes;

pub use routes::{SESSION_STATE_HEADER, SignInRequest, SignInResponse, router};

/// The registry type the gateway binary runs with.
pub type GatewayRegistry = SessionRegistry<OAuth2TokenExchanger, SystemClock>;

/// Wires settings into a registry.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] if the provider settings are unusable.
pub fn build_registry(settings: &SessionSettings) -> Result<GatewayRegistry, ConfigError> {
    let exchanger = settings.provider.exchanger()?;
    let executor =
        RefreshExecutor::new(exchanger, SystemClock::new()).with_timeout(settings.refresh.timeout());
    let projector = SessionProjector::new(executor).with_policy(settings.refresh.policy());

    let storage: Arc<dyn SessionStorage> = match (&settings.storage.kind, &settings.storage.directory) {
        (StorageKind::File, Some(directory)) => Arc::new(FileSessionStorage::new(directory)),
        (StorageKind::File, None) => {
            return Err(ConfigError::Invalid(
                "storage.directory is required for file storage".to_string(),
            ));
        }
        (StorageKind::Memory, _) => Arc::new(MemorySessionStorage::new()),
    };

    Ok(SessionRegistry::new(projector).with_storage(storage))
}

/// Binds the gateway listener.
///
/// Returns the bound address and the server future.
///
/// # Errors
///
/// Returns an error if the address cannot be bound.
pub async fn serve(
    addr: SocketAddr,
    registry: Arc<GatewayRegistry>,
) -> Result<(SocketAddr, impl Future<Output = Result<(), std::io::Error>>), std::io::Error> {
    let listener = TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;
    let app = router(registry);

    let fut = async move { axum::serve(listener, app).await };

    Ok((bound_addr, fut))
}
