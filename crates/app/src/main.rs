//! Waybill session gateway binary.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};
use waybill_infrastructure::SessionSettings;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = SessionSettings::load().inspect_err(|e| {
        tracing::error!(error = %e, "failed to load settings");
    })?;
    let registry = Arc::new(waybill_gateway::build_registry(&settings)?);

    tracing::info!(
        token_url = %settings.provider.token_url,
        storage = ?settings.storage.kind,
        background = settings.refresh.background,
        "Starting Waybill gateway v{}",
        env!("CARGO_PKG_VERSION")
    );

    let (addr, server) = waybill_gateway::serve(settings.server.bind, registry)
        .await
        .inspect_err(|e| tracing::error!(bind = %settings.server.bind, error = %e, "failed to bind"))?;
    tracing::info!(%addr, "listening");

    server.await.inspect_err(|e| tracing::error!(error = %e, "server stopped"))?;

    Ok(())
}
