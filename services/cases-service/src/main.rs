//! Cases service binary entry point.

use cases_service::{server, Authenticator, CasesServiceConfig, CasesState};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cases_service=info,tonic=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting cases-service");

    let config = CasesServiceConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config, using defaults: {}", e);
        CasesServiceConfig::default()
    });
    if config.auth.allow_anonymous {
        tracing::warn!("Anonymous access is enabled; unidentified callers act as superuser");
    }

    let state = Arc::new(CasesState::new(config.listing.limits()));
    let authenticator = Authenticator::new(config.auth.allow_anonymous);

    let addr: SocketAddr = format!("{}:{}", config.service.host, config.service.port).parse()?;
    tracing::info!("Listening on {addr}");

    server::router(state, authenticator)
        .await?
        .serve_with_shutdown(addr, async {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("received ctrl_c, shutting down"),
                Err(e) => tracing::error!("failed to listen for ctrl_c: {:?}", e),
            }
        })
        .await?;

    Ok(())
}
