//! HTTP server startup.
//!
//! [`serve`] validates the routing table, opens the database, builds the
//! provider clients and runs the axum router until Ctrl-C.

use crate::api::{self, AppState};
use crate::config::RelayConfig;
use crate::db;
use anyhow::Result;

/// Start the relay on the configured host and port.
pub async fn serve(config: RelayConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = db::open_database(&db_path)?;
    tracing::info!(db = %db_path.display(), "database ready");

    let state = AppState::from_config(&config, conn)?;

    let routes = state.orchestrator.routes();
    for kind in routes.providers_in_use() {
        if config.providers.get(kind).api_key.is_none() {
            tracing::warn!(provider = %kind, "no API key configured, upstream calls will be rejected");
        }
    }
    for route in routes.routes() {
        tracing::debug!(
            model = %route.model,
            profile = %route.profile.name,
            provider = %route.provider,
            "model route"
        );
    }

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "memory relay listening at http://{bind_addr}");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
            }
            tracing::info!("shutting down HTTP server");
        })
        .await?;

    Ok(())
}
