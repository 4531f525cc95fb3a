pub mod doctor;
pub mod history;
pub mod import;
pub mod reset;

use anyhow::Result;

use memory_relay::config::RelayConfig;
use memory_relay::routing::ModelRoutes;

/// Validated routing table for commands that take `--model`.
fn load_routes(config: &RelayConfig) -> Result<ModelRoutes> {
    Ok(ModelRoutes::from_config(&config.profiles, &config.models)?)
}

/// Profile name served by `model`.
fn profile_for_model(config: &RelayConfig, model: &str) -> Result<String> {
    let routes = load_routes(config)?;
    let route = routes
        .resolve(model)
        .ok_or_else(|| anyhow::anyhow!("unknown model `{model}`"))?;
    Ok(route.profile.name.clone())
}
