use anyhow::Result;
use connect_sim::Config;
use connect_sim::clock::SystemClock;
use connect_sim::engine::Simulator;
use connect_sim::logging::init_logging;
use connect_sim::web::{self, AppState};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    let mut config =
        Config::load().map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;
    config
        .apply_env_overrides()
        .map_err(|e| anyhow::anyhow!("Invalid environment override: {}", e))?;
    config.validate()?;

    init_logging(&config.logging)?;
    info!("connect-sim {} starting up", env!("APP_VERSION"));

    let simulator = Simulator::new(&config, Arc::new(SystemClock));
    info!("Authorization code: {}", simulator.authorization_code());
    if let Some(token) = config.auth.token.as_deref() {
        info!("Pre-issued access token: {}", token);
    }

    let state = AppState::new(simulator, &config.web.images_dir);
    if let Err(e) = web::serve(state, &config.web.host, config.web.port).await {
        error!("Web server error: {}", e);
        return Err(e);
    }
    Ok(())
}
