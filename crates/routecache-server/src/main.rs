//! Route cache demo server binary.

use std::path::PathBuf;

use routecache_server::{AppState, Settings, init_metrics, run_server};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::var_os("ROUTECACHE_CONFIG").map(PathBuf::from);
    let settings = Settings::load(config_path.as_deref())?;
    let addr = settings.socket_addr()?;

    tracing::info!(
        "Starting route cache server v{}",
        env!("CARGO_PKG_VERSION")
    );
    tracing::info!(
        delimiter = %settings.routes.delimiter,
        param_prefix = %settings.routes.param_prefix,
        glob = %settings.routes.glob,
        max_capacity = settings.cache.max_capacity,
        "Settings loaded"
    );

    let prometheus = init_metrics()?;
    let cache = settings.cache_builder().build()?;
    let state = AppState::new(cache);

    run_server(addr, state, prometheus).await?;

    Ok(())
}
