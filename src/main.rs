use std::sync::Arc;

use artifact_proxy::config::{self, AppState};
use artifact_proxy::{logger, server};
use tokio::sync::Notify;

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Optional first argument: config file path without extension
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| config::DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::Config::load_from(&config_path)?;

    logger::init(&cfg.logging)?;

    // Worker count follows the config, defaulting to CPU cores
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: config::Config) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let addr = cfg.get_socket_addr()?;

    let state = Arc::new(AppState::new(cfg)?);
    state.store.ensure_root().await?;

    let listener = server::create_listener(addr)?;
    logger::log_server_start(&listener.local_addr()?, &state.config);

    let shutdown = Arc::new(Notify::new());
    server::start_signal_handler(Arc::clone(&shutdown))?;

    server::run(listener, state, shutdown).await;
    Ok(())
}
