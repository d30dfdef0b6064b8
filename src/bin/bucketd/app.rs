use std::path::PathBuf;
use std::sync::Arc;

use bucketd::Result;
use bucketd::config::Config;
use bucketd::http::{self, AppState};
use bucketd::limiter::Counter;
use bucketd::limiter::sweep::run_sweeper;
use bucketd::telemetry::init_tracing;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use super::cli::Cli;

const DEFAULT_CONFIG: &str = "bucketd.toml";

pub async fn run(cli: Cli) -> Result<()> {
    init_tracing(cli.log_filter.as_deref(), cli.json_logs)?;

    let config_path = cli.config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let mut config = Config::from_env_and_file(&config_path)?;
    if let Some(bind) = cli.bind.as_deref() {
        config.override_bind_addr(bind)?;
    }

    let listener = match http::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(addr = %config.bind_addr, error = %err, "cannot start listener");
            return Err(err);
        }
    };
    let local_addr = listener
        .local_addr()
        .map_err(|source| bucketd::error::ServerError::LocalAddr { source })?;
    info!(
        addr = %local_addr,
        limit_per_minute = config.admission.limit_per_window,
        cost = config.admission.amount,
        max_keys = config.max_keys.get(),
        "listening"
    );

    let counter = Arc::new(Counter::new(config.max_keys));
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let sweeper = tokio::spawn(run_sweeper(
        Arc::clone(&counter),
        config.sweep_interval,
        async move {
            let _ = stop_rx.await;
        },
    ));

    let state = AppState::new(counter, config.admission);
    let served = http::serve(listener, state, shutdown_signal()).await;

    let _ = stop_tx.send(());
    if let Err(err) = sweeper.await {
        warn!(error = %err, "sweeper task terminated unexpectedly");
    }

    served
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received, draining connections"),
        Err(err) => {
            warn!(error = %err, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
