//! Transaction Statistics Service — Binary Entrypoint
//! Boots the Axum HTTP server with a single shared transaction store.

use anyhow::Context;
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use transaction_statistics::ServiceConfig;

/// Compact tracing logs for local development.
/// Shuttle installs its own subscriber in deployment, so this one must not
/// panic if a global subscriber already exists.
fn enable_dev_tracing(config: &ServiceConfig) {
    if !config.dev_log {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("transaction_statistics=info,warn"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    let config = ServiceConfig::load().context("loading service config")?;
    enable_dev_tracing(&config);

    let router = transaction_statistics::app(&config)?;
    Ok(router.into())
}
