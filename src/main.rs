// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use language_processor::{
    api::{start_server, AppState},
    config::ServiceConfig,
    embeddings::{load_provider, ProviderSlot},
    version,
};
use std::{env, sync::Arc};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServiceConfig::load();

    // Initialize tracing subscriber for logging
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting {}", version::get_version_string());

    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;
    let addr = config.listen_addr().await?;

    // The model must be loaded before the listener binds; a failed load is fatal
    let provider = Arc::new(ProviderSlot::new());
    provider
        .initialize(|| load_provider(&config))
        .await
        .context("Refusing to start without an embedding model")?;

    start_server(addr, AppState::new(provider)).await
}
