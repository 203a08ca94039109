// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use rabbithole_rust_server::{
    api::router,
    blockchain::{ClientConfig, TokenClient, TokenConfig, RHT_TOKEN},
    config::{AppConfig, LogFormat, DEFAULT_LOG_FILTER, RECEIPT_POLL_INTERVAL},
    conversion::ConversionSettings,
    relayer::HttpRelayer,
    state::AppState,
};

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(config.log_format);

    if let Err(e) = run(config).await {
        tracing::error!(error = %e, "Server terminated");
        std::process::exit(1);
    }
}

async fn run(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let signer = config.key_source.load()?;

    let chain = TokenClient::connect(
        ClientConfig {
            rpc_url: config.rpc_url.clone(),
            chain_id: config.chain_id,
            token_address: config.token_address,
            receipt_timeout: config.receipt_timeout,
            receipt_poll_interval: RECEIPT_POLL_INTERVAL,
        },
        signer,
    )
    .await?;

    match chain.decimals().await {
        Ok(decimals) if decimals != config.token_decimals => tracing::warn!(
            configured = config.token_decimals,
            on_chain = decimals,
            "Token decimals differ from configuration"
        ),
        Ok(_) => {}
        Err(e) => tracing::warn!(error = %e, "Could not read token decimals"),
    }

    let relayer = HttpRelayer::connect(&config.relayer_url).await?;

    let token = TokenConfig {
        decimals: config.token_decimals,
        ..RHT_TOKEN
    };
    let state = AppState::new(
        Arc::new(chain),
        Arc::new(relayer),
        token,
        ConversionSettings {
            decimals: config.token_decimals,
            max_decrypt_attempts: config.decrypt_max_attempts,
            decrypt_retry_delay: config.decrypt_retry_delay,
        },
    );
    let app = router(state);

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
        }
        tracing::info!("Shutdown signal received");
        signal_token.cancel();
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "RabbitHole convert server listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}
