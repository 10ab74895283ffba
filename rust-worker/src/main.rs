//! Queue Relay - forwards queue messages to an HTTP webhook.
//!
//! The process runs two paths side by side: the admin server and the relay
//! loop. A fatal error on either one ends the process.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use relay::{
    web, AmqpConsumer, AppState, Config, Forwarder, Relay, RelayMetrics, TrustConfiguration,
    RECEIVE_BATCH_SIZE,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize structured JSON logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().json().flatten_event(true))
        .init();

    info!("relay_starting");

    // Load configuration from .env and the environment
    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        queue_host = ?config.queue_host(),
        queue = %config.queue_name,
        webhook_host = ?config.webhook_url.host_str(),
        http_listen = %config.http_listen,
        bearer_token_configured = config.bearer_token.is_some(),
        tls_ca_configured = config.tls_ca_file.is_some(),
        admin_tls_configured = config.admin_tls().is_some(),
        "config_loaded"
    );

    let metrics = RelayMetrics::new().context("Failed to register metrics")?;

    // Admin server runs on its own task, over HTTPS when cert and key are both set
    let admin_tls = match config.admin_tls() {
        Some((cert, key)) => Some(
            web::load_tls(cert, key)
                .await
                .context("Failed to load admin TLS certificate")?,
        ),
        None => {
            if config.tls_cert_file.is_some() || config.tls_key_file.is_some() {
                warn!("admin_tls_incomplete_serving_http");
            }
            None
        }
    };
    let listener = TcpListener::bind(config.http_listen)
        .await
        .context("Failed to bind admin listener")?;
    let app = web::router(AppState::new(metrics.clone(), config.bearer_token.clone()));
    let admin = tokio::spawn(web::serve(listener, app, admin_tls));

    // Outbound client with the configured trust roots
    let trust = TrustConfiguration::load(config.tls_ca_file.as_deref())
        .context("Failed to load TLS trust configuration")?;
    let client = trust
        .build_client()
        .context("Failed to create HTTP client")?;
    let forwarder = Forwarder::new(
        client,
        config.webhook_url.clone(),
        config.bearer_token.clone(),
    );

    let consumer = AmqpConsumer::connect(
        &config.queue_url,
        &config.queue_name,
        RECEIVE_BATCH_SIZE as u16,
        config.receive_timeout,
        config.receive_linger,
    )
    .await
    .context("Failed to connect to queue")?;

    let mut relay = Relay::new(consumer, forwarder, Arc::new(metrics), RECEIVE_BATCH_SIZE);

    tokio::select! {
        result = relay.run() => {
            let err = match result {
                Ok(never) => match never {},
                Err(e) => e,
            };
            Err(err).context("Relay stopped")
        }
        result = admin => {
            match result {
                Ok(Ok(())) => bail!("Admin server exited"),
                Ok(Err(e)) => Err(e).context("Admin server error"),
                Err(e) => Err(e).context("Admin server task failed"),
            }
        }
        _ = shutdown_signal() => {
            info!("relay_shutdown_complete");
            Ok(())
        }
    }
}

/// Create a future that completes when a shutdown signal is received.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "ctrl_c_handler_failed");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "sigterm_handler_failed");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT"),
        _ = terminate => info!("Received SIGTERM"),
    }
}
