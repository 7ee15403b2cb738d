//! Server assembly and lifecycle.
//!
//! Builds the shared HTTP client, the broker client and the registry,
//! launches the registry's background tasks, and serves the control plane
//! (plus a standard gRPC health service) until a shutdown signal arrives.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use pushgate_ams::AmsClient;
use pushgate_delivery::{PushRegistry, DEFAULT_HTTP_TIMEOUT_SECONDS};
use tonic::transport::Server;
use tonic_health::ServingStatus;
use tracing::{info, warn};

use crate::{config::Config, rpc::push_service_server::PushServiceServer, service::PushService};

/// Builds the HTTP client shared by every consumer, sender and the broker
/// client.
pub fn build_http_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECONDS))
        .danger_accept_invalid_certs(!config.verify_ssl)
        .build()
        .context("Failed to build HTTP client")
}

/// Builds the registry and starts its background tasks.
pub async fn build_registry(config: &Config, http: reqwest::Client) -> Arc<PushRegistry> {
    let ams = Arc::new(AmsClient::new(
        "https",
        &config.ams_host,
        config.ams_port,
        &config.ams_token,
        http.clone(),
    ));

    let registry = PushRegistry::new(ams, http, &config.ams_token, config.skip_subs_load);
    registry.start().await;
    registry
}

/// Serves the control plane until a shutdown signal arrives.
pub async fn serve(config: Config) -> Result<()> {
    info!(
        service_port = config.service_port,
        ams_host = %config.ams_host,
        ams_port = config.ams_port,
        tls_enabled = config.tls_enabled,
        skip_subs_load = config.skip_subs_load,
        log_level = %config.log_level,
        "configuration loaded"
    );

    let http = build_http_client(&config)?;
    let registry = build_registry(&config, http).await;

    let service = PushService::new(registry, config.acl.clone(), config.tls_enabled);

    let (mut health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter.set_service_status("", ServingStatus::Serving).await;

    let mut builder = Server::builder();
    if config.tls_enabled {
        builder = builder
            .tls_config(config.tls_server_config()?)
            .context("Failed to apply TLS configuration")?;
    }

    let addr = config.bind_addr()?;
    info!(%addr, tls_enabled = config.tls_enabled, "api is ready to start serving");

    builder
        .add_service(health_service)
        .add_service(PushServiceServer::new(service))
        .serve_with_shutdown(addr, shutdown_signal())
        .await
        .context("Could not serve")?;

    info!("server stopped gracefully");
    Ok(())
}

/// Waits for CTRL+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to install ctrl+c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install sigterm handler");
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            info!("received ctrl+c, starting graceful shutdown");
        }
        () = terminate => {
            info!("received sigterm, starting graceful shutdown");
        }
    }

    warn!("waiting for in-flight requests to complete");
}
