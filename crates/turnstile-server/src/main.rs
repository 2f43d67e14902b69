use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use turnstile_core::AccessPolicy;
use turnstile_server::cli::{Cli, Command};
use turnstile_server::config::{AppConfig, LogFormat};
use turnstile_server::metrics::{self, Metrics};
use turnstile_server::start_service_with_metrics;

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level));

    let registry = tracing_subscriber::registry().with(filter);

    match config.log.format {
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer().json();
            registry.with(fmt_layer).init();
        }
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer().pretty();
            registry.with(fmt_layer).init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref())?;
    init_logging(&config);

    match cli.command {
        Some(Command::CheckPolicy { consumer, method }) => {
            run_check_policy(&config, &consumer, &method)
        }
        Some(Command::Serve) | None => run_serve(config).await,
    }
}

fn run_check_policy(
    config: &AppConfig,
    consumer: &str,
    method: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let policy = AccessPolicy::from_json(&config.read_policy()?)?;

    if policy.is_allowed(consumer, method) {
        println!("allowed: {consumer} may call {method}");
    } else {
        println!("denied: {consumer} may not call {method}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run_serve(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        grpc_addr = %config.grpc_addr(),
        metrics_enabled = config.metrics.enabled,
        "starting turnstile server"
    );

    let policy_json = config.read_policy()?;
    let metrics = Arc::new(Metrics::new());
    let shutdown = CancellationToken::new();

    let service = start_service_with_metrics(
        shutdown.clone(),
        &config.grpc_addr(),
        &policy_json,
        Arc::clone(&metrics),
    )
    .await?;

    let metrics_server = if config.metrics.enabled {
        let metrics_addr: std::net::SocketAddr = config.metrics_addr().parse()?;
        let listener = tokio::net::TcpListener::bind(metrics_addr).await?;
        tracing::info!(%metrics_addr, "metrics endpoint listening");

        let token = shutdown.clone();
        let router = metrics::router(Arc::clone(&metrics));
        Some(tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
        }))
    } else {
        None
    };

    tokio::spawn(shutdown_signal(shutdown.clone()));

    let result = service.wait().await;
    // The gRPC server may stop on its own; take the metrics endpoint down with it.
    shutdown.cancel();

    if let Some(handle) = metrics_server
        && let Err(e) = handle.await?
    {
        tracing::error!(error = %e, "metrics server error");
    }

    result?;
    tracing::info!("server shut down gracefully");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = tokio::signal::ctrl_c();

    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
        Ok(mut sigterm) => {
            tokio::select! {
                _ = ctrl_c => { tracing::info!("received SIGINT"); }
                _ = sigterm.recv() => { tracing::info!("received SIGTERM"); }
                _ = shutdown.cancelled() => { return; }
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "failed to register SIGTERM handler, using SIGINT only");
            tokio::select! {
                _ = ctrl_c => { tracing::info!("received SIGINT"); }
                _ = shutdown.cancelled() => { return; }
            }
        }
    }

    shutdown.cancel();
}
