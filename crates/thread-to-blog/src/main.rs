mod config;
mod error;
mod generator;
mod model;
mod rate_limit;
mod server;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use blog_common::openrouter::OpenRouterClient;

use config::Config;
use generator::BlogGenerator;
use rate_limit::RateLimiter;
use server::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_ansi(false)
        .init();

    info!("starting thread-to-blog server");

    let config = Config::from_env()?;
    info!(
        bind_addr = %config.bind_addr,
        base_url = %config.openrouter.base_url,
        model = %config.openrouter.model,
        api_key = config.openrouter.has_api_key(),
        timeout_secs = config.openrouter.timeout.map(|t| t.as_secs()),
        rate_limit_points = config.rate_limit_points,
        rate_limit_window_secs = config.rate_limit_window.as_secs(),
        "configuration loaded"
    );
    if !config.openrouter.has_api_key() {
        warn!("OPENROUTER_API_KEY is not set, generation requests will fail");
    }

    let client = OpenRouterClient::new(config.openrouter.clone())?;
    let generator = Arc::new(BlogGenerator::new(client));

    let limiter = RateLimiter::new(config.rate_limit_points, config.rate_limit_window);
    let _sweeper = limiter.spawn_sweeper(config.rate_limit_sweep_interval);

    let app = server::router(AppState { generator, limiter });

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "HTTP server ready");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .inspect_err(|e| {
        tracing::error!(error = %e, "HTTP server error");
    })?;

    info!("HTTP server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
