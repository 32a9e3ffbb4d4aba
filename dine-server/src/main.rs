//! dine-server entry point

use std::net::SocketAddr;
use std::time::Duration;

use dine_server::config::BoxError;
use dine_server::{AppState, Config, api, logger};

/// Interval of the rate limiter sweep
const RATE_LIMIT_CLEANUP: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    let _log_guard = logger::init(&config.log)?;

    tracing::info!(
        environment = %config.environment,
        base_path = %config.api_base_path(),
        "Starting dine-server v{}",
        env!("CARGO_PKG_VERSION")
    );

    let state = AppState::new(&config).await?;

    // Periodic rate limiter cleanup
    let rate_limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(RATE_LIMIT_CLEANUP);
        loop {
            interval.tick().await;
            rate_limiter.cleanup().await;
        }
    });

    let app = api::create_router(state);
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("dine-server listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("dine-server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
