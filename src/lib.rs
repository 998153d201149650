pub mod api;
pub mod config;
pub mod db;
pub mod entities;
pub mod jwt;
pub mod models;
pub mod rate_limit;
pub mod services;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub use config::Config;
use state::SharedState;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;

    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Refuse to start with a weak or placeholder JWT secret.
    config.validate()?;

    info!("Deskarr v{} starting...", env!("CARGO_PKG_VERSION"));

    let shared = Arc::new(SharedState::new(config.clone()).await?);

    // First boot creates the well-known admin; every later boot is a no-op.
    shared.account_service.ensure_default_admin().await?;

    let state = api::create_app_state(shared.clone());
    let app = api::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}");

    let server = tokio::spawn(async move {
        // ConnectInfo gives the rate limiter the peer address of each request.
        if let Err(e) = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        {
            error!("Server error: {e}");
        }
    });

    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {e}"),
    }

    shared.rate_limiter.shutdown();
    server.abort();
    info!("Stopped");

    Ok(())
}
