mod error;
mod routes;
mod state;

use anyhow::Result;
use shared::Config;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting coinboard API server...");

    let config = Config::from_env()?;
    let state = AppState::new(&config).await?;
    info!("Connected to database");

    let app = routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!("API server listening on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
