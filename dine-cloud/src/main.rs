//! dine-cloud: restaurant operations backend
//!
//! Long-running service that:
//! - Serves the customer QR ordering API (menu, orders, Stripe checkout)
//! - Serves the staff API (POS, tables, kitchen display, team, reports)
//! - Plans and executes back-office actions through the LLM assistant
//! - Runs the scheduled daily reset

mod api;
mod assistant;
mod auth;
mod config;
mod db;
mod error;
mod llm;
mod logger;
mod scheduler;
mod state;
mod stripe;

use std::net::SocketAddr;

use config::Config;
use state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;
    logger::init_logger(config.log_level.as_deref(), config.log_dir.as_deref());

    tracing::info!("Starting dine-cloud (env: {})", config.environment);

    // Initialize application state
    let state = AppState::new(&config).await?;

    // Periodic rate limiter cleanup (every 5 minutes)
    let rate_limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rate_limiter.cleanup().await;
        }
    });

    scheduler::spawn_daily_reset(state.clone(), config.daily_reset_interval_secs);

    let app = api::create_router(state);

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("dine-cloud HTTP listening on {http_addr}");

    // Peer address is the rate limiter's fallback when X-Forwarded-For is absent
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
