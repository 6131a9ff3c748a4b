//! neststore — e-commerce backend
//!
//! Long-running service that:
//! - Serves the storefront API (catalog, cart, orders, reviews)
//! - Handles Stripe checkout and webhooks for card payments
//! - Provides the admin API (catalog management, analytics, AI content)
//! - Sends transactional email via SES, stores images in S3

mod api;
mod auth;
mod config;
mod db;
mod email;
mod error;
mod gemini;
mod state;
mod stripe;
mod util;

use config::Config;
use state::AppState;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "neststore=info,tower_http=info".into()),
        )
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting neststore (env: {})", config.environment);

    let state = AppState::new(&config).await?;

    let app = api::create_router(state.clone());

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("neststore listening on {http_addr}");

    // Periodic rate limiter cleanup (every 5 minutes)
    let rate_limiter = state.rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(300));
        loop {
            interval.tick().await;
            rate_limiter.cleanup().await;
        }
    });

    axum::serve(listener, app).await?;

    Ok(())
}
