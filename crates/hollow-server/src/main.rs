mod config;

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use hollow_api::{AppStateInner, CredentialHasher, TokenService};
use hollow_db::Database;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hollow=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    if config.default_secret {
        warn!("HOLLOW_JWT_SECRET is not set; using the development secret");
    }

    // Init database
    let db = Database::open(&config.db_path)?;

    let app_state = Arc::new(AppStateInner {
        db,
        tokens: TokenService::new(&config.jwt_secret),
        hasher: CredentialHasher::new(&config.hasher)?,
    });

    let app = hollow_api::router(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = config.addr()?;
    info!("Hollow server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
