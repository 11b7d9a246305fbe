//! services/api/src/bin/seed.rs
//!
//! Writes demo entries for the dev user (`DEV_USER_KEY`), or for the provider
//! key given as the first argument.

use diary_api::{adapters::DbAdapter, config::Config, error::ApiError, seed::seed_demo_entries};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let user_key = match std::env::args().nth(1) {
        Some(arg) => arg
            .parse::<i64>()
            .map_err(|_| ApiError::BadRequest(format!("'{}' is not a user key", arg)))?,
        None => config.dev_user_key,
    };

    let db_pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.database_url)
        .await?;
    let db = DbAdapter::new(db_pool);
    db.run_migrations().await?;

    let written = seed_demo_entries(&db, user_key).await?;
    info!("Seed complete: {} new entries for user key {}", written, user_key);
    Ok(())
}
