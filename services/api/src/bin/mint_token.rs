//! services/api/src/bin/mint_token.rs
//!
//! Prints an app bearer token for a provider user key, creating the user if
//! needed. Useful for calling the API by hand.
//!
//! Usage: `mint_token <user-key>`

use diary_api::{adapters::DbAdapter, config::Config, error::ApiError, web::auth::issue_app_jwt};
use diary_core::ports::DatabaseService;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    let config = Config::from_env()?;

    let arg = std::env::args()
        .nth(1)
        .ok_or_else(|| ApiError::BadRequest("usage: mint_token <user-key>".to_string()))?;
    let user_key = arg
        .parse::<i64>()
        .map_err(|_| ApiError::BadRequest(format!("'{}' is not a user key", arg)))?;

    let db_pool = PgPoolOptions::new()
        .max_connections(1)
        .connect(&config.database_url)
        .await?;
    let db = DbAdapter::new(db_pool);
    db.run_migrations().await?;

    let user = db.get_or_create_user(user_key).await?;
    let token = issue_app_jwt(&config.jwt, &user)?;
    println!("{}", token);
    Ok(())
}
