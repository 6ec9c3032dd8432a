//! CLI subcommands.

pub mod admin;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;
use sqlx::PgPool;

/// Connection string from `GOBBLE_DATABASE_URL`, falling back to
/// `DATABASE_URL`.
fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();
    std::env::var("GOBBLE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}

/// Connect to the database named by the environment.
async fn connect() -> Result<PgPool, ConnectError> {
    let url = database_url().ok_or(ConnectError::MissingUrl)?;
    tracing::info!("Connecting to database...");
    Ok(gobble_server::db::create_pool(&url).await?)
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Missing environment variable: GOBBLE_DATABASE_URL (or DATABASE_URL)")]
    MissingUrl,

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}
