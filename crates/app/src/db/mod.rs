//! Database access for the hosted `PostgreSQL` backend.
//!
//! The backend owns the schema. This crate only reads from it: the
//! `profiles` table at sign-in and the system catalogs when checking setup.
//!
//! ## Tables read
//!
//! - `profiles` - One row per app user: email, name, role, permissions (JSONB)
//! - `pg_type`, `pg_class`, `pg_proc`, `information_schema.tables` - Setup probes

pub mod profiles;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use profiles::{Profile, ProfileRepository};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Create a small `PostgreSQL` connection pool.
///
/// The CLI runs one command at a time, so a couple of connections is plenty.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
