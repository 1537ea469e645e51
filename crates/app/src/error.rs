//! Unified error handling for the Stockroom runtime.

use thiserror::Error;

use crate::config::ConfigError;
use crate::db::RepositoryError;
use crate::services::AuthError;
use crate::session::SessionError;
use stockroom_core::SetupError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Could not connect to the database.
    #[error("Database connection failed: {0}")]
    Connect(#[from] sqlx::Error),

    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Session could not be stored or removed.
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Sign-in was refused or failed.
    #[error("Sign-in failed: {0}")]
    Auth(#[from] AuthError),

    /// The setup catalog is invalid.
    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),

    /// Output could not be encoded.
    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// Invalid user input.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

impl AppError {
    /// Whether the error points at a fault in the app or its environment,
    /// as opposed to something the operator typed.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        match self {
            Self::Connect(_)
            | Self::Database(_)
            | Self::Session(_)
            | Self::Setup(_)
            | Self::Encode(_) => true,
            Self::Auth(err) => err.is_internal(),
            Self::Config(_) | Self::BadRequest(_) => false,
        }
    }

    /// Log the error, capturing internal faults with Sentry.
    pub fn report(&self) {
        if self.is_internal() {
            let event_id = sentry::capture_error(self);
            tracing::error!(error = %self, sentry_event_id = %event_id, "Command failed");
        } else {
            tracing::info!(error = %self, "Command rejected");
        }
    }
}

/// Set the Sentry user context for the signed-in email.
pub fn set_sentry_user(email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            email: Some(email.to_owned()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}
