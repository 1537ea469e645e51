//! Sign-in error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::session::SessionError;

/// Errors that can occur while signing a user in.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] stockroom_core::EmailError),

    /// No live profile for this email.
    #[error("no profile found for {0}")]
    ProfileNotFound(String),

    /// The profile exists but has been deactivated.
    #[error("profile {0} is deactivated")]
    ProfileInactive(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// The session could not be persisted.
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl AuthError {
    /// Whether the failure is on our side rather than the user's input.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Repository(_) | Self::Session(_))
    }
}
