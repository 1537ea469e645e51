//! Sign-in service.
//!
//! Turns a stored profile into a [`Session`] and hands it to the session
//! manager. Credential checks happen at the hosted backend before this runs;
//! this service only resolves who the user is and what they may do.

mod error;

pub use error::AuthError;

use sqlx::PgPool;

use stockroom_core::{AccessContext, EmailAddress, Identity, PermissionMap, Session};

use crate::db::{Profile, ProfileRepository};
use crate::session::SessionManager;
use crate::storage::SessionStore;

/// Sign-in service backed by the `profiles` table.
pub struct AuthService<'a> {
    profiles: ProfileRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new sign-in service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, schema: &'a str) -> Self {
        Self {
            profiles: ProfileRepository::new(pool, schema),
        }
    }

    /// Load the profile for `email`, build a session from it and make it the
    /// active session.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` for a malformed address,
    /// `AuthError::ProfileNotFound` / `AuthError::ProfileInactive` when the
    /// profile cannot sign in, `AuthError::Repository` if the lookup fails and
    /// `AuthError::Session` if the session cannot be persisted.
    pub async fn sign_in<S: SessionStore>(
        &self,
        manager: &mut SessionManager<S>,
        email: &str,
    ) -> Result<AccessContext, AuthError> {
        let email = EmailAddress::parse(email)?;

        let profile = self
            .profiles
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AuthError::ProfileNotFound(email.to_string()))?;

        let session = session_for_profile(profile)?;
        Ok(manager.login(session).await?)
    }
}

/// Build the session a profile signs in with.
///
/// Profiles without a permission payload get their role's defaults.
///
/// # Errors
///
/// Returns `AuthError::ProfileInactive` if the profile is deactivated.
pub fn session_for_profile(profile: Profile) -> Result<Session, AuthError> {
    if !profile.is_active {
        tracing::warn!(email = %profile.email, "Sign-in refused for deactivated profile");
        return Err(AuthError::ProfileInactive(profile.email.to_string()));
    }

    let permissions = profile.permissions.unwrap_or_else(|| {
        tracing::debug!(role = %profile.role, "Profile has no permissions, using role defaults");
        PermissionMap::defaults_for(profile.role)
    });

    Ok(Session::new(
        Identity::new(profile.email, profile.display_name),
        profile.role,
        permissions,
    ))
}
