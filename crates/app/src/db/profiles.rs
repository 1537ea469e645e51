//! Profile lookups.
//!
//! A profile is the backend's record of an app user. Soft-deleted profiles
//! (`deleted_at` set) are invisible here.

use serde_json::Value as JsonValue;
use sqlx::PgPool;

use stockroom_core::{EmailAddress, PermissionMap, UserRole};

use super::RepositoryError;

/// An app user's stored profile (domain type).
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub email: EmailAddress,
    pub display_name: String,
    pub role: UserRole,
    /// `None` when the profile has no permission payload and the role's
    /// defaults apply.
    pub permissions: Option<PermissionMap>,
    pub is_active: bool,
}

/// Raw row from `profiles`.
#[derive(Debug, sqlx::FromRow)]
struct ProfileRow {
    email: String,
    full_name: Option<String>,
    role: UserRole,
    permissions: Option<JsonValue>,
    is_active: bool,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = RepositoryError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        let email = EmailAddress::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("profile email {:?}: {e}", row.email))
        })?;

        let display_name = row
            .full_name
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| email.mailbox().to_owned());

        let permissions = match row.permissions {
            None | Some(JsonValue::Null) => None,
            Some(value) => Some(PermissionMap::from_value(value)),
        };

        Ok(Self {
            email,
            display_name,
            role: row.role,
            permissions,
            is_active: row.is_active,
        })
    }
}

/// Repository for `profiles`.
pub struct ProfileRepository<'a> {
    pool: &'a PgPool,
    schema: &'a str,
}

impl<'a> ProfileRepository<'a> {
    /// Create a repository reading `profiles` from `schema`.
    #[must_use]
    pub const fn new(pool: &'a PgPool, schema: &'a str) -> Self {
        Self { pool, schema }
    }

    /// Find the live profile for `email`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails, or
    /// `RepositoryError::DataCorruption` if the stored email is invalid.
    pub async fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> Result<Option<Profile>, RepositoryError> {
        let query = format!(
            r#"
            SELECT email, full_name, role, permissions, COALESCE(is_active, TRUE) AS is_active
            FROM {}.profiles
            WHERE lower(email) = $1 AND deleted_at IS NULL
            "#,
            quote_ident(self.schema)
        );

        let row = sqlx::query_as::<_, ProfileRow>(&query)
            .bind(email.as_str())
            .fetch_optional(self.pool)
            .await?;

        row.map(Profile::try_from).transpose()
    }
}

/// Quote a SQL identifier, doubling embedded quotes.
pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}
