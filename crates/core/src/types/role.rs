//! User roles.

use serde::{Deserialize, Serialize};

/// Error returned when a role name is not one of the known roles.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid role: {0} (expected super_admin, admin, sales_manager or investor)")]
pub struct RoleParseError(pub String);

/// Role stored on a user's profile.
///
/// Roles gate coarse features (user management is `SuperAdmin` only); the
/// per-module permission map handles everything finer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Owner account. Manages users in addition to everything else.
    SuperAdmin,
    /// Runs the store day to day.
    Admin,
    /// Works customers, samples and sales.
    SalesManager,
    /// Read-only view of dashboards and sales.
    Investor,
}

impl UserRole {
    /// Every role, highest privilege first.
    pub const ALL: [Self; 4] = [
        Self::SuperAdmin,
        Self::Admin,
        Self::SalesManager,
        Self::Investor,
    ];

    /// The role's wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SuperAdmin => "super_admin",
            Self::Admin => "admin",
            Self::SalesManager => "sales_manager",
            Self::Investor => "investor",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| RoleParseError(s.to_owned()))
    }
}
