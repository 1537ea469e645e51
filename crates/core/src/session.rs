//! The signed-in user's session.
//!
//! A [`Session`] is built once at sign-in and never changes afterwards. A role
//! or permission change on the backend reaches the app only through a new
//! session (sign in again, or refresh).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::access::PermissionMap;
use crate::types::{EmailAddress, UserRole};

/// Who is signed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Login email.
    pub email_address: EmailAddress,
    /// Name shown in the app header.
    pub display_name: String,
}

impl Identity {
    /// Create an identity.
    #[must_use]
    pub fn new(email_address: EmailAddress, display_name: impl Into<String>) -> Self {
        Self {
            email_address,
            display_name: display_name.into(),
        }
    }
}

/// An established session.
///
/// Fields are private so permissions cannot be edited while checks are
/// running against them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    identity: Identity,
    role: UserRole,
    permissions: PermissionMap,
    login_timestamp: DateTime<Utc>,
}

impl Session {
    /// Start a session now.
    #[must_use]
    pub fn new(identity: Identity, role: UserRole, permissions: PermissionMap) -> Self {
        Self::established_at(identity, role, permissions, Utc::now())
    }

    /// Build a session with an explicit login time.
    #[must_use]
    pub const fn established_at(
        identity: Identity,
        role: UserRole,
        permissions: PermissionMap,
        login_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            identity,
            role,
            permissions,
            login_timestamp,
        }
    }

    #[must_use]
    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    #[must_use]
    pub const fn role(&self) -> UserRole {
        self.role
    }

    #[must_use]
    pub const fn permissions(&self) -> &PermissionMap {
        &self.permissions
    }

    #[must_use]
    pub const fn login_timestamp(&self) -> DateTime<Utc> {
        self.login_timestamp
    }

    /// Serialize for durable storage.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails, which only happens for
    /// non-string map keys and cannot occur for this type in practice.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode a stored payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a well-formed session.
    pub fn from_json(payload: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(payload)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::access::ModuleGate;

    fn sample() -> Session {
        let identity = Identity::new(
            EmailAddress::parse("lucia@stockroom.io").unwrap(),
            "Lucía Pérez",
        );
        let permissions = PermissionMap::new()
            .with("dashboard", ModuleGate::Flag(true))
            .with("products", ModuleGate::actions([("view", true)]));
        Session::established_at(
            identity,
            UserRole::SalesManager,
            permissions,
            Utc.with_ymd_and_hms(2026, 3, 14, 9, 30, 0).unwrap(),
        )
    }

    #[test]
    fn test_json_round_trip() {
        let session = sample();
        let restored = Session::from_json(&session.to_json().unwrap()).unwrap();
        assert_eq!(restored, session);
    }

    #[test]
    fn test_stored_layout() {
        let value: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        assert_eq!(value["identity"]["email_address"], "lucia@stockroom.io");
        assert_eq!(value["identity"]["display_name"], "Lucía Pérez");
        assert_eq!(value["role"], "sales_manager");
        assert_eq!(value["permissions"]["dashboard"], true);
        assert_eq!(value["permissions"]["products"]["view"], true);
        assert_eq!(value["login_timestamp"], "2026-03-14T09:30:00Z");
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        assert!(Session::from_json("").is_err());
        assert!(Session::from_json("{\"role\":\"admin\"}").is_err());

        let mut value: serde_json::Value =
            serde_json::from_str(&sample().to_json().unwrap()).unwrap();
        value["role"] = serde_json::json!("owner");
        assert!(Session::from_json(&value.to_string()).is_err());
    }
}
