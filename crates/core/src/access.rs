//! Per-module permissions and the access resolver.
//!
//! A user's permissions arrive as a JSON object keyed by module name. Each
//! value is either a boolean that gates the whole module (`"dashboard": true`)
//! or an object of per-action booleans (`"products": {"view": true}`). The
//! resolver accepts any module and action string and denies whenever the
//! payload has no answer: missing module, missing action, missing session or a
//! value of some other JSON shape.
//!
//! ```
//! use stockroom_core::access::{ModuleGate, PermissionMap};
//!
//! let permissions: PermissionMap = serde_json::from_str(
//!     r#"{"dashboard": true, "products": {"view": true, "edit": false}}"#,
//! )
//! .unwrap();
//!
//! assert!(permissions.allows("dashboard", "anything"));
//! assert!(permissions.allows("products", "view"));
//! assert!(!permissions.allows("products", "edit"));
//! assert!(!permissions.allows("products", "delete"));
//! assert!(!permissions.allows("sales", "view"));
//! assert!(matches!(permissions.gate("dashboard"), Some(ModuleGate::Flag(true))));
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::session::Session;
use crate::types::UserRole;

/// Action checked when the caller does not name one.
pub const DEFAULT_ACTION: &str = actions::VIEW;

/// Module names used by the app's screens.
pub mod modules {
    pub const DASHBOARD: &str = "dashboard";
    pub const REPORTS: &str = "reports";
    pub const PRODUCTS: &str = "products";
    pub const CUSTOMERS: &str = "customers";
    pub const SUPPLIERS: &str = "suppliers";
    pub const SAMPLES: &str = "samples";
    pub const SALES: &str = "sales";
    pub const TRANSFERS: &str = "transfers";
    pub const USERS: &str = "users";
}

/// Action names used inside per-action module maps.
pub mod actions {
    pub const VIEW: &str = "view";
    pub const ADD: &str = "add";
    pub const EDIT: &str = "edit";
    pub const DELETE: &str = "delete";

    /// Every action a fully privileged module grants.
    pub const ALL: [&str; 4] = [VIEW, ADD, EDIT, DELETE];
}

/// Permission value for one module.
///
/// The shape is decided at runtime from the JSON payload, since the payload
/// comes from the backend and may name modules this build has never heard of.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModuleGate {
    /// Whole-module gate; the action is ignored.
    Flag(bool),
    /// Per-action gates. Only an explicit `true` allows; unknown actions and
    /// non-boolean values deny that action alone.
    Actions(BTreeMap<String, JsonValue>),
    /// Any other JSON shape. Always denies, but is kept so the payload
    /// survives a save/restore round trip unchanged.
    Unrecognized(JsonValue),
}

impl ModuleGate {
    /// Build a per-action gate from `(action, allowed)` pairs.
    #[must_use]
    pub fn actions<'a>(pairs: impl IntoIterator<Item = (&'a str, bool)>) -> Self {
        Self::Actions(
            pairs
                .into_iter()
                .map(|(action, allowed)| (action.to_owned(), JsonValue::Bool(allowed)))
                .collect(),
        )
    }

    /// Whether this gate lets `action` through.
    #[must_use]
    pub fn allows(&self, action: &str) -> bool {
        match self {
            Self::Flag(allowed) => *allowed,
            Self::Actions(map) => matches!(map.get(action), Some(JsonValue::Bool(true))),
            Self::Unrecognized(_) => false,
        }
    }
}

/// Permissions for every module a user can touch, keyed by module name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionMap(BTreeMap<String, ModuleGate>);

impl PermissionMap {
    /// An empty map. Denies everything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a permission payload, denying anything that is not an object.
    ///
    /// Used for payloads read from the database, where a `null` or a scalar
    /// must not abort sign-in but must not grant anything either.
    #[must_use]
    pub fn from_value(value: JsonValue) -> Self {
        match value {
            JsonValue::Object(_) => serde_json::from_value(value).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Discarding undecodable permission payload");
                Self::new()
            }),
            JsonValue::Null => Self::new(),
            other => {
                tracing::warn!(
                    kind = json_kind(&other),
                    "Permission payload is not an object, denying all modules"
                );
                Self::new()
            }
        }
    }

    /// Built-in permissions for a role, used when a profile stores none.
    #[must_use]
    pub fn defaults_for(role: UserRole) -> Self {
        use actions::{ADD, EDIT, VIEW};
        use modules::{
            CUSTOMERS, DASHBOARD, PRODUCTS, REPORTS, SALES, SAMPLES, SUPPLIERS, TRANSFERS, USERS,
        };

        const ENTITY_MODULES: [&str; 6] =
            [PRODUCTS, CUSTOMERS, SUPPLIERS, SAMPLES, SALES, TRANSFERS];

        let full = || ModuleGate::actions(actions::ALL.map(|action| (action, true)));

        match role {
            UserRole::SuperAdmin => ENTITY_MODULES
                .into_iter()
                .chain([USERS])
                .fold(Self::new(), |map, module| map.with(module, full()))
                .with(DASHBOARD, ModuleGate::Flag(true))
                .with(REPORTS, ModuleGate::Flag(true)),
            UserRole::Admin => ENTITY_MODULES
                .into_iter()
                .fold(Self::new(), |map, module| map.with(module, full()))
                .with(DASHBOARD, ModuleGate::Flag(true))
                .with(REPORTS, ModuleGate::Flag(true)),
            UserRole::SalesManager => Self::new()
                .with(DASHBOARD, ModuleGate::Flag(true))
                .with(PRODUCTS, ModuleGate::actions([(VIEW, true)]))
                .with(
                    CUSTOMERS,
                    ModuleGate::actions([(VIEW, true), (ADD, true), (EDIT, true)]),
                )
                .with(
                    SALES,
                    ModuleGate::actions([(VIEW, true), (ADD, true), (EDIT, true)]),
                )
                .with(SAMPLES, ModuleGate::actions([(VIEW, true), (ADD, true)]))
                .with(TRANSFERS, ModuleGate::actions([(VIEW, true)])),
            UserRole::Investor => Self::new()
                .with(DASHBOARD, ModuleGate::Flag(true))
                .with(REPORTS, ModuleGate::Flag(true))
                .with(PRODUCTS, ModuleGate::actions([(VIEW, true)]))
                .with(SALES, ModuleGate::actions([(VIEW, true)])),
        }
    }

    /// Returns the map with `module` set to `gate`, replacing any previous gate.
    #[must_use]
    pub fn with(mut self, module: &str, gate: ModuleGate) -> Self {
        self.0.insert(module.to_owned(), gate);
        self
    }

    /// The gate stored for `module`, if any.
    #[must_use]
    pub fn gate(&self, module: &str) -> Option<&ModuleGate> {
        self.0.get(module)
    }

    /// Whether `action` on `module` is allowed. Unknown modules are denied.
    #[must_use]
    pub fn allows(&self, module: &str, action: &str) -> bool {
        self.gate(module).is_some_and(|gate| gate.allows(action))
    }

    /// Iterate over `(module, gate)` pairs in module-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ModuleGate)> {
        self.0.iter().map(|(module, gate)| (module.as_str(), gate))
    }

    /// Number of modules with a stored gate.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no module has a stored gate.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

const fn json_kind(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "bool",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Whether the signed-in user may perform `action` on `module`.
///
/// No session means no permission.
#[must_use]
pub fn has_permission(session: Option<&Session>, module: &str, action: &str) -> bool {
    session.is_some_and(|session| session.permissions().allows(module, action))
}

/// [`has_permission`] with the default `view` action.
#[must_use]
pub fn can_view(session: Option<&Session>, module: &str) -> bool {
    has_permission(session, module, DEFAULT_ACTION)
}

/// Whether the signed-in user has exactly `role`.
#[must_use]
pub fn is_role(session: Option<&Session>, role: UserRole) -> bool {
    session.is_some_and(|session| session.role() == role)
}

/// [`is_role`] taking a role name. Unknown names never match.
#[must_use]
pub fn is_role_named(session: Option<&Session>, role: &str) -> bool {
    role.parse::<UserRole>()
        .is_ok_and(|role| is_role(session, role))
}

/// Read-only handle on the active session, handed to whatever renders or
/// dispatches gated actions.
///
/// Cloning is cheap. A context never observes a later login or logout: the
/// session manager hands out a fresh context after each change.
///
/// ```
/// use stockroom_core::AccessContext;
///
/// let anonymous = AccessContext::anonymous();
/// assert!(!anonymous.is_authenticated());
/// assert!(!anonymous.can_view("dashboard"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct AccessContext {
    session: Option<Arc<Session>>,
}

impl AccessContext {
    /// A context with nobody signed in.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self { session: None }
    }

    /// A context for `session`.
    #[must_use]
    pub const fn for_session(session: Arc<Session>) -> Self {
        Self {
            session: Some(session),
        }
    }

    /// The session behind this context, if any.
    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.session.as_deref()
    }

    /// Whether somebody is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    /// See [`has_permission`].
    #[must_use]
    pub fn has_permission(&self, module: &str, action: &str) -> bool {
        has_permission(self.session(), module, action)
    }

    /// See [`can_view`].
    #[must_use]
    pub fn can_view(&self, module: &str) -> bool {
        can_view(self.session(), module)
    }

    /// See [`is_role`].
    #[must_use]
    pub fn is_role(&self, role: UserRole) -> bool {
        is_role(self.session(), role)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::session::Identity;
    use crate::types::EmailAddress;

    fn session_with(role: UserRole, permissions: PermissionMap) -> Session {
        let identity = Identity::new(
            EmailAddress::parse("maria@stockroom.io").unwrap(),
            "Maria",
        );
        Session::new(identity, role, permissions)
    }

    fn admin_products_only() -> Session {
        let permissions: PermissionMap =
            serde_json::from_str(r#"{"products": {"view": true, "edit": false}}"#).unwrap();
        session_with(UserRole::Admin, permissions)
    }

    #[test]
    fn test_nested_actions_resolve_fail_closed() {
        let session = admin_products_only();
        let s = Some(&session);

        assert!(has_permission(s, "products", "view"));
        assert!(!has_permission(s, "products", "edit"));
        assert!(!has_permission(s, "products", "delete"));
        assert!(!has_permission(s, "sales", "view"));
    }

    #[test]
    fn test_missing_module_denies_every_action() {
        let session = admin_products_only();
        for action in ["view", "add", "edit", "delete", "", "export"] {
            assert!(!has_permission(Some(&session), "suppliers", action));
        }
    }

    #[test]
    fn test_flag_ignores_action() {
        let permissions = PermissionMap::new()
            .with("dashboard", ModuleGate::Flag(true))
            .with("reports", ModuleGate::Flag(false));
        let session = session_with(UserRole::Investor, permissions);

        for action in ["view", "delete", "no-such-action"] {
            assert!(has_permission(Some(&session), "dashboard", action));
            assert!(!has_permission(Some(&session), "reports", action));
        }
    }

    #[test]
    fn test_no_session_denies() {
        for role in UserRole::ALL {
            assert!(!is_role(None, role));
        }
        assert!(!has_permission(None, "dashboard", "view"));
        assert!(!can_view(None, "products"));
        assert!(!is_role_named(None, "super_admin"));
    }

    #[test]
    fn test_is_role() {
        let session = admin_products_only();
        assert!(is_role(Some(&session), UserRole::Admin));
        assert!(!is_role(Some(&session), UserRole::SuperAdmin));
        assert!(is_role_named(Some(&session), "admin"));
        assert!(!is_role_named(Some(&session), "Admin"));
    }

    #[test]
    fn test_unexpected_shapes_deny() {
        let permissions: PermissionMap = serde_json::from_str(
            r#"{
                "products": "yes",
                "sales": 1,
                "samples": null,
                "transfers": [true]
            }"#,
        )
        .unwrap();
        let session = session_with(UserRole::Admin, permissions);

        for module in ["products", "sales", "samples", "transfers"] {
            assert!(
                matches!(
                    session.permissions().gate(module),
                    Some(ModuleGate::Unrecognized(_))
                ),
                "{module} should be unrecognized"
            );
            assert!(!can_view(Some(&session), module));
        }
    }

    #[test]
    fn test_non_boolean_action_denies_only_itself() {
        let permissions: PermissionMap = serde_json::from_str(
            r#"{
                "products": {"view": true, "export": "yes", "edit": false},
                "customers": {"view": "true"}
            }"#,
        )
        .unwrap();
        let session = session_with(UserRole::Admin, permissions);

        assert!(matches!(
            session.permissions().gate("products"),
            Some(ModuleGate::Actions(_))
        ));
        assert!(has_permission(Some(&session), "products", "view"));
        assert!(!has_permission(Some(&session), "products", "export"));
        assert!(!has_permission(Some(&session), "products", "edit"));
        assert!(!has_permission(Some(&session), "products", "delete"));
        assert!(!can_view(Some(&session), "customers"));
    }

    #[test]
    fn test_unrecognized_gate_survives_round_trip() {
        let raw = r#"{"products":{"view":"true"}}"#;
        let permissions: PermissionMap = serde_json::from_str(raw).unwrap();
        assert_eq!(serde_json::to_string(&permissions).unwrap(), raw);
    }

    #[test]
    fn test_has_permission_is_idempotent() {
        let session = admin_products_only();
        let first = has_permission(Some(&session), "products", "view");
        let second = has_permission(Some(&session), "products", "view");
        assert_eq!(first, second);
    }

    #[test]
    fn test_from_value_non_object_denies() {
        assert!(PermissionMap::from_value(JsonValue::Null).is_empty());
        assert!(PermissionMap::from_value(serde_json::json!(true)).is_empty());
        assert!(PermissionMap::from_value(serde_json::json!(["products"])).is_empty());

        let map = PermissionMap::from_value(serde_json::json!({"dashboard": true}));
        assert!(map.allows("dashboard", DEFAULT_ACTION));
    }

    #[test]
    fn test_defaults_keep_users_for_super_admin() {
        let super_admin = PermissionMap::defaults_for(UserRole::SuperAdmin);
        let admin = PermissionMap::defaults_for(UserRole::Admin);

        assert!(super_admin.allows(modules::USERS, actions::DELETE));
        assert!(admin.gate(modules::USERS).is_none());
        assert!(admin.allows(modules::TRANSFERS, actions::DELETE));
    }

    #[test]
    fn test_defaults_for_limited_roles() {
        let sales = PermissionMap::defaults_for(UserRole::SalesManager);
        assert!(sales.allows(modules::CUSTOMERS, actions::EDIT));
        assert!(!sales.allows(modules::CUSTOMERS, actions::DELETE));
        assert!(!sales.allows(modules::PRODUCTS, actions::EDIT));
        assert!(!sales.allows(modules::SUPPLIERS, actions::VIEW));

        let investor = PermissionMap::defaults_for(UserRole::Investor);
        assert!(investor.allows(modules::REPORTS, actions::VIEW));
        assert!(investor.allows(modules::SALES, actions::VIEW));
        assert!(!investor.allows(modules::SALES, actions::ADD));
        assert!(!investor.allows(modules::CUSTOMERS, actions::VIEW));
    }

    #[test]
    fn test_access_context() {
        let context = AccessContext::for_session(Arc::new(admin_products_only()));
        assert!(context.is_authenticated());
        assert!(context.can_view("products"));
        assert!(!context.has_permission("products", "edit"));
        assert!(context.is_role(UserRole::Admin));

        let anonymous = AccessContext::default();
        assert!(!anonymous.is_authenticated());
        assert!(!anonymous.is_role(UserRole::Admin));
    }
}
