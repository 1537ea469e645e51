//! Session lifecycle: restore at start, login, logout.
//!
//! [`SessionManager`] is the single owner of the active session. Consumers
//! never read it directly; they get an [`AccessContext`] from
//! [`SessionManager::access`] and re-fetch it after any login or logout.
//!
//! Until [`SessionManager::restore_on_start`] has finished, the manager
//! reports nobody signed in, so nothing gated is shown before the stored
//! session has been read.

use std::sync::Arc;

use stockroom_core::{AccessContext, Session};
use thiserror::Error;

use crate::storage::{SessionStore, StorageError};

/// Errors from login and logout.
///
/// Restore never fails: an unreadable session is the same as no session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The session could not be persisted or removed.
    #[error("session storage failed: {0}")]
    Storage(#[from] StorageError),

    /// The session could not be encoded for storage.
    #[error("session encoding failed: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Owns the active session and its persisted copy.
#[derive(Debug)]
pub struct SessionManager<S> {
    store: S,
    active: Option<Arc<Session>>,
    restored: bool,
}

impl<S: SessionStore> SessionManager<S> {
    /// A manager with nothing restored yet.
    pub const fn new(store: S) -> Self {
        Self {
            store,
            active: None,
            restored: false,
        }
    }

    /// Read the persisted session, if any, and make it active.
    ///
    /// Missing, unreadable and malformed payloads all leave the manager
    /// signed out. The stored payload is left as is; the next login
    /// overwrites it.
    pub async fn restore_on_start(&mut self) -> AccessContext {
        self.active = match self.store.load().await {
            Ok(Some(payload)) => match Session::from_json(&payload) {
                Ok(session) => {
                    tracing::info!(
                        email = %session.identity().email_address,
                        role = %session.role(),
                        "Restored session"
                    );
                    Some(Arc::new(session))
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Stored session is malformed, starting signed out");
                    None
                }
            },
            Ok(None) => {
                tracing::debug!("No stored session");
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not read stored session, starting signed out");
                None
            }
        };
        self.restored = true;
        self.access()
    }

    /// Persist `session` and make it active, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be persisted. The previously
    /// active session, if any, stays active.
    pub async fn login(&mut self, session: Session) -> Result<AccessContext, SessionError> {
        let payload = session.to_json()?;
        self.store.save(&payload).await?;

        tracing::info!(
            email = %session.identity().email_address,
            role = %session.role(),
            modules = session.permissions().len(),
            "Session established"
        );
        self.active = Some(Arc::new(session));
        self.restored = true;
        Ok(self.access())
    }

    /// Replace the active session with one carrying fresh permissions.
    ///
    /// # Errors
    ///
    /// Same as [`SessionManager::login`].
    pub async fn refresh(&mut self, session: Session) -> Result<AccessContext, SessionError> {
        self.login(session).await
    }

    /// Drop the active session and its persisted copy.
    ///
    /// The in-memory session is cleared even when removing the persisted copy
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the persisted session cannot be removed.
    pub async fn logout(&mut self) -> Result<(), SessionError> {
        if let Some(session) = self.active.take() {
            tracing::info!(email = %session.identity().email_address, "Signing out");
        }
        self.restored = true;
        self.store.clear().await?;
        Ok(())
    }

    /// Access context for the active session.
    #[must_use]
    pub fn access(&self) -> AccessContext {
        match &self.active {
            Some(session) if self.restored => AccessContext::for_session(Arc::clone(session)),
            _ => AccessContext::anonymous(),
        }
    }

    /// Whether the stored session has been read (or superseded by a login
    /// or logout).
    #[must_use]
    pub const fn is_restored(&self) -> bool {
        self.restored
    }

    /// The active session.
    #[must_use]
    pub fn current(&self) -> Option<&Session> {
        self.active.as_deref()
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use stockroom_core::access::{ModuleGate, PermissionMap};
    use stockroom_core::{EmailAddress, Identity, UserRole};

    use super::*;
    use crate::storage::{FileSessionStore, MemorySessionStore};

    fn session(role: UserRole) -> Session {
        let identity = Identity::new(EmailAddress::parse("jorge@stockroom.io").unwrap(), "Jorge");
        let permissions = PermissionMap::new()
            .with("products", ModuleGate::actions([("view", true), ("edit", false)]));
        Session::new(identity, role, permissions)
    }

    #[tokio::test]
    async fn test_access_is_anonymous_before_restore() {
        let store = MemorySessionStore::with_payload(session(UserRole::Admin).to_json().unwrap());
        let mut manager = SessionManager::new(store);

        assert!(!manager.is_restored());
        assert!(!manager.access().is_authenticated());

        let access = manager.restore_on_start().await;
        assert!(manager.is_restored());
        assert!(access.can_view("products"));
        assert!(access.is_role(UserRole::Admin));
    }

    #[tokio::test]
    async fn test_restore_without_stored_session() {
        let mut manager = SessionManager::new(MemorySessionStore::new());
        let access = manager.restore_on_start().await;
        assert!(!access.is_authenticated());
        assert!(manager.is_restored());
    }

    #[tokio::test]
    async fn test_restore_malformed_payload_is_signed_out() {
        for payload in ["", "not json", "{\"role\":\"admin\"}", "[]"] {
            let mut manager = SessionManager::new(MemorySessionStore::with_payload(payload));
            let access = manager.restore_on_start().await;
            assert!(!access.is_authenticated(), "payload {payload:?}");
            assert!(manager.current().is_none());
        }
    }

    #[tokio::test]
    async fn test_login_overwrites_and_persists() {
        let mut manager = SessionManager::new(MemorySessionStore::new());
        manager.restore_on_start().await;

        manager.login(session(UserRole::Admin)).await.unwrap();
        let access = manager.login(session(UserRole::Investor)).await.unwrap();
        assert!(access.is_role(UserRole::Investor));

        let stored = manager.store().load().await.unwrap().unwrap();
        let stored = Session::from_json(&stored).unwrap();
        assert_eq!(stored.role(), UserRole::Investor);
    }

    #[tokio::test]
    async fn test_login_storage_failure_keeps_previous_state() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file").unwrap();

        let mut manager = SessionManager::new(FileSessionStore::new(&blocker));
        manager.restore_on_start().await;

        let err = manager.login(session(UserRole::Admin)).await.unwrap_err();
        assert!(matches!(err, SessionError::Storage(_)));
        assert!(!manager.access().is_authenticated());
    }

    #[tokio::test]
    async fn test_logout_clears_memory_and_storage() {
        let mut manager = SessionManager::new(MemorySessionStore::new());
        manager.login(session(UserRole::SuperAdmin)).await.unwrap();
        let before = manager.access();

        manager.logout().await.unwrap();
        assert!(!manager.access().is_authenticated());
        assert!(manager.store().load().await.unwrap().is_none());

        // Contexts handed out earlier keep the session they were built with.
        assert!(before.is_role(UserRole::SuperAdmin));
    }

    #[tokio::test]
    async fn test_logout_storage_failure_still_signs_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileSessionStore::new(dir.path());
        let session_path = store.path();

        let mut manager = SessionManager::new(store);
        manager.login(session(UserRole::Admin)).await.unwrap();

        // Swap the session file for a non-empty directory so removal fails.
        std::fs::remove_file(&session_path).unwrap();
        std::fs::create_dir(&session_path).unwrap();
        std::fs::write(session_path.join("occupied"), "x").unwrap();

        let err = manager.logout().await.unwrap_err();
        assert!(matches!(err, SessionError::Storage(_)));
        assert!(!manager.access().is_authenticated());
        assert!(manager.current().is_none());
    }

    #[tokio::test]
    async fn test_refresh_replaces_permissions() {
        let mut manager = SessionManager::new(MemorySessionStore::new());
        let access = manager.login(session(UserRole::Admin)).await.unwrap();
        assert!(!access.has_permission("products", "edit"));

        let identity = Identity::new(EmailAddress::parse("jorge@stockroom.io").unwrap(), "Jorge");
        let widened = Session::new(
            identity,
            UserRole::Admin,
            PermissionMap::defaults_for(UserRole::Admin),
        );
        let access = manager.refresh(widened).await.unwrap();
        assert!(access.has_permission("products", "edit"));
    }
}
