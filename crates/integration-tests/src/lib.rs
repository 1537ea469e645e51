//! Integration tests for Stockroom.
//!
//! # Running Tests
//!
//! ```bash
//! # Tests that need no database
//! cargo test -p stockroom-integration-tests
//!
//! # Database probe tests (needs STOCKROOM_TEST_DATABASE_URL)
//! cargo test -p stockroom-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `session_lifecycle` - Login, restore and logout through the file store
//! - `setup_tracker` - Setup catalog driven by scripted probes
//! - `database_probes` - Catalog probes against a live `PostgreSQL`

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use stockroom_core::{
    EmailAddress, Identity, PermissionMap, ProbeError, Session, StepProbe, UserRole,
};

/// Environment variable naming the database used by ignored tests.
pub const TEST_DATABASE_URL_VAR: &str = "STOCKROOM_TEST_DATABASE_URL";

/// A session for `email` with `role` and the given permissions.
///
/// # Panics
///
/// Panics if `email` is not a valid address.
#[must_use]
#[allow(clippy::unwrap_used)]
pub fn session(email: &str, role: UserRole, permissions: PermissionMap) -> Session {
    let email = EmailAddress::parse(email).unwrap();
    let name = email.mailbox().to_owned();
    Session::new(Identity::new(email, name), role, permissions)
}

/// What a [`ScriptedProbe`] answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Satisfied,
    NotSatisfied,
    Fault,
}

/// Probe with a fixed answer that counts how often it was asked.
#[derive(Debug)]
pub struct ScriptedProbe {
    outcome: Outcome,
    calls: AtomicUsize,
}

impl ScriptedProbe {
    #[must_use]
    pub fn new(outcome: Outcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            calls: AtomicUsize::new(0),
        })
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StepProbe for ScriptedProbe {
    async fn check(&self) -> Result<bool, ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.outcome {
            Outcome::Satisfied => Ok(true),
            Outcome::NotSatisfied => Ok(false),
            Outcome::Fault => Err(ProbeError::new("connection reset by peer")),
        }
    }
}
