//! Stockroom runtime library.
//!
//! Wires the pure types of `stockroom-core` to the outside world:
//!
//! - [`config`] - Environment configuration
//! - [`telemetry`] - Tracing subscriber and Sentry
//! - [`storage`] / [`session`] - Persisted session and its lifecycle
//! - [`db`] / [`services`] - Profile lookup and sign-in
//! - [`setup`] - Backend bootstrap checklist with `PostgreSQL` probes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod services;
pub mod session;
pub mod setup;
pub mod storage;
pub mod telemetry;

pub use config::{AppConfig, ConfigError, LogFormat};
pub use error::AppError;
pub use session::{SessionError, SessionManager};
pub use storage::{FileSessionStore, MemorySessionStore, SESSION_STORAGE_KEY, SessionStore};
