//! Stockroom Core - Shared types library.
//!
//! This crate provides the types used across all Stockroom components:
//! - `app` - Runtime library (session storage, database probes, sign-in)
//! - `cli` - Command-line tools for sessions, access checks and setup
//!
//! # Architecture
//!
//! The core crate contains only types, traits and pure logic - no I/O, no
//! database access, no HTTP clients. Setup probes are injected through the
//! [`StepProbe`] trait so the tracker itself never touches the network.
//!
//! # Modules
//!
//! - [`types`] - Email addresses and user roles
//! - [`access`] - Per-module permission model and the fail-closed resolver
//! - [`session`] - The signed-in user's session
//! - [`setup`] - Ordered setup steps and their tracker

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod session;
pub mod setup;
pub mod types;

pub use access::{AccessContext, ModuleGate, PermissionMap, can_view, has_permission, is_role};
pub use session::{Identity, Session};
pub use setup::{
    ProbeError, SetupError, SetupStep, SetupSummary, SetupTracker, StepProbe, StepSnapshot,
    StepStatus,
};
pub use types::*;
