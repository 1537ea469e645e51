//! Core types for Stockroom.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod role;

pub use email::{EmailAddress, EmailError};
pub use role::{RoleParseError, UserRole};
