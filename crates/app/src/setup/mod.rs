//! Backend setup checklist.
//!
//! [`catalog`] lists the bootstrap steps; [`probes`] checks them against the
//! database's system catalogs.

pub mod catalog;
pub mod probes;

pub use catalog::{default_steps, manual_steps, step_ids, tracker};
pub use probes::{CatalogObject, CatalogProbe};
