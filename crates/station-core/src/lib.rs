//! station-core
//!
//! Normalization, derivation, aggregation, filtering, and reconciliation for station records.
//! Depends on station-domain. No CLI, no terminal I/O, no direct storage interactions.

pub mod aggregate;
pub mod derive;
pub mod error;
pub mod filter;
pub mod normalize;
pub mod public_api;
pub mod reconcile;
pub mod storage;

pub use aggregate::*;
pub use derive::*;
pub use error::{CoreError, ValidationError};
pub use filter::*;
pub use normalize::*;
pub use reconcile::*;

#[cfg(test)]
mod tests;
