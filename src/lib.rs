#![doc(test(attr(deny(warnings))))]

//! Station Ledger aggregates and reconciles daily CNG station records:
//! normalization of entry drafts, derived totals, scoped reporting, and
//! cross-checks between meters and declared figures.

pub mod cli;
pub mod utils;

pub use station_config as config;
pub use station_core as core;
pub use station_domain as domain;
pub use station_storage_json as storage;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Station Ledger tracing initialized.");
    });
}

#[cfg(test)]
mod tests {
    #[test]
    fn init_does_not_panic() {
        super::init();
        super::init();
    }
}
