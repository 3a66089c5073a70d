//! station-domain
//!
//! Pure domain models (DailyRecord, ExpenditureLine, NozzleReading, Station, Loan, Employee, reports).
//! No I/O, no CLI, no storage. Only data types and core enums.

pub mod access;
pub mod category;
pub mod common;
pub mod draft;
pub mod employee;
pub mod loan;
pub mod record;
pub mod report;
pub mod station;

pub use access::*;
pub use category::*;
pub use common::*;
pub use draft::*;
pub use employee::*;
pub use loan::*;
pub use record::*;
pub use report::*;
pub use station::*;
