//! Stable, public-facing helpers that wrap the internal service layer.
//!
//! Frontends (CLI, import tooling) call these instead of the individual services.

use station_domain::{AggregateReport, DailyRecord, Loan, RecordDiscrepancy, RecordDraft};

use crate::{
    aggregate::AggregationService,
    derive::DerivationService,
    filter::{filter_records, RecordScope},
    normalize::{NormalizationService, NormalizeOptions, NormalizedRecord},
    reconcile::ReconciliationService,
    ValidationError,
};

/// Normalizes a draft before it is persisted.
pub fn api_normalize(
    draft: &RecordDraft,
    options: &NormalizeOptions,
) -> Result<NormalizedRecord, ValidationError> {
    NormalizationService::normalize(draft, options)
}

/// Returns the record with `total_expenditure` recomputed from its lines.
pub fn api_derive_totals(record: &DailyRecord) -> DailyRecord {
    DerivationService::derive_totals(record)
}

pub fn api_filter_records<'a>(
    records: &'a [DailyRecord],
    scope: &RecordScope,
) -> Vec<&'a DailyRecord> {
    filter_records(records, scope)
}

/// Filters `records` to `scope` and aggregates the result.
pub fn api_aggregate(records: &[DailyRecord], scope: &RecordScope) -> AggregateReport {
    AggregationService::aggregate(filter_records(records, scope))
}

pub fn api_reconcile(
    records: &[DailyRecord],
    scope: &RecordScope,
    tolerance: f64,
) -> Vec<RecordDiscrepancy> {
    ReconciliationService::check_all(filter_records(records, scope), tolerance)
}

pub fn api_remaining_loan(loan: &Loan) -> f64 {
    DerivationService::remaining_loan_amount(loan)
}
