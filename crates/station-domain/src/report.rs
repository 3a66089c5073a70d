//! Derived reporting structures. Recomputed on every aggregation, never persisted.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{common::MonthKey, record::Gauge};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
/// Summed figures shared by monthly buckets and grand totals.
pub struct SaleTotals {
    pub total_sale_kgs: f64,
    pub total_cng_sale: f64,
    pub other_revenue: f64,
    pub depositable: f64,
    pub deposited: f64,
    pub withdrawal: f64,
    pub net_sale: f64,
    pub total_expenditure: f64,
    pub record_count: usize,
}

impl SaleTotals {
    /// Net sale minus expenditure recomputed from line items.
    pub fn profit(&self) -> f64 {
        self.net_sale - self.total_expenditure
    }

    pub fn merge(&mut self, other: &SaleTotals) {
        self.total_sale_kgs += other.total_sale_kgs;
        self.total_cng_sale += other.total_cng_sale;
        self.other_revenue += other.other_revenue;
        self.depositable += other.depositable;
        self.deposited += other.deposited;
        self.withdrawal += other.withdrawal;
        self.net_sale += other.net_sale;
        self.total_expenditure += other.total_expenditure;
        self.record_count += other.record_count;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Records sharing one calendar month, with pre-summed fields.
pub struct MonthlyBucket {
    pub month: MonthKey,
    #[serde(flatten)]
    pub totals: SaleTotals,
    pub profit: f64,
}

impl MonthlyBucket {
    pub fn from_totals(month: MonthKey, totals: SaleTotals) -> Self {
        let profit = totals.profit();
        Self {
            month,
            totals,
            profit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryTotal {
    pub category: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StationTotal {
    pub station_id: i64,
    pub total_cng_sale: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CumulativePoint {
    pub month: MonthKey,
    pub cumulative_net_sale: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
/// Complete reporting output for one filtered record scope.
pub struct AggregateReport {
    pub monthly: Vec<MonthlyBucket>,
    pub category_totals: Vec<CategoryTotal>,
    pub station_totals: Vec<StationTotal>,
    pub cumulative: Vec<CumulativePoint>,
    /// Records left out of monthly and cumulative series for lacking a date.
    pub skipped_undated: usize,
}

impl AggregateReport {
    pub fn month(&self, month: MonthKey) -> Option<&MonthlyBucket> {
        self.monthly.iter().find(|bucket| bucket.month == month)
    }

    pub fn category_total(&self, tag: &str) -> Option<f64> {
        self.category_totals
            .iter()
            .find(|entry| entry.category == tag)
            .map(|entry| entry.amount)
    }

    pub fn station_total(&self, station_id: i64) -> Option<f64> {
        self.station_totals
            .iter()
            .find(|entry| entry.station_id == station_id)
            .map(|entry| entry.total_cng_sale)
    }

    /// Grand totals across every dated month.
    pub fn totals(&self) -> SaleTotals {
        let mut totals = SaleTotals::default();
        for bucket in &self.monthly {
            totals.merge(&bucket.totals);
        }
        totals
    }

    pub fn is_empty(&self) -> bool {
        self.monthly.is_empty() && self.category_totals.is_empty() && self.station_totals.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "camelCase")]
/// A disagreement between independently entered figures on one record.
pub enum Discrepancy {
    /// Declared total expenditure differs from the itemized sum.
    ExpenditureMismatch { declared: f64, itemized: f64 },
    /// Summed nozzle throughput differs from the declared sale volume.
    NozzleThroughputMismatch { gauge: Gauge, metered: f64, declared: f64 },
    /// A nozzle gauge closed below its opening (rollover or meter swap).
    MeterRegression {
        nozzle: Option<u8>,
        gauge: Gauge,
        opening: f64,
        closing: f64,
    },
    /// The station's main gas meter closed below its opening.
    SngplMeterRegression { opening: f64, closing: f64 },
    /// Main gas meter movement differs from the declared sale volume.
    SngplThroughputMismatch { metered: f64, declared: f64 },
    /// The same nozzle appears more than once in one record.
    DuplicateNozzle { nozzle: u8 },
    /// Nozzle number outside the fixed dispenser layout.
    UnknownNozzle { nozzle: u8 },
}

impl fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discrepancy::ExpenditureMismatch { declared, itemized } => write!(
                f,
                "declared expenditure {declared:.2} differs from itemized {itemized:.2}"
            ),
            Discrepancy::NozzleThroughputMismatch {
                gauge,
                metered,
                declared,
            } => write!(
                f,
                "{gauge} nozzle throughput {metered:.2} differs from declared sale {declared:.2} kg"
            ),
            Discrepancy::MeterRegression {
                nozzle,
                gauge,
                opening,
                closing,
            } => {
                let nozzle = nozzle
                    .map(|number| number.to_string())
                    .unwrap_or_else(|| "?".into());
                write!(
                    f,
                    "nozzle {nozzle} {gauge} closing {closing:.2} below opening {opening:.2}"
                )
            }
            Discrepancy::SngplMeterRegression { opening, closing } => write!(
                f,
                "SNGPL meter closing {closing:.2} below opening {opening:.2}"
            ),
            Discrepancy::SngplThroughputMismatch { metered, declared } => write!(
                f,
                "SNGPL meter movement {metered:.2} differs from declared sale {declared:.2} kg"
            ),
            Discrepancy::DuplicateNozzle { nozzle } => {
                write!(f, "nozzle {nozzle} recorded more than once")
            }
            Discrepancy::UnknownNozzle { nozzle } => {
                write!(f, "nozzle {nozzle} is outside the dispenser layout")
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
/// Discrepancies found on one record of a checked collection.
pub struct RecordDiscrepancy {
    pub record_id: Option<i64>,
    pub station_id: Option<i64>,
    pub date: Option<NaiveDate>,
    pub discrepancy: Discrepancy,
}
