//! Cross-checks between independently entered figures on a record.
//!
//! Findings are advisory. A discrepancy never blocks saving or aggregating a
//! record.

use std::collections::HashSet;

use station_domain::{
    DailyRecord, Discrepancy, Gauge, NozzleReading, RecordDiscrepancy, MAX_NOZZLE_NUMBER,
};
use tracing::debug;

use crate::derive::total_expenditure;

/// Default allowed absolute difference between compared figures.
pub const DEFAULT_TOLERANCE: f64 = 0.5;

pub struct ReconciliationService;

impl ReconciliationService {
    pub fn check_record(record: &DailyRecord, tolerance: f64) -> Vec<Discrepancy> {
        let tolerance = tolerance.abs();
        let mut found = Vec::new();

        if let Some(declared) = record.total_expenditure {
            let itemized = total_expenditure(&record.expenditures);
            if exceeds(declared, itemized, tolerance) {
                found.push(Discrepancy::ExpenditureMismatch { declared, itemized });
            }
        }

        check_nozzle_layout(&record.nozzle_readings, &mut found);
        for reading in &record.nozzle_readings {
            for gauge in [Gauge::Girary, Gauge::Screen] {
                if let (Some(opening), Some(closing)) = reading.pair(gauge) {
                    if closing < opening {
                        found.push(Discrepancy::MeterRegression {
                            nozzle: reading.nozzle_number,
                            gauge,
                            opening,
                            closing,
                        });
                    }
                }
            }
        }

        if let (Some(declared), Some((gauge, metered))) =
            (record.total_sale_kgs, nozzle_throughput(&record.nozzle_readings))
        {
            if exceeds(metered, declared, tolerance) {
                found.push(Discrepancy::NozzleThroughputMismatch {
                    gauge,
                    metered,
                    declared,
                });
            }
        }

        if let (Some(opening), Some(closing)) =
            (record.sngpl_meter_opening, record.sngpl_meter_closing)
        {
            if closing < opening {
                found.push(Discrepancy::SngplMeterRegression { opening, closing });
            } else if let Some(declared) = record.total_sale_kgs {
                let metered = closing - opening;
                if exceeds(metered, declared, tolerance) {
                    found.push(Discrepancy::SngplThroughputMismatch { metered, declared });
                }
            }
        }

        found
    }

    /// Checks every record, tagging each finding with the record it came from.
    pub fn check_all<'a, I>(records: I, tolerance: f64) -> Vec<RecordDiscrepancy>
    where
        I: IntoIterator<Item = &'a DailyRecord>,
    {
        let mut findings = Vec::new();
        let mut checked = 0usize;
        for record in records {
            checked += 1;
            findings.extend(Self::check_record(record, tolerance).into_iter().map(
                |discrepancy| RecordDiscrepancy {
                    record_id: record.id,
                    station_id: record.station_id,
                    date: record.date,
                    discrepancy,
                },
            ));
        }
        debug!(checked, findings = findings.len(), "reconciled records");
        findings
    }
}

fn exceeds(left: f64, right: f64, tolerance: f64) -> bool {
    (left - right).abs() > tolerance
}

fn check_nozzle_layout(readings: &[NozzleReading], found: &mut Vec<Discrepancy>) {
    let mut seen = HashSet::new();
    let mut duplicates = HashSet::new();
    for number in readings.iter().filter_map(|reading| reading.nozzle_number) {
        if !(1..=MAX_NOZZLE_NUMBER).contains(&number) {
            found.push(Discrepancy::UnknownNozzle { nozzle: number });
        }
        if !seen.insert(number) && duplicates.insert(number) {
            found.push(Discrepancy::DuplicateNozzle { nozzle: number });
        }
    }
}

/// Summed nozzle throughput. Screen readings are preferred; girary readings
/// are used when no nozzle has a complete screen pair.
fn nozzle_throughput(readings: &[NozzleReading]) -> Option<(Gauge, f64)> {
    [Gauge::Screen, Gauge::Girary].into_iter().find_map(|gauge| {
        let mut values = readings
            .iter()
            .filter_map(|reading| reading.throughput(gauge))
            .peekable();
        values.peek()?;
        Some((gauge, values.sum()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use station_domain::{ExpenditureCategory, ExpenditureLine};

    fn record() -> DailyRecord {
        DailyRecord::new(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), 1)
    }

    #[test]
    fn consistent_record_has_no_findings() {
        let mut rec = record()
            .with_expenditure(ExpenditureLine::new(ExpenditureCategory::Kitchen, 200.0))
            .with_nozzle(NozzleReading::new(1).with_screen(100.0, 160.0))
            .with_nozzle(NozzleReading::new(2).with_screen(50.0, 90.0));
        rec.total_expenditure = Some(200.0);
        rec.total_sale_kgs = Some(100.0);
        assert!(ReconciliationService::check_record(&rec, DEFAULT_TOLERANCE).is_empty());
    }

    #[test]
    fn stale_declared_expenditure_is_flagged() {
        let mut rec =
            record().with_expenditure(ExpenditureLine::new(ExpenditureCategory::General, 300.0));
        rec.total_expenditure = Some(250.0);
        let found = ReconciliationService::check_record(&rec, DEFAULT_TOLERANCE);
        assert_eq!(
            found,
            vec![Discrepancy::ExpenditureMismatch {
                declared: 250.0,
                itemized: 300.0
            }]
        );
    }

    #[test]
    fn meter_regression_is_reported_per_gauge() {
        let rec = record().with_nozzle(
            NozzleReading::new(3)
                .with_girary(9_990.0, 15.0)
                .with_screen(10.0, 20.0),
        );
        let found = ReconciliationService::check_record(&rec, DEFAULT_TOLERANCE);
        assert!(found.contains(&Discrepancy::MeterRegression {
            nozzle: Some(3),
            gauge: Gauge::Girary,
            opening: 9_990.0,
            closing: 15.0
        }));
    }

    #[test]
    fn girary_is_used_when_screen_is_missing() {
        let mut rec = record().with_nozzle(NozzleReading::new(1).with_girary(0.0, 80.0));
        rec.total_sale_kgs = Some(100.0);
        let found = ReconciliationService::check_record(&rec, DEFAULT_TOLERANCE);
        assert_eq!(
            found,
            vec![Discrepancy::NozzleThroughputMismatch {
                gauge: Gauge::Girary,
                metered: 80.0,
                declared: 100.0
            }]
        );
    }

    #[test]
    fn duplicate_and_unknown_nozzles() {
        let rec = record()
            .with_nozzle(NozzleReading::new(2).with_screen(0.0, 1.0))
            .with_nozzle(NozzleReading::new(2).with_screen(1.0, 2.0))
            .with_nozzle(NozzleReading::new(8).with_screen(0.0, 1.0));
        let found = ReconciliationService::check_record(&rec, DEFAULT_TOLERANCE);
        assert!(found.contains(&Discrepancy::DuplicateNozzle { nozzle: 2 }));
        assert!(found.contains(&Discrepancy::UnknownNozzle { nozzle: 8 }));
    }

    #[test]
    fn sngpl_meter_checks() {
        let mut rec = record();
        rec.sngpl_meter_opening = Some(500.0);
        rec.sngpl_meter_closing = Some(620.0);
        rec.total_sale_kgs = Some(100.0);
        let found = ReconciliationService::check_all([&rec], DEFAULT_TOLERANCE);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].station_id, Some(1));
        assert_eq!(
            found[0].discrepancy,
            Discrepancy::SngplThroughputMismatch {
                metered: 120.0,
                declared: 100.0
            }
        );
    }
}
