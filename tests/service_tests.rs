use chrono::NaiveDate;
use station_ledger::core::{
    public_api::{api_aggregate, api_filter_records, api_normalize, api_reconcile},
    AggregationService, NormalizeOptions, RecordScope, ValidationError, DEFAULT_TOLERANCE,
};
use station_ledger::domain::{
    AccessContext, DailyRecord, Discrepancy, ExpenditureCategory, ExpenditureLine, Gauge,
    MonthKey, NozzleReading, RecordDraft,
};

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn sample_records() -> Vec<DailyRecord> {
    let mut records = Vec::new();
    for (date, station, net) in [
        (day(2024, 1, 3), 1, 1_000.0),
        (day(2024, 1, 9), 2, 2_000.0),
        (day(2024, 2, 1), 1, 500.0),
        (day(2023, 12, 31), 2, 250.0),
    ] {
        let mut record = DailyRecord::new(date, station)
            .with_expenditure(ExpenditureLine::new(ExpenditureCategory::Salary, 100.0))
            .with_expenditure(ExpenditureLine::new(ExpenditureCategory::Kitchen, 25.0));
        record.net_sale = Some(net);
        record.total_cng_sale = Some(net * 2.0);
        record.total_expenditure = Some(125.0);
        records.push(record);
    }
    records
}

#[test]
fn manager_scope_limits_aggregates_to_own_station() {
    let records = sample_records();
    let scope = RecordScope::default()
        .with_station(1_i64)
        .restrict_to(&AccessContext::manager(2))
        .unwrap();

    let report = api_aggregate(&records, &scope);
    assert_eq!(report.station_totals.len(), 1);
    assert_eq!(report.station_total(2), Some(4_500.0));
    assert_eq!(report.station_total(1), None);
    assert_eq!(
        report.monthly.iter().map(|b| b.month.to_string()).collect::<Vec<_>>(),
        vec!["2023-12", "2024-01"]
    );
}

#[test]
fn manager_without_station_is_denied() {
    let mut ctx = AccessContext::manager(1);
    ctx.station_id = None;
    assert!(RecordScope::for_context(&ctx).is_err());
}

#[test]
fn month_and_year_filters_compose() {
    let records = sample_records();
    let scope = RecordScope::default().with_year("2024").with_month("2024-01");
    let filtered = api_filter_records(&records, &scope);
    assert_eq!(filtered.len(), 2);

    let blank = RecordScope::default().with_month("  ").with_year("");
    assert_eq!(api_filter_records(&records, &blank).len(), records.len());
}

#[test]
fn monthly_buckets_partition_dated_records() {
    let mut records = sample_records();
    let mut undated = DailyRecord::default();
    undated.station_id = Some(1);
    undated.net_sale = Some(10_000.0);
    records.push(undated);

    let report = AggregationService::aggregate(&records);
    let counted: usize = report.monthly.iter().map(|b| b.totals.record_count).sum();
    assert_eq!(counted, 4);
    assert_eq!(report.skipped_undated, 1);
    assert_eq!(report.station_total(1), Some(3_000.0));

    let last = report.cumulative.last().unwrap();
    assert_eq!(last.cumulative_net_sale, 3_750.0);
    assert_eq!(report.category_total("salary"), Some(400.0));

    let january = report.month(MonthKey::new(2024, 1).unwrap()).unwrap();
    assert_eq!(january.totals.net_sale, 3_000.0);
}

#[test]
fn strict_normalization_rejects_text_amounts() {
    let draft: RecordDraft = serde_json::from_str(
        r#"{"stationId": 1, "date": "2024-01-01", "totalSaleKgs": "lots"}"#,
    )
    .unwrap();

    let lenient = api_normalize(&draft, &NormalizeOptions::default()).unwrap();
    assert_eq!(lenient.record.total_sale_kgs, None);
    assert_eq!(lenient.warnings.len(), 1);

    let strict = api_normalize(&draft, &NormalizeOptions::strict());
    assert!(matches!(strict, Err(ValidationError::InvalidNumeric { .. })));
}

#[test]
fn reconcile_reports_nozzle_and_expenditure_findings() {
    let mut record = DailyRecord::new(day(2024, 3, 1), 1)
        .with_expenditure(ExpenditureLine::new(ExpenditureCategory::General, 40.0))
        .with_nozzle(NozzleReading::new(1).with_screen(100.0, 160.0))
        .with_nozzle(NozzleReading::new(2).with_screen(50.0, 90.0));
    record.total_expenditure = Some(45.0);
    record.total_sale_kgs = Some(100.0);

    let clean = api_reconcile(&[record.clone()], &RecordScope::default(), DEFAULT_TOLERANCE);
    assert_eq!(clean.len(), 1);
    assert!(matches!(
        clean[0].discrepancy,
        Discrepancy::ExpenditureMismatch { declared, itemized } if declared == 45.0 && itemized == 40.0
    ));

    record.total_sale_kgs = Some(80.0);
    let findings = api_reconcile(&[record], &RecordScope::default(), DEFAULT_TOLERANCE);
    assert!(findings.iter().any(|finding| matches!(
        finding.discrepancy,
        Discrepancy::NozzleThroughputMismatch { gauge: Gauge::Screen, .. }
    )));
}
