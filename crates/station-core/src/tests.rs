use chrono::NaiveDate;

use crate::{
    aggregate::AggregationService,
    derive::{DerivationService, RecordEditor},
    filter::{filter_records, RecordScope},
    normalize::{NormalizationService, NormalizeOptions},
    public_api::{api_aggregate, api_remaining_loan},
};
use station_domain::{
    DailyRecord, ExpenditureCategory, ExpenditureLine, Loan, MonthKey, RecordDraft,
};

const JANUARY_DRAFTS: &str = r#"[
    {"date": "2024-01-05", "stationId": 1, "totalSaleKgs": 100, "netSale": 5000,
     "Expenditures": [{"category": "kitchen", "amount": 200}]},
    {"date": "2024-01-20", "stationId": 1, "totalSaleKgs": 150, "netSale": 7000,
     "Expenditures": [{"category": "kitchen", "amount": 300}]}
]"#;

fn normalize_all(json: &str) -> Vec<DailyRecord> {
    let drafts: Vec<RecordDraft> = serde_json::from_str(json).expect("drafts");
    drafts
        .iter()
        .map(|draft| {
            NormalizationService::normalize(draft, &NormalizeOptions::default())
                .expect("normalize")
                .into_record()
        })
        .collect()
}

fn mixed_records() -> Vec<DailyRecord> {
    let day = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap();
    let mut records = Vec::new();
    for (idx, (date, station, kgs, net)) in [
        (day(2023, 12, 30), 2, 80.0, 4_000.0),
        (day(2024, 1, 5), 1, 100.0, 5_000.0),
        (day(2024, 2, 1), 2, 90.0, 4_500.0),
        (day(2024, 1, 20), 1, 150.0, 7_000.0),
        (day(2024, 3, 3), 3, 60.0, 0.0),
    ]
    .into_iter()
    .enumerate()
    {
        let mut record = DailyRecord::new(date, station)
            .with_expenditure(ExpenditureLine::new(ExpenditureCategory::General, 10.0 * idx as f64));
        record.total_sale_kgs = Some(kgs);
        record.total_cng_sale = Some(net + 500.0);
        record.net_sale = Some(net);
        records.push(record);
    }
    records
}

#[test]
fn january_scenario_aggregates_into_one_bucket() {
    let records = normalize_all(JANUARY_DRAFTS);
    let report = AggregationService::aggregate(&records);

    assert_eq!(report.monthly.len(), 1);
    let bucket = &report.monthly[0];
    assert_eq!(bucket.month.to_string(), "2024-01");
    assert_eq!(bucket.totals.total_sale_kgs, 250.0);
    assert_eq!(bucket.totals.net_sale, 12_000.0);
    assert_eq!(bucket.totals.total_expenditure, 500.0);
    assert_eq!(bucket.profit, 11_500.0);

    assert_eq!(report.category_totals.len(), 1);
    assert_eq!(report.category_total("kitchen"), Some(500.0));

    assert_eq!(report.cumulative.len(), 1);
    assert_eq!(report.cumulative[0].cumulative_net_sale, 12_000.0);
}

#[test]
fn aggregation_ignores_stale_stored_expenditure() {
    let mut records = normalize_all(JANUARY_DRAFTS);
    records[0].total_expenditure = Some(99_999.0);
    let bucket = AggregationService::summarize_month(&records, "2024-01".parse().unwrap());
    assert_eq!(bucket.totals.total_expenditure, 500.0);
    assert_eq!(bucket.totals.record_count, 2);
}

#[test]
fn undated_records_still_count_for_categories_and_stations() {
    let mut records = normalize_all(JANUARY_DRAFTS);
    let mut undated = records[0].clone();
    undated.date = None;
    undated.station_id = Some(42);
    undated.total_cng_sale = Some(1_000.0);
    records.push(undated);

    let report = AggregationService::aggregate(&records);
    assert_eq!(report.skipped_undated, 1);
    assert_eq!(report.month("2024-01".parse().unwrap()).unwrap().totals.record_count, 2);
    assert_eq!(report.category_total("kitchen"), Some(700.0));
    assert_eq!(report.station_total(42), Some(1_000.0));
}

#[test]
fn unknown_categories_bucket_by_raw_tag_and_absent_ones_are_ignored() {
    let record = DailyRecord::new(NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(), 1)
        .with_expenditure(ExpenditureLine {
            category: Some("fuel-card".into()),
            amount: Some(75.0),
            ..ExpenditureLine::default()
        })
        .with_expenditure(ExpenditureLine {
            description: Some("misc".into()),
            amount: Some(25.0),
            ..ExpenditureLine::default()
        });
    let totals = AggregationService::category_totals([&record]);
    assert_eq!(totals.len(), 1);
    assert_eq!(totals[0].category, "fuel-card");
    assert_eq!(totals[0].amount, 75.0);
}

#[test]
fn normalization_is_idempotent() {
    let drafts: Vec<RecordDraft> = serde_json::from_str(
        r#"[
            {"date": "05-01-2024", "stationId": "3", "totalSaleKgs": "12.5", "remarks": "  ok ",
             "Expenditures": [
                {"description": "", "category": "", "amount": ""},
                {"description": "tea", "category": "Kitchen", "subcategory": "Groceries", "amount": "40"},
                {"category": "diesel", "subcategory": "bad", "amount": 10}
             ],
             "NozzleReadings": [
                {"nozzleNumber": "1", "opening": "10", "closing": "25"},
                {"nozzleNumber": 2}
             ]},
            {"stationId": 1, "netSale": "abc", "totalDailyExpenditure": 900}
        ]"#,
    )
    .unwrap();

    let options = NormalizeOptions::default();
    for draft in &drafts {
        let once = NormalizationService::normalize(draft, &options).unwrap().record;
        let twice = NormalizationService::renormalize(&once, &options).unwrap();
        assert_eq!(twice.record, once);
        assert!(twice.is_clean());
    }
}

#[test]
fn derived_total_matches_line_sum() {
    for record in mixed_records() {
        let mut stale = record.clone();
        stale.total_expenditure = Some(-1.0);
        let derived = DerivationService::derive_totals(&stale);
        let expected: f64 = record.expenditures.iter().filter_map(|l| l.amount).sum();
        assert_eq!(derived.total_expenditure, Some(expected));
    }
}

#[test]
fn filter_returns_a_subset_and_empty_scope_returns_everything() {
    let records = mixed_records();
    let all = filter_records(&records, &RecordScope::default());
    assert_eq!(all.len(), records.len());
    assert!(all.iter().zip(&records).all(|(hit, original)| *hit == original));

    let scope = RecordScope::default().with_year("2024").with_station("1");
    let hits = filter_records(&records, &scope);
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().all(|hit| records.contains(hit)));
}

#[test]
fn monthly_buckets_partition_dated_records() {
    let records = mixed_records();
    let monthly = AggregationService::monthly_series(&records);
    let bucketed: usize = monthly.iter().map(|bucket| bucket.totals.record_count).sum();
    assert_eq!(bucketed, records.len());

    let bucket_kgs: f64 = monthly.iter().map(|bucket| bucket.totals.total_sale_kgs).sum();
    let record_kgs: f64 = records.iter().filter_map(|r| r.total_sale_kgs).sum();
    assert!((bucket_kgs - record_kgs).abs() < 1e-9);

    let months: Vec<MonthKey> = monthly.iter().map(|bucket| bucket.month).collect();
    let mut sorted = months.clone();
    sorted.sort();
    assert_eq!(months, sorted);
    assert_eq!(months[0].to_string(), "2023-12");
}

#[test]
fn cumulative_series_never_decreases_for_non_negative_sales() {
    let report = AggregationService::aggregate(&mixed_records());
    assert!(report
        .cumulative
        .windows(2)
        .all(|pair| pair[1].cumulative_net_sale >= pair[0].cumulative_net_sale));
    let last = report.cumulative.last().unwrap();
    assert_eq!(last.cumulative_net_sale, report.totals().net_sale);
}

#[test]
fn station_totals_keep_first_encounter_order() {
    let totals = AggregationService::station_totals(&mixed_records());
    let order: Vec<i64> = totals.iter().map(|t| t.station_id).collect();
    assert_eq!(order, vec![2, 1, 3]);
    assert_eq!(totals[0].total_cng_sale, 4_500.0 + 5_000.0);
}

#[test]
fn scoped_aggregate_for_station_string() {
    let records = mixed_records();
    let report = api_aggregate(&records, &RecordScope::default().with_station("2"));
    assert_eq!(report.station_totals.len(), 1);
    assert_eq!(report.station_totals[0].station_id, 2);
    assert_eq!(report.monthly.len(), 2);
}

#[test]
fn subcategory_reset_through_editor() {
    let record = DailyRecord::new(NaiveDate::from_ymd_opt(2024, 1, 5).unwrap(), 1)
        .with_expenditure(
            ExpenditureLine::new(ExpenditureCategory::Kitchen, 120.0).with_subcategory("utensils"),
        );
    let mut editor = RecordEditor::new(record);
    editor.set_line_category(0, Some("general")).unwrap();
    let line = &editor.record().expenditures[0];
    assert_eq!(line.category.as_deref(), Some("general"));
    assert_eq!(line.subcategory, None);
    assert_eq!(editor.total_expenditure(), 120.0);
}

#[test]
fn remaining_loan_is_computed_on_read() {
    let mut loan = Loan::new("Ahmed", 10_000.0);
    assert_eq!(api_remaining_loan(&loan), 10_000.0);
    loan.record_return(4_000.0, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
    assert_eq!(api_remaining_loan(&loan), 6_000.0);
}
