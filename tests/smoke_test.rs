use station_ledger::{
    core::{
        storage::{RecordStore, StationDataset},
        AggregationService, NormalizationService, NormalizeOptions,
    },
    domain::{Loan, RecordDraft, Station},
    init,
    storage::JsonDatasetStorage,
};
use tempfile::tempdir;

#[test]
fn normalize_aggregate_and_persist_smoke() {
    init();

    let mut dataset = StationDataset::new("Smoke");
    dataset.stations.push(Station::new(7, "Ring Road").with_rate(240.0));
    dataset.loans.push(Loan::new("Supplier", 10_000.0));

    let mut draft: RecordDraft = serde_json::from_str(
        r#"{"date": "15-03-2024", "stationId": "7", "totalSaleKgs": "420.5",
            "netSale": 98000,
            "expenditures": [{"category": "generator_diesel_lube", "subcategory": "Diesel", "amount": 1500}],
            "nozzleReadings": [{"nozzleNumber": 1, "openingScreen": 10, "closingScreen": 430.5}]}"#,
    )
    .unwrap();
    NormalizationService::prefill_rate(&mut draft, &dataset.directory());
    let normalized = NormalizationService::normalize(&draft, &NormalizeOptions::default()).unwrap();
    assert!(normalized.is_clean());

    let record = normalized.into_record();
    assert_eq!(record.rate_per_kg, Some(240.0));
    assert_eq!(record.total_expenditure, Some(1_500.0));
    assert_eq!(
        record.expenditures[0].category.as_deref(),
        Some("generator-diesel-lube")
    );
    assert_eq!(record.expenditures[0].subcategory.as_deref(), Some("diesel"));
    dataset.insert_record(record).unwrap();

    let report = AggregationService::aggregate(&dataset.records);
    assert_eq!(report.monthly.len(), 1);
    assert_eq!(report.monthly[0].month.to_string(), "2024-03");

    let dir = tempdir().unwrap();
    let storage = JsonDatasetStorage::under_root(dir.path()).unwrap();
    storage.save_dataset("Smoke", &dataset).unwrap();
    let loaded = storage.load_dataset("Smoke").unwrap();
    assert_eq!(loaded, dataset);
    assert_eq!(loaded.loans[0].remaining_loan_amount(), 10_000.0);
}
