//! Reporting folds over an already-scoped record collection.

use std::collections::{BTreeMap, HashMap};

use station_domain::{
    AggregateReport, CategoryTotal, CumulativePoint, DailyRecord, MonthKey, MonthlyBucket,
    SaleTotals, StationTotal,
};
use tracing::debug;

use crate::derive::total_expenditure;

/// Stateless reporting entry points. None of them fail: records that cannot be
/// placed in a bucket are skipped for that bucket only.
pub struct AggregationService;

impl AggregationService {
    pub fn aggregate<'a, I>(records: I) -> AggregateReport
    where
        I: IntoIterator<Item = &'a DailyRecord>,
    {
        let mut months: BTreeMap<MonthKey, Accumulator> = BTreeMap::new();
        let mut categories: HashMap<String, f64> = HashMap::new();
        let mut stations = StationFold::default();
        let mut skipped_undated = 0usize;

        for record in records {
            match record.month() {
                Some(month) => months.entry(month).or_default().add(record),
                None => skipped_undated += 1,
            }
            add_categories(&mut categories, record);
            stations.add(record);
        }

        let monthly = finish_months(months);
        let cumulative = Self::cumulative_series(&monthly);
        let report = AggregateReport {
            monthly,
            category_totals: finish_categories(categories),
            station_totals: stations.finish(),
            cumulative,
            skipped_undated,
        };
        debug!(
            months = report.monthly.len(),
            categories = report.category_totals.len(),
            stations = report.station_totals.len(),
            skipped_undated,
            "aggregated records"
        );
        report
    }

    /// Buckets dated records by calendar month, ascending.
    pub fn monthly_series<'a, I>(records: I) -> Vec<MonthlyBucket>
    where
        I: IntoIterator<Item = &'a DailyRecord>,
    {
        let mut months: BTreeMap<MonthKey, Accumulator> = BTreeMap::new();
        for record in records {
            match record.month() {
                Some(month) => months.entry(month).or_default().add(record),
                None => debug!(id = ?record.id, "undated record left out of monthly series"),
            }
        }
        finish_months(months)
    }

    /// Expenditure per category tag across the whole scope, sorted by tag.
    /// Lines without a category are ignored.
    pub fn category_totals<'a, I>(records: I) -> Vec<CategoryTotal>
    where
        I: IntoIterator<Item = &'a DailyRecord>,
    {
        let mut categories = HashMap::new();
        for record in records {
            add_categories(&mut categories, record);
        }
        finish_categories(categories)
    }

    /// CNG sale per station id in order of first appearance.
    pub fn station_totals<'a, I>(records: I) -> Vec<StationTotal>
    where
        I: IntoIterator<Item = &'a DailyRecord>,
    {
        let mut stations = StationFold::default();
        for record in records {
            stations.add(record);
        }
        stations.finish()
    }

    /// Running net-sale total over a month-sorted series.
    pub fn cumulative_series(monthly: &[MonthlyBucket]) -> Vec<CumulativePoint> {
        let mut running = 0.0;
        monthly
            .iter()
            .map(|bucket| {
                running += bucket.totals.net_sale;
                CumulativePoint {
                    month: bucket.month,
                    cumulative_net_sale: running,
                }
            })
            .collect()
    }

    /// Totals for a single month. An empty bucket is returned when no record
    /// falls in `month`.
    pub fn summarize_month<'a, I>(records: I, month: MonthKey) -> MonthlyBucket
    where
        I: IntoIterator<Item = &'a DailyRecord>,
    {
        let mut acc = Accumulator::default();
        for record in records
            .into_iter()
            .filter(|record| record.month() == Some(month))
        {
            acc.add(record);
        }
        acc.finish(month)
    }
}

#[derive(Default)]
struct Accumulator {
    totals: SaleTotals,
}

impl Accumulator {
    fn add(&mut self, record: &DailyRecord) {
        let totals = &mut self.totals;
        totals.total_sale_kgs += record.total_sale_kgs.unwrap_or(0.0);
        totals.total_cng_sale += record.total_cng_sale.unwrap_or(0.0);
        totals.other_revenue += record.other_revenue.unwrap_or(0.0);
        totals.depositable += record.depositable.unwrap_or(0.0);
        totals.deposited += record.deposited.unwrap_or(0.0);
        totals.withdrawal += record.withdrawal.unwrap_or(0.0);
        totals.net_sale += record.net_sale.unwrap_or(0.0);
        totals.total_expenditure += total_expenditure(&record.expenditures);
        totals.record_count += 1;
    }

    fn finish(self, month: MonthKey) -> MonthlyBucket {
        MonthlyBucket::from_totals(month, self.totals)
    }
}

#[derive(Default)]
struct StationFold {
    order: Vec<i64>,
    totals: HashMap<i64, f64>,
}

impl StationFold {
    fn add(&mut self, record: &DailyRecord) {
        let Some(station_id) = record.station_id else {
            return;
        };
        if !self.totals.contains_key(&station_id) {
            self.order.push(station_id);
        }
        *self.totals.entry(station_id).or_insert(0.0) += record.total_cng_sale.unwrap_or(0.0);
    }

    fn finish(self) -> Vec<StationTotal> {
        self.order
            .into_iter()
            .map(|station_id| StationTotal {
                station_id,
                total_cng_sale: self.totals.get(&station_id).copied().unwrap_or(0.0),
            })
            .collect()
    }
}

fn add_categories(categories: &mut HashMap<String, f64>, record: &DailyRecord) {
    for line in &record.expenditures {
        let Some(category) = line.category.as_deref() else {
            continue;
        };
        *categories.entry(category.to_string()).or_insert(0.0) += line.amount.unwrap_or(0.0);
    }
}

fn finish_months(months: BTreeMap<MonthKey, Accumulator>) -> Vec<MonthlyBucket> {
    months
        .into_iter()
        .map(|(month, acc)| acc.finish(month))
        .collect()
}

fn finish_categories(categories: HashMap<String, f64>) -> Vec<CategoryTotal> {
    let mut totals: Vec<CategoryTotal> = categories
        .into_iter()
        .map(|(category, amount)| CategoryTotal { category, amount })
        .collect();
    totals.sort_by(|a, b| a.category.cmp(&b.category));
    totals
}
