use station_core::{
    storage::dataset_warnings, AggregationService, RecordScope, ReconciliationService, StationRef,
};
use station_domain::{ExpenditureCategory, MonthKey, SaleTotals};

use super::key_values;
use crate::cli::context::{CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::{ArgKind, CommandEntry};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new(
            "filter",
            "Show or set the record filter",
            "filter [month=YYYY-MM] [year=YYYY] [station=<id>]",
            cmd_filter,
        )
        .with_args(&[ArgKind::FilterTerm]),
        CommandEntry::new(
            "clear-filter",
            "Remove every filter criterion",
            "clear-filter",
            cmd_clear_filter,
        ),
        CommandEntry::new(
            "report",
            "Monthly totals, grand totals, and cumulative net sale",
            "report",
            cmd_report,
        ),
        CommandEntry::new(
            "categories",
            "Expenditure totals per category",
            "categories",
            cmd_categories,
        ),
        CommandEntry::new(
            "station-totals",
            "CNG sale per station",
            "station-totals",
            cmd_station_totals,
        ),
        CommandEntry::new(
            "month",
            "Summary of a single calendar month",
            "month <YYYY-MM>",
            cmd_month,
        ),
        CommandEntry::new(
            "check",
            "Reconcile declared totals against itemized and metered figures",
            "check",
            cmd_check,
        ),
        CommandEntry::new(
            "warnings",
            "Report dangling references in the dataset",
            "warnings",
            cmd_warnings,
        ),
    ]
}

fn cmd_filter(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    if args.is_empty() {
        output::info(format!("Filter: {}", context.scope));
        if context.access.is_station_bound() {
            output::info(format!("Effective: {}", context.effective_scope()?));
        }
        return Ok(());
    }

    let mut scope = context.scope.clone();
    for (key, value) in key_values(args) {
        match key.as_str() {
            "month" => {
                if !value.is_empty() {
                    value.parse::<MonthKey>().map_err(|err| {
                        CommandError::InvalidArguments(format!("month: {err}"))
                    })?;
                }
                scope.month = Some(value.to_string());
            }
            "year" => scope.year = Some(value.to_string()),
            "station" => scope.station_id = Some(StationRef::from(value)),
            other => {
                return Err(CommandError::InvalidArguments(format!(
                    "unknown filter `{other}`; expected month, year, or station"
                )))
            }
        }
    }

    context.scope = scope;
    output::success(format!("Filter: {}", context.scope));
    Ok(())
}

fn cmd_clear_filter(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    context.scope = RecordScope::default();
    output::success("Filter cleared.");
    Ok(())
}

fn totals_row(label: String, totals: &SaleTotals, currency: &str) -> Vec<String> {
    vec![
        label,
        totals.record_count.to_string(),
        format!("{:.2}", totals.total_sale_kgs),
        output::money(totals.total_cng_sale, currency),
        output::money(totals.other_revenue, currency),
        output::money(totals.total_expenditure, currency),
        output::money(totals.net_sale, currency),
        output::money(totals.profit(), currency),
    ]
}

const TOTALS_HEADERS: [&str; 8] = [
    "Month",
    "Records",
    "Kg",
    "CNG sale",
    "Other revenue",
    "Expenditure",
    "Net sale",
    "Profit",
];

fn cmd_report(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let currency = context.currency().to_string();
    let scope = context.effective_scope()?;
    let records = context.scoped_records()?;
    let report = AggregationService::aggregate(records.iter().copied());

    output::section(format!("Report ({scope})"));
    if report.monthly.is_empty() {
        output::info("No dated records match the active filter.");
    } else {
        let mut rows: Vec<Vec<String>> = report
            .monthly
            .iter()
            .map(|bucket| totals_row(bucket.month.to_string(), &bucket.totals, &currency))
            .collect();
        rows.push(totals_row("Total".into(), &report.totals(), &currency));
        output::table(&TOTALS_HEADERS, &rows);

        output::section("Cumulative net sale");
        let rows: Vec<Vec<String>> = report
            .cumulative
            .iter()
            .map(|point| {
                vec![
                    point.month.to_string(),
                    output::money(point.cumulative_net_sale, &currency),
                ]
            })
            .collect();
        output::table(&["Month", "Cumulative"], &rows);
    }

    if report.skipped_undated > 0 {
        output::warning(format!(
            "{} undated record(s) left out of the monthly series.",
            report.skipped_undated
        ));
    }
    Ok(())
}

fn cmd_categories(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let currency = context.currency().to_string();
    let records = context.scoped_records()?;
    let totals = AggregationService::category_totals(records.iter().copied());
    if totals.is_empty() {
        output::info("No categorized expenditure in scope.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = totals
        .iter()
        .map(|entry| {
            let label = ExpenditureCategory::from_tag(&entry.category)
                .map(|category| category.label().to_string())
                .unwrap_or_else(|| "(unlisted)".into());
            vec![
                entry.category.clone(),
                label,
                output::money(entry.amount, &currency),
            ]
        })
        .collect();
    output::section("Expenditure by category");
    output::table(&["Category", "Label", "Amount"], &rows);
    Ok(())
}

fn cmd_station_totals(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let currency = context.currency().to_string();
    let directory = context.dataset()?.directory();
    let records = context.scoped_records()?;
    let totals = AggregationService::station_totals(records.iter().copied());
    if totals.is_empty() {
        output::info("No station records in scope.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = totals
        .iter()
        .map(|entry| {
            vec![
                entry.station_id.to_string(),
                directory.name_of(entry.station_id),
                output::money(entry.total_cng_sale, &currency),
            ]
        })
        .collect();
    output::section("CNG sale by station");
    output::table(&["Id", "Station", "CNG sale"], &rows);
    Ok(())
}

fn cmd_month(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some(raw) = args.first() else {
        return Err(CommandError::InvalidArguments("usage: month <YYYY-MM>".into()));
    };
    let month: MonthKey = raw
        .parse()
        .map_err(|err| CommandError::InvalidArguments(format!("{err}")))?;

    let currency = context.currency().to_string();
    let records = context.scoped_records()?;
    let bucket = AggregationService::summarize_month(records.iter().copied(), month);

    output::section(format!("Month {month}"));
    output::table(
        &TOTALS_HEADERS,
        &[totals_row(month.to_string(), &bucket.totals, &currency)],
    );
    output::info(format!("  Depositable : {}", output::money(bucket.totals.depositable, &currency)));
    output::info(format!("  Deposited   : {}", output::money(bucket.totals.deposited, &currency)));
    output::info(format!("  Withdrawal  : {}", output::money(bucket.totals.withdrawal, &currency)));
    Ok(())
}

fn cmd_check(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let tolerance = context.config.reconciliation_tolerance;
    let records = context.scoped_records()?;
    let checked = records.len();
    let findings = ReconciliationService::check_all(records.iter().copied(), tolerance);

    if findings.is_empty() {
        output::success(format!("{checked} record(s) reconcile within {tolerance}."));
        return Ok(());
    }

    let rows: Vec<Vec<String>> = findings
        .iter()
        .map(|finding| {
            vec![
                finding
                    .record_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".into()),
                finding
                    .date
                    .map(|date| date.to_string())
                    .unwrap_or_else(|| "-".into()),
                finding
                    .station_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".into()),
                finding.discrepancy.to_string(),
            ]
        })
        .collect();
    output::section("Discrepancies");
    output::table(&["Record", "Date", "Station", "Finding"], &rows);
    output::warning(format!(
        "{} finding(s) across {checked} record(s).",
        findings.len()
    ));
    Ok(())
}

fn cmd_warnings(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let warnings = dataset_warnings(context.dataset()?);
    if warnings.is_empty() {
        output::success("No dataset warnings.");
        return Ok(());
    }
    for warning in warnings {
        output::warning(warning);
    }
    Ok(())
}
