use std::{fs, path::PathBuf};

use chrono::{Local, NaiveDate};
use serde_json::Value;
use station_core::{
    storage::{RecordStore, StationDataset},
    DerivationService, NormalizationService,
};
use station_domain::{parse_numeric, parse_record_date, Loan, LoanType, RecordDraft, Station};

use crate::cli::context::{CommandError, CommandResult, ShellContext};
use crate::cli::output;
use crate::cli::registry::{ArgKind, CommandEntry};

pub(crate) fn definitions() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("new", "Start an empty dataset", "new <name>", cmd_new),
        CommandEntry::new(
            "load",
            "Load a dataset by name or from a JSON file",
            "load <name|path.json>",
            cmd_load,
        )
        .with_args(&[ArgKind::Dataset]),
        CommandEntry::new(
            "save",
            "Save the current dataset by name or to a JSON file",
            "save [name|path.json]",
            cmd_save,
        )
        .with_args(&[ArgKind::Dataset]),
        CommandEntry::new(
            "datasets",
            "List datasets in the data directory",
            "datasets",
            cmd_datasets,
        ),
        CommandEntry::new("stations", "List stations", "stations", cmd_stations),
        CommandEntry::new(
            "add-station",
            "Add a station with an optional gas rate per kg",
            "add-station <id> <name> [rate]",
            cmd_add_station,
        )
        .admin_only(),
        CommandEntry::new(
            "records",
            "List daily records within the active filter",
            "records",
            cmd_records,
        ),
        CommandEntry::new(
            "import",
            "Normalize and add record drafts from a JSON file",
            "import <drafts.json>",
            cmd_import,
        ),
        CommandEntry::new("loans", "List loans and outstanding balances", "loans", cmd_loans),
        CommandEntry::new(
            "add-loan",
            "Record a loan taken or given",
            "add-loan <person> <amount> [taken|given]",
            cmd_add_loan,
        ),
        CommandEntry::new(
            "loan-return",
            "Record a repayment against a loan",
            "loan-return <loan-id> <amount> [YYYY-MM-DD]",
            cmd_loan_return,
        )
        .with_args(&[ArgKind::LoanId]),
    ]
}

fn looks_like_path(value: &str) -> bool {
    value.contains('/') || value.contains('\\') || value.to_ascii_lowercase().ends_with(".json")
}

fn cmd_new(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let name = args.join(" ");
    let name = name.trim();
    if name.is_empty() {
        return Err(CommandError::InvalidArguments("usage: new <name>".into()));
    }
    let mut dataset = StationDataset::new(name);
    dataset.touch();
    context.set_dataset(dataset, Some(name.to_string()), None);
    output::success(format!("Started dataset `{name}`."));
    Ok(())
}

fn cmd_load(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some(target) = args.first() else {
        return Err(CommandError::InvalidArguments(
            "usage: load <name|path.json>".into(),
        ));
    };

    if looks_like_path(target) {
        let path = PathBuf::from(target);
        let dataset = context.storage.load_dataset_from_path(&path)?;
        let count = dataset.records.len();
        context.set_dataset(dataset, None, Some(path.clone()));
        output::success(format!("Loaded {count} record(s) from {}.", path.display()));
        return Ok(());
    }

    let dataset = context.storage.load_dataset(target)?;
    let count = dataset.records.len();
    context.set_dataset(dataset, Some(target.to_string()), None);
    context.config.last_opened_dataset = Some(target.to_string());
    context.persist_config()?;
    output::success(format!("Loaded dataset `{target}` ({count} record(s))."));
    Ok(())
}

fn cmd_save(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let target = args.first().map(|value| value.to_string());
    let path = match &target {
        Some(value) if looks_like_path(value) => Some(PathBuf::from(value)),
        Some(_) => None,
        None => context.dataset_path.clone(),
    };

    if let Some(path) = path {
        let dataset = context.dataset_mut()?;
        dataset.touch();
        let snapshot = dataset.clone();
        context.storage.save_dataset_to_path(&snapshot, &path)?;
        context.dataset_path = Some(path.clone());
        output::success(format!("Dataset saved to {}.", path.display()));
        return Ok(());
    }

    let name = target
        .or_else(|| context.dataset_name.clone())
        .ok_or_else(|| CommandError::InvalidArguments("usage: save <name>".into()))?;
    let dataset = context.dataset_mut()?;
    dataset.touch();
    if dataset.name.is_empty() {
        dataset.name = name.clone();
    }
    let snapshot = dataset.clone();
    context.storage.save_dataset(&name, &snapshot)?;
    context.dataset_name = Some(name.clone());
    context.dataset_path = None;
    context.config.last_opened_dataset = Some(name.clone());
    context.persist_config()?;
    output::success(format!("Dataset `{name}` saved."));
    Ok(())
}

fn cmd_datasets(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let summaries = context.storage.summaries()?;
    if summaries.is_empty() {
        output::info("No saved datasets.");
        return Ok(());
    }
    let currency = context.currency().to_string();
    let rows: Vec<Vec<String>> = summaries
        .iter()
        .map(|summary| {
            vec![
                summary.slug.clone(),
                summary.name.clone(),
                summary.station_count.to_string(),
                summary.record_count.to_string(),
                summary.loan_count.to_string(),
                summary.employee_count.to_string(),
                output::money(summary.total_net_sale, &currency),
                summary
                    .updated_at
                    .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".into()),
            ]
        })
        .collect();
    output::section("Datasets");
    output::table(
        &[
            "Slug", "Name", "Stations", "Records", "Loans", "Staff", "Net sale", "Updated",
        ],
        &rows,
    );
    Ok(())
}

fn cmd_stations(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let currency = context.currency().to_string();
    let dataset = context.dataset()?;
    if dataset.stations.is_empty() {
        output::info("No stations defined. Use `add-station` to create one.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = dataset
        .stations
        .iter()
        .map(|station| {
            vec![
                station.id.to_string(),
                station.name.clone(),
                station.location.clone().unwrap_or_else(|| "-".into()),
                station
                    .gas_rate_per_kg
                    .map(|rate| output::money(rate, &currency))
                    .unwrap_or_else(|| "-".into()),
            ]
        })
        .collect();
    output::section("Stations");
    output::table(&["Id", "Name", "Location", "Rate / kg"], &rows);
    Ok(())
}

fn cmd_add_station(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    const USAGE: &str = "usage: add-station <id> <name> [rate]";
    if args.len() < 2 {
        return Err(CommandError::InvalidArguments(USAGE.into()));
    }
    let id: i64 = args[0]
        .trim()
        .parse()
        .map_err(|_| CommandError::InvalidArguments(USAGE.into()))?;

    let (name_parts, rate) = match args[2..].last().and_then(|last| parse_numeric(last)) {
        Some(rate) if args.len() > 2 => (&args[1..args.len() - 1], Some(rate)),
        _ => (&args[1..], None),
    };
    let name = name_parts.join(" ");

    let dataset = context.dataset_mut()?;
    if dataset.stations.iter().any(|station| station.id == id) {
        return Err(CommandError::Message(format!("station {id} already exists")));
    }
    let mut station = Station::new(id, name.clone());
    station.gas_rate_per_kg = rate;
    dataset.stations.push(station);
    dataset.touch();
    output::success(format!("Added station {id} `{name}`."));
    Ok(())
}

fn cmd_records(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let currency = context.currency().to_string();
    let directory = context.dataset()?.directory();
    let records = context.scoped_records()?;
    if records.is_empty() {
        output::info("No records match the active filter.");
        return Ok(());
    }
    let rows: Vec<Vec<String>> = records
        .iter()
        .map(|record| {
            let amount = |value: Option<f64>| {
                value
                    .map(|value| output::money(value, &currency))
                    .unwrap_or_else(|| "-".into())
            };
            vec![
                record.id.map(|id| id.to_string()).unwrap_or_else(|| "-".into()),
                record
                    .date
                    .map(|date| date.to_string())
                    .unwrap_or_else(|| "-".into()),
                record
                    .station_id
                    .map(|id| directory.name_of(id))
                    .unwrap_or_else(|| "-".into()),
                record
                    .total_sale_kgs
                    .map(|kgs| format!("{kgs:.2}"))
                    .unwrap_or_else(|| "-".into()),
                amount(record.total_cng_sale),
                amount(record.total_expenditure),
                amount(record.net_sale),
            ]
        })
        .collect();
    output::section(format!("Records ({})", rows.len()));
    output::table(
        &["Id", "Date", "Station", "Kg", "CNG sale", "Expenditure", "Net sale"],
        &rows,
    );
    Ok(())
}

pub(super) fn read_drafts(path: &str) -> Result<Vec<RecordDraft>, CommandError> {
    let contents = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&contents)?;
    let drafts = match value {
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<RecordDraft>, _>>()?,
        other => vec![serde_json::from_value(other)?],
    };
    Ok(drafts)
}

fn cmd_import(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    let Some(path) = args.first() else {
        return Err(CommandError::InvalidArguments(
            "usage: import <drafts.json>".into(),
        ));
    };
    let drafts = read_drafts(path)?;
    let options = context.config.normalize_options();
    let access = context.access;
    let dataset = context.dataset_mut()?;
    let directory = dataset.directory();

    let mut imported = 0usize;
    let mut rejected = 0usize;
    for (idx, mut draft) in drafts.into_iter().enumerate() {
        NormalizationService::prefill_rate(&mut draft, &directory);
        let normalized = match NormalizationService::normalize(&draft, &options) {
            Ok(normalized) => normalized,
            Err(err) => {
                output::warning(format!("Draft #{}: {err}", idx + 1));
                rejected += 1;
                continue;
            }
        };
        for warning in &normalized.warnings {
            output::warning(format!("Draft #{}: {warning}", idx + 1));
        }

        let record = normalized.into_record();
        if access.is_station_bound() && record.station_id != access.station_id {
            output::warning(format!(
                "Draft #{}: station is outside the active role's scope",
                idx + 1
            ));
            rejected += 1;
            continue;
        }
        dataset.insert_record(record)?;
        imported += 1;
    }
    dataset.touch();

    output::success(format!("Imported {imported} record(s)."));
    if rejected > 0 {
        output::warning(format!("{rejected} draft(s) were not imported."));
    }
    Ok(())
}

fn cmd_loans(context: &mut ShellContext, _args: &[&str]) -> CommandResult {
    let currency = context.currency().to_string();
    let dataset = context.dataset()?;
    if dataset.loans.is_empty() {
        output::info("No loans recorded.");
        return Ok(());
    }
    let amount = |value: Option<f64>| output::money(value.unwrap_or(0.0), &currency);
    let rows: Vec<Vec<String>> = dataset
        .loans
        .iter()
        .map(|loan| {
            vec![
                loan.id.map(|id| id.to_string()).unwrap_or_else(|| "-".into()),
                loan.person_name.clone(),
                loan.loan_type.to_string(),
                amount(loan.amount),
                amount(loan.return_amount),
                output::money(DerivationService::remaining_loan_amount(loan), &currency),
                loan.status.to_string(),
            ]
        })
        .collect();
    output::section("Loans");
    output::table(
        &["Id", "Person", "Type", "Amount", "Returned", "Remaining", "Status"],
        &rows,
    );
    Ok(())
}

fn cmd_add_loan(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    const USAGE: &str = "usage: add-loan <person> <amount> [taken|given]";
    if args.len() < 2 {
        return Err(CommandError::InvalidArguments(USAGE.into()));
    }
    let amount = parse_numeric(args[1]).ok_or_else(|| CommandError::InvalidArguments(USAGE.into()))?;
    let loan_type = match args.get(2).map(|value| value.to_ascii_lowercase()) {
        None => LoanType::Taken,
        Some(value) if value == "taken" => LoanType::Taken,
        Some(value) if value == "given" => LoanType::Given,
        Some(_) => return Err(CommandError::InvalidArguments(USAGE.into())),
    };

    let dataset = context.dataset_mut()?;
    let id = dataset.next_loan_id()?;
    let mut loan = Loan::new(args[0], amount);
    loan.id = Some(id);
    loan.date = Some(Local::now().date_naive());
    loan.loan_type = loan_type;
    dataset.loans.push(loan);
    dataset.touch();
    output::success(format!("Recorded loan {id} for {}.", args[0]));
    Ok(())
}

fn cmd_loan_return(context: &mut ShellContext, args: &[&str]) -> CommandResult {
    const USAGE: &str = "usage: loan-return <loan-id> <amount> [YYYY-MM-DD]";
    if args.len() < 2 {
        return Err(CommandError::InvalidArguments(USAGE.into()));
    }
    let id: i64 = args[0]
        .trim()
        .parse()
        .map_err(|_| CommandError::InvalidArguments(USAGE.into()))?;
    let amount = parse_numeric(args[1]).ok_or_else(|| CommandError::InvalidArguments(USAGE.into()))?;
    let date: NaiveDate = match args.get(2) {
        Some(raw) => parse_record_date(raw)
            .ok_or_else(|| CommandError::InvalidArguments(USAGE.into()))?,
        None => Local::now().date_naive(),
    };

    let currency = context.currency().to_string();
    let dataset = context.dataset_mut()?;
    let loan = dataset
        .loans
        .iter_mut()
        .find(|loan| loan.id == Some(id))
        .ok_or_else(|| CommandError::Message(format!("loan {id} not found")))?;
    loan.record_return(amount, date);
    let remaining = loan.remaining_loan_amount();
    let status = loan.status;
    dataset.touch();
    output::success(format!(
        "Recorded return; remaining {} ({status}).",
        output::money(remaining, &currency)
    ));
    Ok(())
}
