//! Tab-completion candidates for command words and their arguments.

use std::collections::BTreeSet;

use station_config::Config;
use station_core::storage::StationDataset;
use station_domain::{AccessContext, ExpenditureCategory, MonthKey};

use super::registry::{arg_kind_at, ArgKind, CommandRegistry};

const FILTER_KEYS: [&str; 3] = ["month=", "year=", "station="];
const LINE_KEYS: [&str; 3] = ["category=", "subcategory=", "amount="];
const ROLES: [&str; 3] = ["admin", "partner", "manager"];

/// What the shell can offer for completion, captured before each prompt.
#[derive(Debug, Default)]
pub(crate) struct CompletionData {
    commands: Vec<(&'static str, &'static [ArgKind])>,
    datasets: Vec<String>,
    stations: Vec<String>,
    records: Vec<String>,
    loans: Vec<String>,
    employees: Vec<String>,
    months: Vec<String>,
    years: Vec<String>,
}

impl CompletionData {
    /// Snapshot of commands the role may run and of ids it may address.
    pub(crate) fn new(
        registry: &CommandRegistry,
        access: &AccessContext,
        dataset: Option<&StationDataset>,
        datasets: Vec<String>,
    ) -> Self {
        let mut data = Self {
            commands: registry
                .visible(access)
                .map(|entry| (entry.name, entry.args))
                .collect(),
            datasets,
            ..Self::default()
        };
        let Some(dataset) = dataset else {
            return data;
        };

        let in_scope =
            |station: Option<i64>| !access.is_station_bound() || station == access.station_id;
        data.stations = dataset
            .stations
            .iter()
            .filter(|station| in_scope(Some(station.id)))
            .map(|station| station.id.to_string())
            .collect();

        let mut months = BTreeSet::new();
        let mut years = BTreeSet::new();
        for record in dataset.records.iter().filter(|record| in_scope(record.station_id)) {
            if let Some(id) = record.id {
                data.records.push(id.to_string());
            }
            if let Some(date) = record.date {
                let month = MonthKey::of(date);
                years.insert(month.year().to_string());
                months.insert(month.to_string());
            }
        }
        data.months = months.into_iter().collect();
        data.years = years.into_iter().collect();

        data.loans = dataset
            .loans
            .iter()
            .filter_map(|loan| loan.id.map(|id| id.to_string()))
            .collect();
        data.employees = dataset
            .employees
            .iter()
            .filter(|employee| in_scope(employee.station_id))
            .filter_map(|employee| employee.id.map(|id| id.to_string()))
            .collect();
        data
    }

    /// Start offset of the word under the cursor and its candidates.
    pub(crate) fn complete(&self, prefix: &str) -> (usize, Vec<String>) {
        let start = prefix
            .rfind(char::is_whitespace)
            .map(|idx| idx + 1)
            .unwrap_or(0);
        let word = &prefix[start..];
        let before: Vec<&str> = prefix[..start].split_whitespace().collect();

        let Some((command, args)) = before.split_first() else {
            return (start, matching(self.commands.iter().map(|(name, _)| *name), word));
        };
        let command = command.to_ascii_lowercase();
        let Some((_, kinds)) = self.commands.iter().find(|(name, _)| *name == command) else {
            return (start, Vec::new());
        };

        let candidates = match arg_kind_at(kinds, args.len()) {
            ArgKind::Free => Vec::new(),
            ArgKind::Words(words) => matching(words.iter().copied(), word),
            ArgKind::Command => matching(self.commands.iter().map(|(name, _)| *name), word),
            ArgKind::Dataset => matching(self.datasets.iter().map(String::as_str), word),
            ArgKind::Role => matching(ROLES, word),
            ArgKind::ConfigKey => matching(Config::KEYS, word),
            ArgKind::StationId => matching(self.stations.iter().map(String::as_str), word),
            ArgKind::RecordId => matching(self.records.iter().map(String::as_str), word),
            ArgKind::LoanId => matching(self.loans.iter().map(String::as_str), word),
            ArgKind::EmployeeId => matching(self.employees.iter().map(String::as_str), word),
            ArgKind::Category => matching(category_tags(), word),
            ArgKind::FilterTerm => self.filter_term(word),
            ArgKind::LineField => line_field(args, word),
        };
        (start, candidates)
    }

    fn filter_term(&self, word: &str) -> Vec<String> {
        let Some((key, value)) = word.split_once('=') else {
            return matching(FILTER_KEYS, word);
        };
        let values: &[String] = match key.to_ascii_lowercase().as_str() {
            "month" => &self.months,
            "year" => &self.years,
            "station" => &self.stations,
            _ => return Vec::new(),
        };
        prefixed(key, matching(values.iter().map(String::as_str), value))
    }
}

/// `category=` offers tags; `subcategory=` follows an earlier `category=` on the line.
fn line_field(args: &[&str], word: &str) -> Vec<String> {
    let Some((key, value)) = word.split_once('=') else {
        return matching(LINE_KEYS, word);
    };
    match key.to_ascii_lowercase().as_str() {
        "category" => prefixed(key, matching(category_tags(), value)),
        "subcategory" => {
            let chosen = args
                .iter()
                .filter_map(|arg| arg.split_once('='))
                .filter(|(key, _)| key.eq_ignore_ascii_case("category"))
                .filter_map(|(_, tag)| ExpenditureCategory::from_tag(tag))
                .last();
            let subcategories: Vec<&str> = match chosen {
                Some(category) => category.subcategories().to_vec(),
                None => ExpenditureCategory::ALL
                    .iter()
                    .flat_map(|category| category.subcategories().iter().copied())
                    .collect(),
            };
            prefixed(key, matching(subcategories, value))
        }
        _ => Vec::new(),
    }
}

fn category_tags() -> impl Iterator<Item = &'static str> {
    ExpenditureCategory::ALL.iter().map(|category| category.tag())
}

fn matching<'a>(options: impl IntoIterator<Item = &'a str>, word: &str) -> Vec<String> {
    let needle = word.to_ascii_lowercase();
    let mut found: Vec<String> = options
        .into_iter()
        .filter(|option| option.to_ascii_lowercase().starts_with(&needle))
        .map(str::to_string)
        .collect();
    found.sort();
    found.dedup();
    found
}

fn prefixed(key: &str, values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| format!("{key}={value}"))
        .collect()
}
