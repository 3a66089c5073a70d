use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use station_domain::{DailyRecord, Employee, Loan, Station, StationDirectory};
use tracing::debug;

use crate::{CoreError, NormalizedRecord, RecordEditor};

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// Everything one deployment tracks: stations, their daily records, loans, and staff.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StationDataset {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub stations: Vec<Station>,
    #[serde(default)]
    pub records: Vec<DailyRecord>,
    #[serde(default)]
    pub loans: Vec<Loan>,
    #[serde(default)]
    pub employees: Vec<Employee>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_schema_version() -> u32 {
    CURRENT_SCHEMA_VERSION
}

impl StationDataset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema_version: CURRENT_SCHEMA_VERSION,
            name: name.into(),
            stations: Vec::new(),
            records: Vec::new(),
            loans: Vec::new(),
            employees: Vec::new(),
            updated_at: None,
        }
    }

    pub fn directory(&self) -> StationDirectory {
        StationDirectory::new(self.stations.iter().cloned())
    }

    pub fn touch(&mut self) {
        self.updated_at = Some(Utc::now());
    }

    /// Next free record id.
    pub fn next_record_id(&self) -> Result<i64, CoreError> {
        next_id(self.records.iter().filter_map(|record| record.id), "record")
    }

    pub fn next_loan_id(&self) -> Result<i64, CoreError> {
        next_id(self.loans.iter().filter_map(|loan| loan.id), "loan")
    }

    pub fn next_employee_id(&self) -> Result<i64, CoreError> {
        next_id(self.employees.iter().filter_map(|employee| employee.id), "employee")
    }

    /// Appends `record` and returns its id. A carried id is kept only while it is
    /// unused; a missing or colliding id is replaced with the next free one.
    pub fn insert_record(&mut self, mut record: DailyRecord) -> Result<i64, CoreError> {
        let id = match record.id {
            Some(id) if !self.records.iter().any(|existing| existing.id == Some(id)) => id,
            Some(id) => {
                let fresh = self.next_record_id()?;
                debug!(carried = id, assigned = fresh, "record id already in use; reassigned");
                fresh
            }
            None => self.next_record_id()?,
        };
        record.id = Some(id);
        self.records.push(record);
        Ok(id)
    }

    pub fn record(&self, id: i64) -> Option<&DailyRecord> {
        self.records.iter().find(|record| record.id == Some(id))
    }

    fn record_position(&self, id: i64) -> Result<usize, CoreError> {
        self.records
            .iter()
            .position(|record| record.id == Some(id))
            .ok_or(CoreError::RecordNotFound(id))
    }

    /// Swaps the stored record `id` for a freshly normalized one, keeping the id.
    /// Returns the previous version.
    pub fn replace_record(
        &mut self,
        id: i64,
        normalized: NormalizedRecord,
    ) -> Result<DailyRecord, CoreError> {
        let idx = self.record_position(id)?;
        let mut record = normalized.into_record();
        record.id = Some(id);
        Ok(std::mem::replace(&mut self.records[idx], record))
    }

    /// Runs `edit` against a working copy of record `id`. The copy replaces the
    /// stored record only when `edit` succeeds.
    pub fn edit_record<T, F>(&mut self, id: i64, edit: F) -> Result<T, CoreError>
    where
        F: FnOnce(&mut RecordEditor) -> Result<T, CoreError>,
    {
        let idx = self.record_position(id)?;
        let mut editor = RecordEditor::new(self.records[idx].clone());
        let outcome = edit(&mut editor)?;
        self.records[idx] = editor.into_record();
        Ok(outcome)
    }

    pub fn remove_record(&mut self, id: i64) -> Result<DailyRecord, CoreError> {
        let idx = self.record_position(id)?;
        Ok(self.records.remove(idx))
    }

    /// Appends `employee` under the next free id and returns it.
    pub fn add_employee(&mut self, mut employee: Employee) -> Result<i64, CoreError> {
        let id = self.next_employee_id()?;
        employee.id = Some(id);
        self.employees.push(employee);
        Ok(id)
    }

    pub fn employee_mut(&mut self, id: i64) -> Option<&mut Employee> {
        self.employees
            .iter_mut()
            .find(|employee| employee.id == Some(id))
    }
}

/// One past the largest id in use, starting at 1.
fn next_id(ids: impl Iterator<Item = i64>, kind: &'static str) -> Result<i64, CoreError> {
    ids.max()
        .unwrap_or(0)
        .max(0)
        .checked_add(1)
        .ok_or(CoreError::IdsExhausted(kind))
}

impl Default for StationDataset {
    fn default() -> Self {
        Self::new("")
    }
}

/// Describes a persisted backup artifact for a dataset.
#[derive(Debug, Clone)]
pub struct DatasetBackupInfo {
    pub dataset: String,
    pub id: String,
    pub created_at: String,
    pub path: PathBuf,
}

/// Abstraction over persistence backends capable of storing datasets and backups.
pub trait RecordStore: Send + Sync {
    fn save_dataset(&self, name: &str, dataset: &StationDataset) -> Result<(), CoreError>;
    fn load_dataset(&self, name: &str) -> Result<StationDataset, CoreError>;
    fn list_datasets(&self) -> Result<Vec<String>, CoreError>;
    fn delete_dataset(&self, name: &str) -> Result<(), CoreError>;
    fn save_dataset_to_path(&self, dataset: &StationDataset, path: &Path) -> Result<(), CoreError>;
    fn load_dataset_from_path(&self, path: &Path) -> Result<StationDataset, CoreError>;
    fn backup_dataset(
        &self,
        name: &str,
        dataset: &StationDataset,
        note: Option<&str>,
    ) -> Result<DatasetBackupInfo, CoreError>;
    fn list_backups(&self, name: &str) -> Result<Vec<DatasetBackupInfo>, CoreError>;
    fn restore_backup(&self, backup: &DatasetBackupInfo) -> Result<StationDataset, CoreError>;
}

/// Detects dangling station references and duplicate ids within a dataset snapshot.
pub fn dataset_warnings(dataset: &StationDataset) -> Vec<String> {
    let station_ids: HashSet<i64> = dataset.stations.iter().map(|s| s.id).collect();
    let mut seen_records = HashSet::new();
    let mut seen_stations = HashSet::new();
    let mut warnings = Vec::new();

    for station in &dataset.stations {
        if !seen_stations.insert(station.id) {
            warnings.push(format!("station id {} is used more than once", station.id));
        }
    }

    for (idx, record) in dataset.records.iter().enumerate() {
        let label = match record.id {
            Some(id) => format!("record {id}"),
            None => format!("record #{idx}"),
        };
        match record.station_id {
            Some(station) if !station_ids.contains(&station) => {
                warnings.push(format!("{label} references unknown station {station}"));
            }
            None => warnings.push(format!("{label} has no station")),
            _ => {}
        }
        if record.date.is_none() {
            warnings.push(format!("{label} has no date"));
        }
        if let Some(id) = record.id {
            if !seen_records.insert(id) {
                warnings.push(format!("record id {id} is used more than once"));
            }
        }
    }

    for employee in &dataset.employees {
        let label = match employee.id {
            Some(id) => format!("employee {id} ({})", employee.name),
            None => format!("employee `{}`", employee.name),
        };
        match employee.station_id {
            Some(station) if !station_ids.contains(&station) => {
                warnings.push(format!("{label} references unknown station {station}"));
            }
            None => warnings.push(format!("{label} has no station")),
            _ => {}
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use station_domain::{ExpenditureCategory, ExpenditureLine};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn normalized(record: DailyRecord) -> NormalizedRecord {
        NormalizedRecord {
            record,
            warnings: Vec::new(),
        }
    }

    #[test]
    fn warnings_flag_dangling_stations_and_duplicate_ids() {
        let mut dataset = StationDataset::new("demo");
        dataset.stations.push(Station::new(1, "Main"));
        dataset.insert_record(DailyRecord::new(day(), 1)).unwrap();
        let mut orphan = DailyRecord::new(day(), 9);
        orphan.id = Some(1);
        dataset.records.push(orphan);

        let warnings = dataset_warnings(&dataset);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("unknown station 9"));
        assert!(warnings[1].contains("record id 1"));
    }

    #[test]
    fn warnings_flag_employees_at_unknown_stations() {
        let mut dataset = StationDataset::new("staff");
        dataset.stations.push(Station::new(1, "Main"));
        dataset.add_employee(Employee::new("Sajid", 1)).unwrap();
        dataset.add_employee(Employee::new("Imran", 4)).unwrap();

        let warnings = dataset_warnings(&dataset);
        assert_eq!(warnings, vec!["employee 2 (Imran) references unknown station 4"]);
    }

    #[test]
    fn inserted_records_get_sequential_ids() {
        let mut dataset = StationDataset::default();
        assert_eq!(dataset.insert_record(DailyRecord::new(day(), 1)).unwrap(), 1);
        assert_eq!(dataset.insert_record(DailyRecord::new(day(), 1)).unwrap(), 2);
    }

    #[test]
    fn colliding_carried_ids_are_reassigned() {
        let mut dataset = StationDataset::default();
        let mut first = DailyRecord::new(day(), 1);
        first.id = Some(7);
        assert_eq!(dataset.insert_record(first.clone()).unwrap(), 7);
        assert_eq!(dataset.insert_record(first).unwrap(), 8);

        let ids: Vec<_> = dataset.records.iter().filter_map(|record| record.id).collect();
        assert_eq!(ids, vec![7, 8]);
        assert!(dataset_warnings(&dataset).iter().all(|w| !w.contains("more than once")));
    }

    #[test]
    fn id_allocation_fails_instead_of_overflowing() {
        let mut dataset = StationDataset::default();
        let mut last = DailyRecord::new(day(), 1);
        last.id = Some(i64::MAX);
        dataset.records.push(last);
        assert!(matches!(
            dataset.next_record_id(),
            Err(CoreError::IdsExhausted("record"))
        ));
        assert!(dataset.insert_record(DailyRecord::new(day(), 1)).is_err());
        assert_eq!(dataset.records.len(), 1);

        let mut loan = Loan::new("Supplier", 1.0);
        loan.id = Some(i64::MAX);
        dataset.loans.push(loan);
        assert!(dataset.next_loan_id().is_err());
        assert_eq!(dataset.next_employee_id().unwrap(), 1);
    }

    #[test]
    fn replace_keeps_id_and_remove_returns_the_record() {
        let mut dataset = StationDataset::default();
        let id = dataset.insert_record(DailyRecord::new(day(), 1)).unwrap();
        let mut edited = DailyRecord::new(day(), 2);
        edited.id = Some(99);
        edited.net_sale = Some(400.0);

        let previous = dataset.replace_record(id, normalized(edited)).unwrap();
        assert_eq!(previous.station_id, Some(1));
        assert_eq!(dataset.record(id).unwrap().station_id, Some(2));
        assert_eq!(dataset.record(id).unwrap().id, Some(id));
        assert!(dataset.record(99).is_none());

        assert!(matches!(
            dataset.replace_record(42, normalized(DailyRecord::default())),
            Err(CoreError::RecordNotFound(42))
        ));

        let removed = dataset.remove_record(id).unwrap();
        assert_eq!(removed.net_sale, Some(400.0));
        assert!(dataset.records.is_empty());
        assert!(matches!(dataset.remove_record(id), Err(CoreError::RecordNotFound(_))));
    }

    #[test]
    fn failed_edits_leave_the_record_untouched() {
        let mut dataset = StationDataset::default();
        let record = DailyRecord::new(day(), 1)
            .with_expenditure(ExpenditureLine::new(ExpenditureCategory::Kitchen, 50.0));
        let id = dataset.insert_record(record).unwrap();

        let total = dataset
            .edit_record(id, |editor| {
                editor.set_line_amount(0, Some(80.0))?;
                Ok(editor.total_expenditure())
            })
            .unwrap();
        assert_eq!(total, 80.0);
        assert_eq!(dataset.record(id).unwrap().total_expenditure, Some(80.0));

        let failed = dataset.edit_record(id, |editor| {
            editor.set_line_amount(0, Some(10.0))?;
            editor.set_line_amount(5, Some(10.0))
        });
        assert!(matches!(failed, Err(CoreError::LineNotFound(5))));
        assert_eq!(dataset.record(id).unwrap().expenditures[0].amount, Some(80.0));
    }
}
