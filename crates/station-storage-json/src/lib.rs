//! station-storage-json
//!
//! One pretty-printed JSON file per dataset, written atomically, with a bounded
//! set of rotating backups per dataset.

use std::{
    cmp::Reverse,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::{DateTime, NaiveDateTime, Utc};
use station_core::{
    storage::{DatasetBackupInfo, RecordStore, StationDataset},
    AggregationService, CoreError,
};
use tracing::{debug, info};

const FILE_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S%3f";
const BACKUP_SEPARATOR: &str = "__";
const TMP_SUFFIX: &str = "tmp";
const DEFAULT_RETENTION: usize = 5;

/// Filesystem-backed JSON persistence for datasets and their backups.
#[derive(Debug, Clone)]
pub struct JsonDatasetStorage {
    datasets_dir: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
}

/// Listing row for a stored dataset.
#[derive(Debug, Clone)]
pub struct DatasetSummary {
    pub slug: String,
    pub name: String,
    pub path: PathBuf,
    pub updated_at: Option<DateTime<Utc>>,
    pub station_count: usize,
    pub record_count: usize,
    pub loan_count: usize,
    pub employee_count: usize,
    pub total_net_sale: f64,
}

impl JsonDatasetStorage {
    pub fn new(datasets_dir: PathBuf, backups_dir: PathBuf) -> Result<Self, CoreError> {
        Self::with_retention(datasets_dir, backups_dir, DEFAULT_RETENTION)
    }

    /// Uses `<root>/datasets` and `<root>/backups`.
    pub fn under_root(root: &Path) -> Result<Self, CoreError> {
        Self::new(root.join("datasets"), root.join("backups"))
    }

    pub fn with_retention(
        datasets_dir: PathBuf,
        backups_dir: PathBuf,
        retention: usize,
    ) -> Result<Self, CoreError> {
        fs::create_dir_all(&datasets_dir)?;
        fs::create_dir_all(&backups_dir)?;
        Ok(Self {
            datasets_dir,
            backups_dir,
            retention: retention.max(1),
        })
    }

    pub fn dataset_path(&self, name: &str) -> PathBuf {
        self.datasets_dir
            .join(format!("{}.{FILE_EXTENSION}", canonical_name(name)))
    }

    pub fn summaries(&self) -> Result<Vec<DatasetSummary>, CoreError> {
        let mut rows = Vec::new();
        for slug in self.list_datasets()? {
            let dataset = self.load_dataset(&slug)?;
            let totals = AggregationService::aggregate(&dataset.records).totals();
            rows.push(DatasetSummary {
                path: self.dataset_path(&slug),
                name: if dataset.name.is_empty() {
                    slug.clone()
                } else {
                    dataset.name.clone()
                },
                slug,
                updated_at: dataset.updated_at,
                station_count: dataset.stations.len(),
                record_count: dataset.records.len(),
                loan_count: dataset.loans.len(),
                employee_count: dataset.employees.len(),
                total_net_sale: totals.net_sale,
            });
        }
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    fn backup_dir(&self, name: &str) -> PathBuf {
        self.backups_dir.join(canonical_name(name))
    }

    fn next_backup_path(&self, name: &str, note: Option<&str>) -> (String, String, PathBuf) {
        let dir = self.backup_dir(name);
        let slug = canonical_name(name);
        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let label = note.and_then(slugify);
        let mut attempt = 0;
        loop {
            let mut stem = format!("{slug}{BACKUP_SEPARATOR}{timestamp}");
            if attempt > 0 {
                stem.push_str(&format!("-{attempt}"));
            }
            if let Some(label) = &label {
                stem.push_str(BACKUP_SEPARATOR);
                stem.push_str(label);
            }
            let file_name = format!("{stem}.{FILE_EXTENSION}");
            let path = dir.join(&file_name);
            if !path.exists() {
                return (file_name, timestamp, path);
            }
            attempt += 1;
        }
    }

    fn backup_existing_file(&self, name: &str, path: &Path) -> Result<(), CoreError> {
        if !path.exists() {
            return Ok(());
        }
        fs::create_dir_all(self.backup_dir(name))?;
        let (file_name, _, backup_path) = self.next_backup_path(name, None);
        fs::copy(path, &backup_path)?;
        debug!(dataset = name, backup = %file_name, "backed up previous dataset file");
        self.prune_backups(name)
    }

    fn prune_backups(&self, name: &str) -> Result<(), CoreError> {
        for stale in self.list_backups(name)?.into_iter().skip(self.retention) {
            debug!(backup = %stale.id, "pruning backup");
            let _ = fs::remove_file(stale.path);
        }
        Ok(())
    }
}

impl RecordStore for JsonDatasetStorage {
    fn save_dataset(&self, name: &str, dataset: &StationDataset) -> Result<(), CoreError> {
        let path = self.dataset_path(name);
        self.backup_existing_file(name, &path)?;
        save_dataset_to_path(dataset, &path)?;
        info!(dataset = name, records = dataset.records.len(), path = %path.display(), "saved dataset");
        Ok(())
    }

    fn load_dataset(&self, name: &str) -> Result<StationDataset, CoreError> {
        let path = self.dataset_path(name);
        if !path.exists() {
            return Err(CoreError::DatasetNotFound(name.to_string()));
        }
        let dataset = load_dataset_from_path(&path)?;
        info!(dataset = name, records = dataset.records.len(), "loaded dataset");
        Ok(dataset)
    }

    fn list_datasets(&self) -> Result<Vec<String>, CoreError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.datasets_dir)? {
            let path = entry?.path();
            if !path.is_file() || !has_json_extension(&path) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    fn delete_dataset(&self, name: &str) -> Result<(), CoreError> {
        let path = self.dataset_path(name);
        if !path.exists() {
            return Err(CoreError::DatasetNotFound(name.to_string()));
        }
        fs::remove_file(path)?;
        info!(dataset = name, "deleted dataset");
        Ok(())
    }

    fn save_dataset_to_path(&self, dataset: &StationDataset, path: &Path) -> Result<(), CoreError> {
        if path.starts_with(&self.datasets_dir) {
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                self.backup_existing_file(stem, path)?;
            }
        }
        save_dataset_to_path(dataset, path)
    }

    fn load_dataset_from_path(&self, path: &Path) -> Result<StationDataset, CoreError> {
        load_dataset_from_path(path)
    }

    fn backup_dataset(
        &self,
        name: &str,
        dataset: &StationDataset,
        note: Option<&str>,
    ) -> Result<DatasetBackupInfo, CoreError> {
        fs::create_dir_all(self.backup_dir(name))?;
        let (file_name, created_at, path) = self.next_backup_path(name, note);
        write_file(&path, &serialize_dataset(dataset)?)?;
        self.prune_backups(name)?;
        Ok(DatasetBackupInfo {
            dataset: canonical_name(name),
            id: file_name,
            created_at,
            path,
        })
    }

    /// Newest first.
    fn list_backups(&self, name: &str) -> Result<Vec<DatasetBackupInfo>, CoreError> {
        let dir = self.backup_dir(name);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let slug = canonical_name(name);
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if !has_json_extension(&path) {
                continue;
            }
            let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            entries.push(DatasetBackupInfo {
                dataset: slug.clone(),
                id: file_name.to_string(),
                created_at: backup_stamp(file_name)
                    .map(|(digits, _)| digits)
                    .unwrap_or_default(),
                path: path.clone(),
            });
        }
        entries.sort_by_key(|info| Reverse(backup_order(&info.id)));
        Ok(entries)
    }

    fn restore_backup(&self, backup: &DatasetBackupInfo) -> Result<StationDataset, CoreError> {
        if !backup.path.exists() {
            return Err(CoreError::Storage(format!("backup `{}` not found", backup.id)));
        }
        let dataset = load_dataset_from_path(&backup.path)?;
        save_dataset_to_path(&dataset, &self.dataset_path(&backup.dataset))?;
        info!(dataset = %backup.dataset, backup = %backup.id, "restored dataset from backup");
        Ok(dataset)
    }
}

/// Saves a dataset to an arbitrary path on disk via a temporary file and rename.
pub fn save_dataset_to_path(dataset: &StationDataset, path: &Path) -> Result<(), CoreError> {
    let tmp = tmp_path(path);
    write_file(&tmp, &serialize_dataset(dataset)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn load_dataset_from_path(path: &Path) -> Result<StationDataset, CoreError> {
    let data = fs::read_to_string(path)?;
    serde_json::from_str(&data).map_err(|err| CoreError::Serde(err.to_string()))
}

/// Lowercase ASCII slug with `-` separators; never empty.
pub fn canonical_name(name: &str) -> String {
    slugify(name).unwrap_or_else(|| "dataset".into())
}

fn slugify(raw: &str) -> Option<String> {
    let mut slug = String::new();
    for ch in raw.trim().chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_end_matches('-');
    (!slug.is_empty()).then(|| slug.to_string())
}

/// Timestamp digits and collision counter from a backup file name.
fn backup_stamp(file_name: &str) -> Option<(String, u32)> {
    let stem = file_name.strip_suffix(&format!(".{FILE_EXTENSION}"))?;
    let segment = stem.split(BACKUP_SEPARATOR).nth(1)?;
    let (digits, attempt) = match segment.split_once('-') {
        Some((digits, attempt)) => (digits, attempt.parse().ok()?),
        None => (segment, 0),
    };
    (digits.len() == 17 && digits.chars().all(|c| c.is_ascii_digit()))
        .then(|| (digits.to_string(), attempt))
}

fn backup_order(file_name: &str) -> (Option<DateTime<Utc>>, u32) {
    match backup_stamp(file_name) {
        Some((digits, attempt)) => (
            NaiveDateTime::parse_from_str(&digits, BACKUP_TIMESTAMP_FORMAT)
                .ok()
                .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc)),
            attempt,
        ),
        None => (None, 0),
    }
}

fn has_json_extension(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(FILE_EXTENSION)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{existing}.{TMP_SUFFIX}"),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_file(path: &Path, data: &str) -> Result<(), CoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

fn serialize_dataset(dataset: &StationDataset) -> Result<String, CoreError> {
    serde_json::to_string_pretty(dataset).map_err(|err| CoreError::Serde(err.to_string()))
}
