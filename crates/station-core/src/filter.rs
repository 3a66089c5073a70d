//! Scope descriptors and the record filter.

use std::fmt;

use serde::{Deserialize, Serialize};
use station_domain::{parse_numeric, AccessContext, DailyRecord};

use crate::CoreError;

/// A station criterion as it arrives from a UI control: either a number or a
/// numeric string. Compares loosely against record station ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StationRef {
    Id(i64),
    Text(String),
}

impl StationRef {
    pub fn matches(&self, station_id: i64) -> bool {
        match self {
            StationRef::Id(id) => *id == station_id,
            StationRef::Text(text) => parse_numeric(text) == Some(station_id as f64),
        }
    }

    fn is_blank(&self) -> bool {
        matches!(self, StationRef::Text(text) if text.trim().is_empty())
    }
}

impl From<i64> for StationRef {
    fn from(id: i64) -> Self {
        StationRef::Id(id)
    }
}

impl From<&str> for StationRef {
    fn from(text: &str) -> Self {
        StationRef::Text(text.to_string())
    }
}

impl fmt::Display for StationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StationRef::Id(id) => write!(f, "{id}"),
            StationRef::Text(text) => f.write_str(text.trim()),
        }
    }
}

/// Which records a report should consider. Absent or blank criteria match everything.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordScope {
    #[serde(default)]
    pub month: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub station_id: Option<StationRef>,
}

impl RecordScope {
    pub fn with_month(mut self, month: impl Into<String>) -> Self {
        self.month = Some(month.into());
        self
    }

    pub fn with_year(mut self, year: impl Into<String>) -> Self {
        self.year = Some(year.into());
        self
    }

    pub fn with_station(mut self, station: impl Into<StationRef>) -> Self {
        self.station_id = Some(station.into());
        self
    }

    /// The unrestricted scope narrowed to what `ctx` may see.
    pub fn for_context(ctx: &AccessContext) -> Result<Self, CoreError> {
        Self::default().restrict_to(ctx)
    }

    /// Pins a manager's scope to their own station, whatever station the
    /// caller asked for. Admins and partners keep the scope unchanged.
    pub fn restrict_to(mut self, ctx: &AccessContext) -> Result<Self, CoreError> {
        if !ctx.is_station_bound() {
            return Ok(self);
        }
        let station_id = ctx.station_id.ok_or_else(|| {
            CoreError::AccessDenied(format!("{} has no assigned station", ctx.role))
        })?;
        self.station_id = Some(StationRef::Id(station_id));
        Ok(self)
    }

    pub fn is_unrestricted(&self) -> bool {
        criterion(&self.month).is_none()
            && criterion(&self.year).is_none()
            && self.station().is_none()
    }

    pub fn matches(&self, record: &DailyRecord) -> bool {
        if let Some(month) = criterion(&self.month) {
            let formatted = record.date.map(|date| date.format("%Y-%m").to_string());
            if formatted.as_deref() != Some(month) {
                return false;
            }
        }
        if let Some(year) = criterion(&self.year) {
            let formatted = record.date.map(|date| date.format("%Y").to_string());
            if formatted.as_deref() != Some(year) {
                return false;
            }
        }
        if let Some(station) = self.station() {
            match record.station_id {
                Some(id) if station.matches(id) => {}
                _ => return false,
            }
        }
        true
    }

    fn station(&self) -> Option<&StationRef> {
        self.station_id.as_ref().filter(|station| !station.is_blank())
    }
}

impl fmt::Display for RecordScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unrestricted() {
            return f.write_str("all records");
        }
        let mut parts = Vec::new();
        if let Some(month) = criterion(&self.month) {
            parts.push(format!("month={month}"));
        }
        if let Some(year) = criterion(&self.year) {
            parts.push(format!("year={year}"));
        }
        if let Some(station) = self.station() {
            parts.push(format!("station={station}"));
        }
        f.write_str(&parts.join(" "))
    }
}

fn criterion(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Records matching every criterion of `scope`, in input order.
pub fn filter_records<'a>(records: &'a [DailyRecord], scope: &RecordScope) -> Vec<&'a DailyRecord> {
    records.iter().filter(|record| scope.matches(record)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(date: &str, station: i64) -> DailyRecord {
        DailyRecord::new(NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(), station)
    }

    #[test]
    fn station_criterion_accepts_numeric_strings() {
        let records = vec![record("2024-01-05", 1), record("2024-01-06", 2)];
        let scope: RecordScope = serde_json::from_str(r#"{"stationId": " 1 "}"#).unwrap();
        let hits = filter_records(&records, &scope);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].station_id, Some(1));
    }

    #[test]
    fn month_and_year_compare_formatted_dates() {
        let mut undated = record("2024-02-01", 1);
        undated.date = None;
        let records = vec![record("2024-01-31", 1), record("2024-02-01", 1), undated];

        let feb = filter_records(&records, &RecordScope::default().with_month("2024-02"));
        assert_eq!(feb.len(), 1);

        let year = filter_records(&records, &RecordScope::default().with_year("2024"));
        assert_eq!(year.len(), 2);

        let blank = filter_records(&records, &RecordScope::default().with_month(""));
        assert_eq!(blank.len(), 3);
    }

    #[test]
    fn managers_are_pinned_to_their_station() {
        let scope = RecordScope::default()
            .with_station(2_i64)
            .restrict_to(&AccessContext::manager(1))
            .unwrap();
        assert_eq!(scope.station_id, Some(StationRef::Id(1)));

        let partner = RecordScope::default()
            .with_station(2_i64)
            .restrict_to(&AccessContext::partner())
            .unwrap();
        assert_eq!(partner.station_id, Some(StationRef::Id(2)));
    }

    #[test]
    fn manager_without_station_is_denied() {
        let ctx = AccessContext {
            station_id: None,
            ..AccessContext::manager(1)
        };
        assert!(matches!(
            RecordScope::for_context(&ctx),
            Err(CoreError::AccessDenied(_))
        ));
    }
}
