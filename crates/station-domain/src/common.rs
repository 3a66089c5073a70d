//! Shared traits, scalar coercion, month keys, and policy enums.

use std::{fmt, str::FromStr};

use chrono::{Datelike, NaiveDate};
use serde::{
    de::{self, Deserializer, Visitor},
    Deserialize, Serialize, Serializer,
};

/// Exposes the storage identifier of a persisted entity, when it has one.
pub trait Identifiable {
    fn id(&self) -> Option<i64>;
}

/// Supplies a common contract for retrieving numeric amounts.
pub trait Amounted {
    fn amount(&self) -> f64;
}

/// Converts an entity into a user-facing display label.
pub trait Displayable {
    fn display_label(&self) -> String;
}

/// Date layouts accepted from entry forms and legacy imports.
const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d-%m-%Y", "%Y/%m/%d"];

/// Parses a numeric-looking string. Empty or whitespace-only input is absent,
/// as is anything that does not parse fully as a finite number.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Parses a calendar date from an entry form or a stored timestamp.
///
/// Timestamps such as `2024-01-05T00:00:00.000Z` keep only their date part.
pub fn parse_record_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let head = match trimmed.find('T') {
        Some(10) => &trimmed[..10],
        _ => trimmed,
    };
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(head, format).ok())
}

/// A loosely-typed scalar as it arrives from a form or an untyped import.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RawValue {
    #[default]
    Absent,
    Text(String),
    Number(f64),
}

impl RawValue {
    pub fn text(value: impl Into<String>) -> Self {
        RawValue::Text(value.into())
    }

    /// Returns `true` for `null`, missing keys, and empty or blank strings.
    pub fn is_absent(&self) -> bool {
        match self {
            RawValue::Absent => true,
            RawValue::Text(text) => text.trim().is_empty(),
            RawValue::Number(_) => false,
        }
    }

    /// Coerces the value to a finite number, if it represents one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RawValue::Absent => None,
            RawValue::Text(text) => parse_numeric(text),
            RawValue::Number(value) => Some(*value).filter(|value| value.is_finite()),
        }
    }

    /// Coerces the value to an integer, rejecting fractional numbers.
    pub fn as_integer(&self) -> Option<i64> {
        let value = self.as_number()?;
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            Some(value as i64)
        } else {
            None
        }
    }

    /// Returns trimmed, non-empty text. Numbers are rendered back to text.
    pub fn as_text(&self) -> Option<String> {
        match self {
            RawValue::Absent => None,
            RawValue::Text(text) => {
                let trimmed = text.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            RawValue::Number(value) => Some(value.to_string()),
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            RawValue::Text(text) => parse_record_date(text),
            _ => None,
        }
    }

    /// Renders the raw input for error messages.
    pub fn describe(&self) -> String {
        match self {
            RawValue::Absent => String::new(),
            RawValue::Text(text) => text.clone(),
            RawValue::Number(value) => value.to_string(),
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<Option<f64>> for RawValue {
    fn from(value: Option<f64>) -> Self {
        value.map(RawValue::Number).unwrap_or_default()
    }
}

impl From<Option<i64>> for RawValue {
    fn from(value: Option<i64>) -> Self {
        value
            .map(|id| RawValue::Number(id as f64))
            .unwrap_or_default()
    }
}

impl From<Option<NaiveDate>> for RawValue {
    fn from(value: Option<NaiveDate>) -> Self {
        value
            .map(|date| RawValue::Text(date.format("%Y-%m-%d").to_string()))
            .unwrap_or_default()
    }
}

impl From<Option<&String>> for RawValue {
    fn from(value: Option<&String>) -> Self {
        value.map(|text| RawValue::Text(text.clone())).unwrap_or_default()
    }
}

impl Serialize for RawValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            RawValue::Absent => serializer.serialize_none(),
            RawValue::Text(text) => serializer.serialize_str(text),
            RawValue::Number(value) => serializer.serialize_f64(*value),
        }
    }
}

impl<'de> Deserialize<'de> for RawValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(RawValueVisitor)
    }
}

struct RawValueVisitor;

impl<'de> Visitor<'de> for RawValueVisitor {
    type Value = RawValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a number, a string, or null")
    }

    fn visit_unit<E: de::Error>(self) -> Result<RawValue, E> {
        Ok(RawValue::Absent)
    }

    fn visit_none<E: de::Error>(self) -> Result<RawValue, E> {
        Ok(RawValue::Absent)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<RawValue, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(RawValueVisitor)
    }

    fn visit_bool<E: de::Error>(self, value: bool) -> Result<RawValue, E> {
        Ok(RawValue::Text(value.to_string()))
    }

    fn visit_i64<E: de::Error>(self, value: i64) -> Result<RawValue, E> {
        Ok(RawValue::Number(value as f64))
    }

    fn visit_u64<E: de::Error>(self, value: u64) -> Result<RawValue, E> {
        Ok(RawValue::Number(value as f64))
    }

    fn visit_f64<E: de::Error>(self, value: f64) -> Result<RawValue, E> {
        Ok(RawValue::Number(value))
    }

    fn visit_str<E: de::Error>(self, value: &str) -> Result<RawValue, E> {
        Ok(RawValue::Text(value.to_string()))
    }

    fn visit_string<E: de::Error>(self, value: String) -> Result<RawValue, E> {
        Ok(RawValue::Text(value))
    }
}

/// Deserializers that read stored records "as-is": numeric strings become
/// numbers and anything unreadable becomes absent instead of failing the load.
pub mod lenient {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer};

    use super::RawValue;

    pub fn amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(RawValue::deserialize(deserializer)?.as_number())
    }

    pub fn id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(RawValue::deserialize(deserializer)?.as_integer())
    }

    pub fn nozzle<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(RawValue::deserialize(deserializer)?
            .as_integer()
            .and_then(|value| u8::try_from(value).ok()))
    }

    pub fn text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(RawValue::deserialize(deserializer)?.as_text())
    }

    pub fn date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(RawValue::deserialize(deserializer)?.as_date())
    }
}

/// Calendar month used to bucket records. Orders chronologically and
/// renders as zero-padded `YYYY-MM`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Errors that can occur when parsing a [`MonthKey`].
pub enum MonthKeyError {
    InvalidFormat,
}

impl fmt::Display for MonthKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonthKeyError::InvalidFormat => f.write_str("month must be formatted as YYYY-MM"),
        }
    }
}

impl std::error::Error for MonthKeyError {}

impl FromStr for MonthKey {
    type Err = MonthKeyError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let (year, month) = value
            .trim()
            .split_once('-')
            .ok_or(MonthKeyError::InvalidFormat)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(MonthKeyError::InvalidFormat);
        }
        let year = year.parse().map_err(|_| MonthKeyError::InvalidFormat)?;
        let month = month.parse().map_err(|_| MonthKeyError::InvalidFormat)?;
        MonthKey::new(year, month).ok_or(MonthKeyError::InvalidFormat)
    }
}

impl Serialize for MonthKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MonthKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
/// How normalization treats a non-numeric string in a numeric field.
pub enum NumericPolicy {
    /// Coerce to absent and record a warning.
    #[default]
    Lenient,
    /// Reject the draft with a validation error.
    Strict,
}

impl fmt::Display for NumericPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            NumericPolicy::Lenient => "lenient",
            NumericPolicy::Strict => "strict",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
/// How normalization treats a subcategory outside its category's legal set.
pub enum SubcategoryPolicy {
    #[default]
    Clear,
    Reject,
    Accept,
}

impl fmt::Display for SubcategoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SubcategoryPolicy::Clear => "clear",
            SubcategoryPolicy::Reject => "reject",
            SubcategoryPolicy::Accept => "accept",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_numeric_rejects_partial_numbers() {
        assert_eq!(parse_numeric(" 12.5 "), Some(12.5));
        assert_eq!(parse_numeric(""), None);
        assert_eq!(parse_numeric("12abc"), None);
        assert_eq!(parse_numeric("NaN"), None);
    }

    #[test]
    fn record_dates_accept_form_and_timestamp_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5).unwrap();
        assert_eq!(parse_record_date("2024-01-05"), Some(expected));
        assert_eq!(parse_record_date("05-01-2024"), Some(expected));
        assert_eq!(parse_record_date("2024-01-05T00:00:00.000Z"), Some(expected));
        assert_eq!(parse_record_date("January"), None);
    }

    #[test]
    fn month_keys_order_chronologically() {
        let dec: MonthKey = "2023-12".parse().unwrap();
        let jan: MonthKey = "2024-01".parse().unwrap();
        assert!(dec < jan);
        assert_eq!(jan.to_string(), "2024-01");
        assert!("2024-1".parse::<MonthKey>().is_err());
        assert!("2024-13".parse::<MonthKey>().is_err());
    }

    #[test]
    fn raw_values_deserialize_from_loose_json() {
        let values: Vec<RawValue> = serde_json::from_str(r#"[null, "", "7", 7.5, "x"]"#).unwrap();
        assert!(values[0].is_absent());
        assert!(values[1].is_absent());
        assert_eq!(values[2].as_number(), Some(7.0));
        assert_eq!(values[3].as_number(), Some(7.5));
        assert_eq!(values[4].as_number(), None);
        assert!(!values[4].is_absent());
    }
}
