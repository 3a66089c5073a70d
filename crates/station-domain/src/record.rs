//! Daily operational records and their nested expenditure lines and nozzle readings.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{category::ExpenditureCategory, common::*};

/// One station's operational entry for one date.
///
/// Owns its expenditure lines and nozzle readings; they are replaced wholesale
/// on edit and removed with the record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::date")]
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::id")]
    pub station_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub total_sale_kgs: Option<f64>,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub rate_per_kg: Option<f64>,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub total_cng_sale: Option<f64>,
    #[serde(
        default,
        alias = "otherRevenueLoanReturn",
        deserialize_with = "lenient::amount"
    )]
    pub other_revenue: Option<f64>,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub net_sale: Option<f64>,
    #[serde(
        default,
        alias = "totalDailyExpenditure",
        deserialize_with = "lenient::amount"
    )]
    pub total_expenditure: Option<f64>,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub depositable: Option<f64>,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub deposited: Option<f64>,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub withdrawal: Option<f64>,
    #[serde(default, alias = "wdDepDate", deserialize_with = "lenient::date")]
    pub withdrawal_deposit_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub sngpl_meter_opening: Option<f64>,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub sngpl_meter_closing: Option<f64>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub remarks: Option<String>,
    #[serde(default, alias = "Expenditures")]
    pub expenditures: Vec<ExpenditureLine>,
    #[serde(default, alias = "NozzleReadings")]
    pub nozzle_readings: Vec<NozzleReading>,
}

impl DailyRecord {
    pub fn new(date: NaiveDate, station_id: i64) -> Self {
        Self {
            date: Some(date),
            station_id: Some(station_id),
            ..Self::default()
        }
    }

    pub fn with_expenditure(mut self, line: ExpenditureLine) -> Self {
        self.expenditures.push(line);
        self
    }

    pub fn with_nozzle(mut self, reading: NozzleReading) -> Self {
        self.nozzle_readings.push(reading);
        self
    }

    /// Calendar month the record belongs to, when it is dated.
    pub fn month(&self) -> Option<MonthKey> {
        self.date.map(MonthKey::of)
    }

    /// Change in the station's main gas meter over the day.
    pub fn sngpl_throughput(&self) -> Option<f64> {
        Some(self.sngpl_meter_closing? - self.sngpl_meter_opening?)
    }
}

impl Identifiable for DailyRecord {
    fn id(&self) -> Option<i64> {
        self.id
    }
}

impl Displayable for DailyRecord {
    fn display_label(&self) -> String {
        let date = self
            .date
            .map(|date| date.to_string())
            .unwrap_or_else(|| "undated".into());
        match self.station_id {
            Some(station) => format!("record {date} @ station {station}"),
            None => format!("record {date} @ unassigned station"),
        }
    }
}

/// One itemized expenditure within a [`DailyRecord`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ExpenditureLine {
    #[serde(default, deserialize_with = "lenient::text")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub subcategory: Option<String>,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub amount: Option<f64>,
}

impl ExpenditureLine {
    pub fn new(category: ExpenditureCategory, amount: f64) -> Self {
        Self {
            category: Some(category.tag().to_string()),
            amount: Some(amount),
            ..Self::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = Some(subcategory.into());
        self
    }

    /// Resolves the stored tag against the closed category set.
    pub fn known_category(&self) -> Option<ExpenditureCategory> {
        self.category.as_deref().and_then(ExpenditureCategory::from_tag)
    }

    pub fn is_empty(&self) -> bool {
        self.description.is_none() && self.category.is_none() && self.amount.is_none()
    }
}

impl Amounted for ExpenditureLine {
    fn amount(&self) -> f64 {
        self.amount.unwrap_or(0.0)
    }
}

/// Identifies one of the two independent meters on a nozzle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Gauge {
    Girary,
    Screen,
}

impl fmt::Display for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Gauge::Girary => "girary",
            Gauge::Screen => "screen",
        };
        f.write_str(label)
    }
}

/// Highest nozzle number in the fixed dispenser layout.
pub const MAX_NOZZLE_NUMBER: u8 = 6;

/// One dispenser nozzle's dual-gauge meter reading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NozzleReading {
    #[serde(default, deserialize_with = "lenient::nozzle")]
    pub nozzle_number: Option<u8>,
    #[serde(default, alias = "opening", deserialize_with = "lenient::amount")]
    pub opening_girary: Option<f64>,
    #[serde(default, alias = "closing", deserialize_with = "lenient::amount")]
    pub closing_girary: Option<f64>,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub opening_screen: Option<f64>,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub closing_screen: Option<f64>,
}

impl NozzleReading {
    pub fn new(nozzle_number: u8) -> Self {
        Self {
            nozzle_number: Some(nozzle_number),
            ..Self::default()
        }
    }

    pub fn with_girary(mut self, opening: f64, closing: f64) -> Self {
        self.opening_girary = Some(opening);
        self.closing_girary = Some(closing);
        self
    }

    pub fn with_screen(mut self, opening: f64, closing: f64) -> Self {
        self.opening_screen = Some(opening);
        self.closing_screen = Some(closing);
        self
    }

    pub fn pair(&self, gauge: Gauge) -> (Option<f64>, Option<f64>) {
        match gauge {
            Gauge::Girary => (self.opening_girary, self.closing_girary),
            Gauge::Screen => (self.opening_screen, self.closing_screen),
        }
    }

    /// Closing minus opening for one gauge, when both readings are present.
    pub fn throughput(&self, gauge: Gauge) -> Option<f64> {
        match self.pair(gauge) {
            (Some(opening), Some(closing)) => Some(closing - opening),
            _ => None,
        }
    }

    /// `true` when every meter field is absent.
    pub fn is_empty(&self) -> bool {
        self.opening_girary.is_none()
            && self.closing_girary.is_none()
            && self.opening_screen.is_none()
            && self.closing_screen.is_none()
    }
}
