//! Turns loosely-typed record drafts into well-typed records ready for storage.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use station_domain::{
    canonical_category_tag, DailyRecord, ExpenditureCategory, ExpenditureDraft, ExpenditureLine,
    NozzleDraft, NozzleReading, NumericPolicy, RawValue, RecordDraft, StationDirectory,
    SubcategoryPolicy, MAX_NOZZLE_NUMBER,
};

use crate::{derive::DerivationService, ValidationError};

/// Policies applied while normalizing a draft.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NormalizeOptions {
    #[serde(default)]
    pub numeric_policy: NumericPolicy,
    #[serde(default)]
    pub subcategory_policy: SubcategoryPolicy,
    /// Fill an undeclared net sale from CNG sale, other revenue, and expenditure.
    #[serde(default)]
    pub derive_net_sale: bool,
}

impl NormalizeOptions {
    pub fn strict() -> Self {
        Self {
            numeric_policy: NumericPolicy::Strict,
            subcategory_policy: SubcategoryPolicy::Reject,
            derive_net_sale: false,
        }
    }
}

/// Input that normalization discarded instead of rejecting the draft.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizationWarning {
    DiscardedNumeric { field: String, raw: String },
    DiscardedDate { field: String, raw: String },
    ClearedSubcategory {
        field: String,
        category: Option<String>,
        subcategory: String,
    },
}

impl fmt::Display for NormalizationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalizationWarning::DiscardedNumeric { field, raw } => {
                write!(f, "{field}: `{raw}` is not a number and was cleared")
            }
            NormalizationWarning::DiscardedDate { field, raw } => {
                write!(f, "{field}: `{raw}` is not a date and was cleared")
            }
            NormalizationWarning::ClearedSubcategory {
                field,
                category,
                subcategory,
            } => write!(
                f,
                "{field}: subcategory `{subcategory}` is not valid for `{}` and was cleared",
                category.as_deref().unwrap_or("no category")
            ),
        }
    }
}

/// A record ready for persistence plus any lenient coercions applied to it.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub record: DailyRecord,
    pub warnings: Vec<NormalizationWarning>,
}

impl NormalizedRecord {
    pub fn into_record(self) -> DailyRecord {
        self.record
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }
}

/// Pure, deterministic draft normalization.
pub struct NormalizationService;

impl NormalizationService {
    /// Normalizes `draft` for persistence.
    ///
    /// Empty nested rows are dropped, numeric-looking strings become numbers,
    /// and `total_expenditure` is derived from the retained lines. The station
    /// id is required.
    pub fn normalize(
        draft: &RecordDraft,
        options: &NormalizeOptions,
    ) -> Result<NormalizedRecord, ValidationError> {
        let mut pass = Normalizer::new(options);
        let mut record = pass.record(draft)?;
        if record.station_id.is_none() {
            return Err(ValidationError::MissingRequiredField("stationId".into()));
        }
        DerivationService::apply(&mut record);
        if options.derive_net_sale {
            DerivationService::fill_net_sale(&mut record);
        }
        for warning in &pass.warnings {
            warn!(%warning, "normalization coerced draft input");
        }
        Ok(NormalizedRecord {
            record,
            warnings: pass.warnings,
        })
    }

    /// Re-normalizes an already typed record. The output equals the input for
    /// any record produced by [`NormalizationService::normalize`].
    pub fn renormalize(
        record: &DailyRecord,
        options: &NormalizeOptions,
    ) -> Result<NormalizedRecord, ValidationError> {
        Self::normalize(&RecordDraft::from(record), options)
    }

    /// Prefills the draft's rate from the station's configured gas rate when
    /// the draft does not carry one. The rate stays editable.
    pub fn prefill_rate(draft: &mut RecordDraft, stations: &StationDirectory) {
        if !draft.rate_per_kg.is_absent() {
            return;
        }
        if let Some(rate) = draft
            .station_id
            .as_integer()
            .and_then(|id| stations.rate_for(id))
        {
            draft.rate_per_kg = RawValue::Number(rate);
        }
    }
}

struct Normalizer<'a> {
    options: &'a NormalizeOptions,
    warnings: Vec<NormalizationWarning>,
}

impl<'a> Normalizer<'a> {
    fn new(options: &'a NormalizeOptions) -> Self {
        Self {
            options,
            warnings: Vec::new(),
        }
    }

    fn record(&mut self, draft: &RecordDraft) -> Result<DailyRecord, ValidationError> {
        let mut expenditures = Vec::with_capacity(draft.expenditures.len());
        for (idx, line) in draft.expenditures.iter().enumerate() {
            let line = self.expenditure(idx, line)?;
            if line.is_empty() {
                debug!(index = idx, "dropping empty expenditure line");
                continue;
            }
            expenditures.push(line);
        }

        let mut nozzle_readings = Vec::with_capacity(draft.nozzle_readings.len());
        for (idx, reading) in draft.nozzle_readings.iter().enumerate() {
            let reading = self.nozzle(idx, reading)?;
            if reading.is_empty() {
                debug!(index = idx, "dropping empty nozzle reading");
                continue;
            }
            nozzle_readings.push(reading);
        }

        Ok(DailyRecord {
            id: self.integer("id", &draft.id)?,
            date: self.date("date", &draft.date)?,
            station_id: self.integer("stationId", &draft.station_id)?,
            total_sale_kgs: self.number("totalSaleKgs", &draft.total_sale_kgs)?,
            rate_per_kg: self.number("ratePerKg", &draft.rate_per_kg)?,
            total_cng_sale: self.number("totalCngSale", &draft.total_cng_sale)?,
            other_revenue: self.number("otherRevenue", &draft.other_revenue)?,
            net_sale: self.number("netSale", &draft.net_sale)?,
            total_expenditure: self.number("totalExpenditure", &draft.total_expenditure)?,
            depositable: self.number("depositable", &draft.depositable)?,
            deposited: self.number("deposited", &draft.deposited)?,
            withdrawal: self.number("withdrawal", &draft.withdrawal)?,
            withdrawal_deposit_date: self
                .date("withdrawalDepositDate", &draft.withdrawal_deposit_date)?,
            sngpl_meter_opening: self.number("sngplMeterOpening", &draft.sngpl_meter_opening)?,
            sngpl_meter_closing: self.number("sngplMeterClosing", &draft.sngpl_meter_closing)?,
            remarks: draft.remarks.as_text(),
            expenditures,
            nozzle_readings,
        })
    }

    fn expenditure(
        &mut self,
        idx: usize,
        draft: &ExpenditureDraft,
    ) -> Result<ExpenditureLine, ValidationError> {
        let category = draft.category.as_text().and_then(|tag| canonical_category_tag(&tag));
        let field = format!("expenditures[{idx}]");
        let description = draft.description.as_text();
        let amount = self.number(&format!("{field}.amount"), &draft.amount)?;
        if description.is_none() && category.is_none() && amount.is_none() {
            // Dropped by the caller; a stray subcategory is not worth a warning.
            return Ok(ExpenditureLine::default());
        }
        let subcategory = match draft.subcategory.as_text() {
            Some(raw) => self.subcategory(&field, category.as_deref(), raw)?,
            None => None,
        };
        Ok(ExpenditureLine {
            description,
            amount,
            category,
            subcategory,
        })
    }

    fn subcategory(
        &mut self,
        field: &str,
        category: Option<&str>,
        raw: String,
    ) -> Result<Option<String>, ValidationError> {
        let known = category.and_then(ExpenditureCategory::from_tag);
        if let Some(legal) = known.and_then(|cat| cat.canonical_subcategory(&raw)) {
            return Ok(Some(legal.to_string()));
        }
        match self.options.subcategory_policy {
            SubcategoryPolicy::Accept => Ok(Some(raw)),
            SubcategoryPolicy::Reject => Err(ValidationError::InvalidSubcategory {
                category: category.unwrap_or_default().to_string(),
                subcategory: raw,
            }),
            SubcategoryPolicy::Clear => {
                self.warnings.push(NormalizationWarning::ClearedSubcategory {
                    field: format!("{field}.subcategory"),
                    category: category.map(str::to_string),
                    subcategory: raw,
                });
                Ok(None)
            }
        }
    }

    fn nozzle(&mut self, idx: usize, draft: &NozzleDraft) -> Result<NozzleReading, ValidationError> {
        let field = format!("nozzleReadings[{idx}]");
        Ok(NozzleReading {
            nozzle_number: self.nozzle_number(&format!("{field}.nozzleNumber"), &draft.nozzle_number)?,
            opening_girary: self.number(&format!("{field}.openingGirary"), &draft.opening_girary)?,
            closing_girary: self.number(&format!("{field}.closingGirary"), &draft.closing_girary)?,
            opening_screen: self.number(&format!("{field}.openingScreen"), &draft.opening_screen)?,
            closing_screen: self.number(&format!("{field}.closingScreen"), &draft.closing_screen)?,
        })
    }

    fn nozzle_number(&mut self, field: &str, raw: &RawValue) -> Result<Option<u8>, ValidationError> {
        let Some(number) = self.integer(field, raw)? else {
            return Ok(None);
        };
        match u8::try_from(number) {
            Ok(valid) if (1..=MAX_NOZZLE_NUMBER).contains(&valid) => Ok(Some(valid)),
            _ => match self.options.numeric_policy {
                NumericPolicy::Strict => Err(ValidationError::InvalidNozzleNumber(number)),
                NumericPolicy::Lenient => {
                    self.discard_numeric(field, raw);
                    Ok(None)
                }
            },
        }
    }

    fn number(&mut self, field: &str, raw: &RawValue) -> Result<Option<f64>, ValidationError> {
        if raw.is_absent() {
            return Ok(None);
        }
        match raw.as_number() {
            Some(value) => Ok(Some(value)),
            None => self.reject_numeric(field, raw),
        }
    }

    fn integer(&mut self, field: &str, raw: &RawValue) -> Result<Option<i64>, ValidationError> {
        if raw.is_absent() {
            return Ok(None);
        }
        match raw.as_integer() {
            Some(value) => Ok(Some(value)),
            None => self.reject_numeric(field, raw),
        }
    }

    fn date(&mut self, field: &str, raw: &RawValue) -> Result<Option<NaiveDate>, ValidationError> {
        if raw.is_absent() {
            return Ok(None);
        }
        if let Some(date) = raw.as_date() {
            return Ok(Some(date));
        }
        match self.options.numeric_policy {
            NumericPolicy::Strict => Err(ValidationError::InvalidDate {
                field: field.to_string(),
                raw: raw.describe(),
            }),
            NumericPolicy::Lenient => {
                self.warnings.push(NormalizationWarning::DiscardedDate {
                    field: field.to_string(),
                    raw: raw.describe(),
                });
                Ok(None)
            }
        }
    }

    fn reject_numeric<T>(&mut self, field: &str, raw: &RawValue) -> Result<Option<T>, ValidationError> {
        match self.options.numeric_policy {
            NumericPolicy::Strict => Err(ValidationError::InvalidNumeric {
                field: field.to_string(),
                raw: raw.describe(),
            }),
            NumericPolicy::Lenient => {
                self.discard_numeric(field, raw);
                Ok(None)
            }
        }
    }

    fn discard_numeric(&mut self, field: &str, raw: &RawValue) {
        self.warnings.push(NormalizationWarning::DiscardedNumeric {
            field: field.to_string(),
            raw: raw.describe(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft_with_station() -> RecordDraft {
        RecordDraft {
            date: RawValue::text("2024-01-05"),
            station_id: RawValue::text("1"),
            ..RecordDraft::default()
        }
    }

    #[test]
    fn empty_expenditure_rows_are_dropped() {
        let mut draft = draft_with_station();
        draft.expenditures.push(ExpenditureDraft::new("", "", ""));
        let normalized = NormalizationService::normalize(&draft, &NormalizeOptions::default()).unwrap();
        assert!(normalized.record.expenditures.is_empty());
        assert_eq!(normalized.record.total_expenditure, Some(0.0));
    }

    #[test]
    fn nozzle_rows_with_only_a_number_are_dropped() {
        let mut draft = draft_with_station();
        draft.nozzle_readings.push(NozzleDraft {
            nozzle_number: RawValue::text("3"),
            ..NozzleDraft::default()
        });
        draft.nozzle_readings.push(NozzleDraft {
            nozzle_number: RawValue::Number(4.0),
            opening_screen: RawValue::text("100.5"),
            ..NozzleDraft::default()
        });
        let record = NormalizationService::normalize(&draft, &NormalizeOptions::default())
            .unwrap()
            .into_record();
        assert_eq!(record.nozzle_readings.len(), 1);
        assert_eq!(record.nozzle_readings[0].nozzle_number, Some(4));
        assert_eq!(record.nozzle_readings[0].opening_screen, Some(100.5));
    }

    #[test]
    fn missing_station_is_reported() {
        let draft = RecordDraft {
            station_id: RawValue::text(""),
            ..draft_with_station()
        };
        let err = NormalizationService::normalize(&draft, &NormalizeOptions::default()).unwrap_err();
        assert_eq!(err, ValidationError::MissingRequiredField("stationId".into()));
    }

    #[test]
    fn lenient_policy_clears_non_numeric_values() {
        let draft = RecordDraft {
            total_sale_kgs: RawValue::text("12kg"),
            net_sale: RawValue::text("5000"),
            ..draft_with_station()
        };
        let normalized = NormalizationService::normalize(&draft, &NormalizeOptions::default()).unwrap();
        assert_eq!(normalized.record.total_sale_kgs, None);
        assert_eq!(normalized.record.net_sale, Some(5000.0));
        assert_eq!(normalized.warnings.len(), 1);
    }

    #[test]
    fn strict_policy_rejects_non_numeric_values() {
        let draft = RecordDraft {
            deposited: RawValue::text("lots"),
            ..draft_with_station()
        };
        let err = NormalizationService::normalize(&draft, &NormalizeOptions::strict()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidNumeric {
                field: "deposited".into(),
                raw: "lots".into()
            }
        );
    }

    #[test]
    fn subcategory_policies() {
        let mut draft = draft_with_station();
        let mut line = ExpenditureDraft::new("plates", "kitchen", "120");
        line.subcategory = RawValue::text("Utensils");
        draft.expenditures.push(line);
        let mut bad = ExpenditureDraft::new("fan", "general", "900");
        bad.subcategory = RawValue::text("utensils");
        draft.expenditures.push(bad);

        let cleared = NormalizationService::normalize(&draft, &NormalizeOptions::default()).unwrap();
        assert_eq!(
            cleared.record.expenditures[0].subcategory.as_deref(),
            Some("utensils")
        );
        assert_eq!(cleared.record.expenditures[1].subcategory, None);
        assert_eq!(cleared.warnings.len(), 1);

        let rejected = NormalizationService::normalize(&draft, &NormalizeOptions::strict());
        assert!(matches!(
            rejected,
            Err(ValidationError::InvalidSubcategory { .. })
        ));

        let accepting = NormalizeOptions {
            subcategory_policy: SubcategoryPolicy::Accept,
            ..NormalizeOptions::default()
        };
        let accepted = NormalizationService::normalize(&draft, &accepting).unwrap();
        assert_eq!(
            accepted.record.expenditures[1].subcategory.as_deref(),
            Some("utensils")
        );
    }

    #[test]
    fn subcategory_only_rows_are_dropped_without_warnings() {
        let mut draft = draft_with_station();
        let mut stray = ExpenditureDraft::new("", "", "");
        stray.subcategory = RawValue::text("utensils");
        draft.expenditures.push(stray);

        let cleared = NormalizationService::normalize(&draft, &NormalizeOptions::default()).unwrap();
        assert!(cleared.record.expenditures.is_empty());
        assert!(cleared.is_clean());

        let strict = NormalizationService::normalize(&draft, &NormalizeOptions::strict()).unwrap();
        assert!(strict.record.expenditures.is_empty());
    }

    #[test]
    fn net_sale_is_derived_only_when_requested() {
        let mut draft = RecordDraft {
            total_cng_sale: RawValue::Number(10_000.0),
            other_revenue: RawValue::text("500"),
            ..draft_with_station()
        };
        draft.expenditures.push(ExpenditureDraft::new("tea", "kitchen", "300"));

        let plain = NormalizationService::normalize(&draft, &NormalizeOptions::default()).unwrap();
        assert_eq!(plain.record.net_sale, None);

        let deriving = NormalizeOptions {
            derive_net_sale: true,
            ..NormalizeOptions::default()
        };
        let derived = NormalizationService::normalize(&draft, &deriving).unwrap();
        assert_eq!(derived.record.net_sale, Some(10_200.0));

        let again = NormalizationService::renormalize(&derived.record, &deriving).unwrap();
        assert_eq!(again.record, derived.record);

        draft.net_sale = RawValue::Number(9_000.0);
        let declared = NormalizationService::normalize(&draft, &deriving).unwrap();
        assert_eq!(declared.record.net_sale, Some(9_000.0));
    }

    #[test]
    fn out_of_layout_nozzle_numbers() {
        let mut draft = draft_with_station();
        draft.nozzle_readings.push(NozzleDraft {
            nozzle_number: RawValue::Number(9.0),
            opening_girary: RawValue::Number(1.0),
            ..NozzleDraft::default()
        });
        let lenient = NormalizationService::normalize(&draft, &NormalizeOptions::default()).unwrap();
        assert_eq!(lenient.record.nozzle_readings[0].nozzle_number, None);
        let strict = NormalizationService::normalize(&draft, &NormalizeOptions::strict());
        assert_eq!(strict.unwrap_err(), ValidationError::InvalidNozzleNumber(9));
    }

    #[test]
    fn rate_is_prefilled_from_station() {
        let stations = StationDirectory::new([station_domain::Station::new(1, "Main").with_rate(210.0)]);
        let mut draft = draft_with_station();
        NormalizationService::prefill_rate(&mut draft, &stations);
        assert_eq!(draft.rate_per_kg, RawValue::Number(210.0));

        draft.rate_per_kg = RawValue::text("205");
        NormalizationService::prefill_rate(&mut draft, &stations);
        assert_eq!(draft.rate_per_kg, RawValue::text("205"));
    }
}
