//! Unvalidated record drafts as they arrive from entry forms and imports.

use serde::{Deserialize, Serialize};

use crate::{common::RawValue, record::*};

/// A daily record before normalization: every scalar is a [`RawValue`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordDraft {
    pub id: RawValue,
    pub date: RawValue,
    pub station_id: RawValue,
    pub total_sale_kgs: RawValue,
    pub rate_per_kg: RawValue,
    pub total_cng_sale: RawValue,
    #[serde(alias = "otherRevenueLoanReturn")]
    pub other_revenue: RawValue,
    pub net_sale: RawValue,
    #[serde(alias = "totalDailyExpenditure")]
    pub total_expenditure: RawValue,
    pub depositable: RawValue,
    pub deposited: RawValue,
    pub withdrawal: RawValue,
    #[serde(alias = "wdDepDate")]
    pub withdrawal_deposit_date: RawValue,
    pub sngpl_meter_opening: RawValue,
    pub sngpl_meter_closing: RawValue,
    pub remarks: RawValue,
    #[serde(alias = "Expenditures")]
    pub expenditures: Vec<ExpenditureDraft>,
    #[serde(alias = "NozzleReadings")]
    pub nozzle_readings: Vec<NozzleDraft>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ExpenditureDraft {
    pub description: RawValue,
    pub category: RawValue,
    pub subcategory: RawValue,
    pub amount: RawValue,
}

impl ExpenditureDraft {
    pub fn new(
        description: impl Into<RawValue>,
        category: impl Into<RawValue>,
        amount: impl Into<RawValue>,
    ) -> Self {
        Self {
            description: description.into(),
            category: category.into(),
            subcategory: RawValue::Absent,
            amount: amount.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct NozzleDraft {
    pub nozzle_number: RawValue,
    #[serde(alias = "opening")]
    pub opening_girary: RawValue,
    #[serde(alias = "closing")]
    pub closing_girary: RawValue,
    pub opening_screen: RawValue,
    pub closing_screen: RawValue,
}

impl From<&DailyRecord> for RecordDraft {
    fn from(record: &DailyRecord) -> Self {
        Self {
            id: record.id.into(),
            date: record.date.into(),
            station_id: record.station_id.into(),
            total_sale_kgs: record.total_sale_kgs.into(),
            rate_per_kg: record.rate_per_kg.into(),
            total_cng_sale: record.total_cng_sale.into(),
            other_revenue: record.other_revenue.into(),
            net_sale: record.net_sale.into(),
            total_expenditure: record.total_expenditure.into(),
            depositable: record.depositable.into(),
            deposited: record.deposited.into(),
            withdrawal: record.withdrawal.into(),
            withdrawal_deposit_date: record.withdrawal_deposit_date.into(),
            sngpl_meter_opening: record.sngpl_meter_opening.into(),
            sngpl_meter_closing: record.sngpl_meter_closing.into(),
            remarks: record.remarks.as_ref().into(),
            expenditures: record.expenditures.iter().map(ExpenditureDraft::from).collect(),
            nozzle_readings: record.nozzle_readings.iter().map(NozzleDraft::from).collect(),
        }
    }
}

impl From<&ExpenditureLine> for ExpenditureDraft {
    fn from(line: &ExpenditureLine) -> Self {
        Self {
            description: line.description.as_ref().into(),
            category: line.category.as_ref().into(),
            subcategory: line.subcategory.as_ref().into(),
            amount: line.amount.into(),
        }
    }
}

impl From<&NozzleReading> for NozzleDraft {
    fn from(reading: &NozzleReading) -> Self {
        Self {
            nozzle_number: reading.nozzle_number.map(i64::from).into(),
            opening_girary: reading.opening_girary.into(),
            closing_girary: reading.closing_girary.into(),
            opening_screen: reading.opening_screen.into(),
            closing_screen: reading.closing_screen.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drafts_accept_form_payloads() {
        let json = r#"{
            "date": "2024-01-05",
            "stationId": "1",
            "totalSaleKgs": "",
            "Expenditures": [{"description": "", "category": "", "amount": ""}],
            "nozzleReadings": [{"nozzleNumber": "2", "opening": "10"}]
        }"#;
        let draft: RecordDraft = serde_json::from_str(json).unwrap();
        assert_eq!(draft.station_id.as_integer(), Some(1));
        assert!(draft.total_sale_kgs.is_absent());
        assert!(draft.net_sale.is_absent());
        assert_eq!(draft.expenditures.len(), 1);
        assert_eq!(draft.nozzle_readings[0].opening_girary.as_number(), Some(10.0));
    }
}
