//! Station staff with salary, advance, and loan installment tracking.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::common::*;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: Option<i64>,
    pub name: String,
    #[serde(
        default,
        deserialize_with = "lenient::text",
        skip_serializing_if = "Option::is_none"
    )]
    pub contact_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient::id")]
    pub station_id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub monthly_salary: Option<f64>,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub current_advance_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::date")]
    pub advance_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub total_loan_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub repaid_loan_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub monthly_installment_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::date")]
    pub loan_start_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient::date")]
    pub loan_end_date: Option<NaiveDate>,
}

impl Employee {
    pub fn new(name: impl Into<String>, station_id: i64) -> Self {
        Self {
            name: name.into(),
            station_id: Some(station_id),
            ..Self::default()
        }
    }

    pub fn with_salary(mut self, salary: f64) -> Self {
        self.monthly_salary = Some(salary);
        self
    }

    pub fn with_loan(mut self, total: f64, installment: Option<f64>) -> Self {
        self.total_loan_amount = Some(total);
        self.monthly_installment_amount = installment;
        self
    }

    /// Outstanding staff loan, computed on every read. Never negative.
    pub fn remaining_loan_amount(&self) -> f64 {
        (self.total_loan_amount.unwrap_or(0.0) - self.repaid_loan_amount.unwrap_or(0.0)).max(0.0)
    }

    /// Books one repayment. Without an explicit amount the monthly installment is used.
    /// Returns the amount actually applied, capped at the outstanding balance.
    pub fn record_repayment(&mut self, amount: Option<f64>) -> f64 {
        let requested = amount
            .or(self.monthly_installment_amount)
            .unwrap_or(0.0)
            .max(0.0);
        let applied = requested.min(self.remaining_loan_amount());
        self.repaid_loan_amount = Some(self.repaid_loan_amount.unwrap_or(0.0) + applied);
        applied
    }

    /// Whole installments still due at the current monthly rate.
    pub fn installments_remaining(&self) -> Option<u32> {
        let installment = self.monthly_installment_amount.filter(|value| *value > 0.0)?;
        Some((self.remaining_loan_amount() / installment).ceil() as u32)
    }

    /// Salary left to pay this month once the advance is withheld.
    pub fn net_payable_salary(&self) -> f64 {
        self.monthly_salary.unwrap_or(0.0) - self.current_advance_amount.unwrap_or(0.0)
    }
}

impl Identifiable for Employee {
    fn id(&self) -> Option<i64> {
        self.id
    }
}

impl Amounted for Employee {
    fn amount(&self) -> f64 {
        self.remaining_loan_amount()
    }
}
