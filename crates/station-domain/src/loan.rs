//! Loans tracked alongside daily operations.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::common::*;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
/// Direction of the loan relative to the business.
pub enum LoanType {
    #[default]
    Taken,
    Given,
}

impl fmt::Display for LoanType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LoanType::Taken => "Taken",
            LoanType::Given => "Given",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LoanStatus {
    #[default]
    Active,
    Closed,
}

impl fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LoanStatus::Active => "Active",
            LoanStatus::Closed => "Closed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Loan {
    #[serde(default, deserialize_with = "lenient::id")]
    pub id: Option<i64>,
    #[serde(default, deserialize_with = "lenient::date")]
    pub date: Option<NaiveDate>,
    pub person_name: String,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::amount")]
    pub return_amount: Option<f64>,
    #[serde(default, deserialize_with = "lenient::date")]
    pub return_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remarks: Option<String>,
    #[serde(default)]
    pub loan_type: LoanType,
    #[serde(default)]
    pub status: LoanStatus,
}

impl Loan {
    pub fn new(person_name: impl Into<String>, amount: f64) -> Self {
        Self {
            person_name: person_name.into(),
            amount: Some(amount),
            ..Self::default()
        }
    }

    /// Outstanding balance, computed on every read. Absent amounts count as zero.
    pub fn remaining_loan_amount(&self) -> f64 {
        self.amount.unwrap_or(0.0) - self.return_amount.unwrap_or(0.0)
    }

    pub fn record_return(&mut self, amount: f64, date: NaiveDate) {
        self.return_amount = Some(self.return_amount.unwrap_or(0.0) + amount);
        self.return_date = Some(date);
        if self.remaining_loan_amount() <= 0.0 {
            self.status = LoanStatus::Closed;
        }
    }
}

impl Identifiable for Loan {
    fn id(&self) -> Option<i64> {
        self.id
    }
}

impl Amounted for Loan {
    fn amount(&self) -> f64 {
        self.remaining_loan_amount()
    }
}
