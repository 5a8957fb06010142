use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{AppError, AppResult};

pub const DEFAULT_CATEGORY: &str = "Others";

/// Largest accepted absolute amount, in cents (100 billion currency units).
/// Keeps per-bucket SQL sums well inside `i64`.
pub const MAX_AMOUNT_CENTS: i64 = 10_000_000_000_000;

/// How often an expense repeats. Informational only, nothing is scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Recurrence {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
}

impl Recurrence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        }
    }
}

impl FromStr for Recurrence {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "" | "none" => Ok(Self::None),
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "monthly" => Ok(Self::Monthly),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub amount_cents: i64,
    pub category: String,
    pub date: String,
    pub recurring: Recurrence,
    pub note: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A validated expense ready to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub title: String,
    pub amount_cents: i64,
    pub category: String,
    pub date: String,
    pub recurring: Recurrence,
    pub note: Option<String>,
}

/// Amounts arrive either as JSON numbers or as decimal strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(f64),
    Text(String),
}

impl AmountInput {
    pub fn to_cents(&self) -> AppResult<i64> {
        let value = match self {
            AmountInput::Number(n) => *n,
            AmountInput::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| AppError::Validation(format!("Invalid amount: {}", s)))?,
        };

        if !value.is_finite() {
            return Err(AppError::Validation("Amount must be a finite number".into()));
        }

        let cents = (value * 100.0).round();
        if cents.abs() > MAX_AMOUNT_CENTS as f64 {
            return Err(AppError::Validation(format!(
                "Amount must be between -{0} and {0}",
                MAX_AMOUNT_CENTS / 100
            )));
        }
        Ok(cents as i64)
    }
}

/// Request body for creating or updating an expense.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseInput {
    #[serde(default)]
    pub title: Option<String>,
    pub amount: AmountInput,
    #[serde(default)]
    pub category: Option<String>,
    pub date: String,
    #[serde(default)]
    pub recurring: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
}

impl ExpenseInput {
    pub fn validate(self) -> AppResult<NewExpense> {
        let amount_cents = self.amount.to_cents()?;
        let date = parse_date(&self.date)?;

        let recurring = match self.recurring.as_deref() {
            None => Recurrence::None,
            Some(r) => r.parse().map_err(|_| {
                AppError::Validation(format!(
                    "Invalid recurring value '{}': expected none, daily, weekly or monthly",
                    r
                ))
            })?,
        };

        let category = self
            .category
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

        Ok(NewExpense {
            title: self.title.map(|t| t.trim().to_string()).unwrap_or_default(),
            amount_cents,
            category,
            date: date.format("%Y-%m-%d").to_string(),
            recurring,
            note: self
                .note
                .map(|n| n.trim().to_string())
                .filter(|n| !n.is_empty()),
        })
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by an ISO time part.
fn parse_date(value: &str) -> AppResult<NaiveDate> {
    let value = value.trim();
    let date_part = match value.split_once('T') {
        Some((date, _)) => date,
        None => value,
    };
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid date: {}", value)))
}

pub fn currency_symbol(currency: &str) -> &'static str {
    match currency.to_uppercase().as_str() {
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "JPY" => "¥",
        "CNY" => "¥",
        "CAD" => "C$",
        "AUD" => "A$",
        "CHF" => "CHF ",
        "INR" => "₹",
        "BRL" => "R$",
        "MXN" => "MX$",
        _ => "$",
    }
}
