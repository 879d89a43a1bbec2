// 💸 Expense Record + Manual Entry
// The persisted shape of an expense, and the form-style validation in front of it

use crate::category::Category;
use crate::interpreter::ExpenseCandidate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// EXPENSE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// Row id assigned by the store, 0 until inserted
    #[serde(default)]
    pub id: i64,

    pub amount: f64,

    pub description: String,

    /// Category label, e.g. "Food"
    pub category: String,

    /// When the expense happened
    pub date: DateTime<Utc>,

    /// When the record was made
    pub created_at: DateTime<Utc>,
}

impl Expense {
    pub fn new(amount: f64, description: &str, category: Category, date: DateTime<Utc>) -> Self {
        Expense {
            id: 0,
            amount,
            description: description.to_string(),
            category: category.label().to_string(),
            date,
            created_at: date,
        }
    }

    /// Stamp an interpreted candidate with the caller's clock
    pub fn from_candidate(candidate: ExpenseCandidate, now: DateTime<Utc>) -> Self {
        Expense {
            id: 0,
            amount: candidate.amount,
            description: candidate.description,
            category: candidate.category.label().to_string(),
            date: now,
            created_at: now,
        }
    }

    /// Typed category, if the stored label is still a known one
    pub fn category(&self) -> Option<Category> {
        self.category.parse().ok()
    }
}

// ============================================================================
// MANUAL ENTRY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryError {
    #[error("Please enter amount")]
    MissingAmount,

    #[error("Please enter valid amount")]
    InvalidAmount,

    #[error("Please enter description")]
    MissingDescription,

    #[error("Please select category")]
    MissingCategory,

    #[error("Unknown category: \"{0}\"")]
    UnknownCategory(String),
}

/// Raw form fields, exactly as typed
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ManualEntry {
    pub amount: String,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl ManualEntry {
    /// Check the fields in form order and build the record.
    /// `now` fills in a missing date and always becomes `created_at`.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<Expense, EntryError> {
        let amount_text = self.amount.trim();
        if amount_text.is_empty() {
            return Err(EntryError::MissingAmount);
        }

        let amount = amount_text
            .parse::<f64>()
            .ok()
            .filter(|a| a.is_finite() && *a > 0.0)
            .ok_or(EntryError::InvalidAmount)?;

        let description = self.description.trim();
        if description.is_empty() {
            return Err(EntryError::MissingDescription);
        }

        let category_text = self.category.trim();
        if category_text.is_empty() {
            return Err(EntryError::MissingCategory);
        }
        let category: Category = category_text
            .parse()
            .map_err(|_| EntryError::UnknownCategory(category_text.to_string()))?;

        Ok(Expense {
            id: 0,
            amount,
            description: description.to_string(),
            category: category.label().to_string(),
            date: self.date.unwrap_or(now),
            created_at: now,
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
