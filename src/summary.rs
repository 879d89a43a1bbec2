// 📊 Summary - totals, balance and category breakdown
// Client-side sums over an already loaded list, plus display formatting

use crate::category::Category;
use crate::db::ExpenseStore;
use crate::expense::Expense;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

// ============================================================================
// BREAKDOWN
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub total: f64,
    /// Share of all spending, 0-100
    pub percent: f64,
}

/// Group by category label, biggest spend first (ties by label)
pub fn category_breakdown(expenses: &[Expense]) -> Vec<CategoryShare> {
    let mut totals: HashMap<&str, f64> = HashMap::new();
    for expense in expenses {
        *totals.entry(expense.category.as_str()).or_insert(0.0) += expense.amount;
    }

    let grand_total: f64 = totals.values().sum();

    let mut shares: Vec<CategoryShare> = totals
        .into_iter()
        .map(|(category, total)| CategoryShare {
            category: category.to_string(),
            total,
            percent: if grand_total > 0.0 {
                total / grand_total * 100.0
            } else {
                0.0
            },
        })
        .collect();

    shares.sort_by(|a, b| {
        b.total
            .total_cmp(&a.total)
            .then_with(|| a.category.cmp(&b.category))
    });
    shares
}

// ============================================================================
// SUMMARY
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub total_expenses: f64,
    pub income: f64,
    pub balance: f64,
    pub expense_count: usize,
    pub breakdown: Vec<CategoryShare>,
    pub recent: Vec<Expense>,
}

impl Summary {
    /// `expenses` is expected newest first, as the store returns them
    pub fn from_expenses(expenses: &[Expense], income: f64, recent_limit: usize) -> Self {
        let total_expenses: f64 = expenses.iter().map(|e| e.amount).sum();

        Summary {
            total_expenses,
            income,
            balance: income - total_expenses,
            expense_count: expenses.len(),
            breakdown: category_breakdown(expenses),
            recent: expenses.iter().take(recent_limit).cloned().collect(),
        }
    }
}

// ============================================================================
// FORMATTING
// ============================================================================

/// US dollar amount with thousands separators: `$1,234.50`, `-$20.00`
pub fn format_currency(amount: f64) -> String {
    if amount.is_nan() {
        return "$—".to_string();
    }
    if amount.is_infinite() {
        return if amount < 0.0 { "-$∞" } else { "$∞" }.to_string();
    }

    let digits = format!("{:.2}", amount.abs());
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    // -0.001 rounds to "0.00" and must not show a sign
    let rounds_to_zero = whole.bytes().all(|b| b == b'0') && fraction.bytes().all(|b| b == b'0');
    let sign = if amount < 0.0 && !rounds_to_zero { "-" } else { "" };
    format!("{}${}.{}", sign, grouped, fraction)
}

/// `05 Mar 2024, 02:15 PM`
pub fn format_date(date: &DateTime<Utc>) -> String {
    date.format("%d %b %Y, %I:%M %p").to_string()
}

/// `05/03/2024`
pub fn format_simple_date(date: &DateTime<Utc>) -> String {
    date.format("%d/%m/%Y").to_string()
}

// ============================================================================
// SAMPLE DATA
// ============================================================================

pub fn sample_expenses(now: DateTime<Utc>) -> Vec<Expense> {
    vec![
        Expense::new(25.50, "Lunch at Restaurant", Category::Food, now),
        Expense::new(45.00, "Fuel for car", Category::Transport, now),
        Expense::new(120.00, "Monthly groceries", Category::Groceries, now),
        Expense::new(15.99, "Netflix subscription", Category::Entertainment, now),
    ]
}

/// Insert the samples only into an empty store. Returns how many went in.
pub fn seed_if_empty(store: &ExpenseStore, now: DateTime<Utc>) -> Result<usize> {
    if store.count()? > 0 {
        return Ok(0);
    }

    let samples = sample_expenses(now);
    for expense in &samples {
        store.insert(expense)?;
    }

    info!(count = samples.len(), "seeded sample expenses");
    Ok(samples.len())
}

// ============================================================================
// TESTS
// ============================================================================
