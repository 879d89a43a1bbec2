// 🏷️ Expense Categories - closed set with stable identifiers
// Display labels are a pure mapping, kept apart from the data itself

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ============================================================================
// CATEGORY
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Food,
    Transport,
    Shopping,
    Entertainment,
    Health,
    Bills,
    Groceries,
    #[default]
    Other,
}

impl Category {
    /// Every category, in declaration order (the order pickers list them)
    pub const ALL: [Category; 8] = [
        Category::Food,
        Category::Transport,
        Category::Shopping,
        Category::Entertainment,
        Category::Health,
        Category::Bills,
        Category::Groceries,
        Category::Other,
    ];

    /// Stable identifier, never shown to users
    pub fn id(&self) -> &'static str {
        match self {
            Category::Food => "FOOD",
            Category::Transport => "TRANSPORT",
            Category::Shopping => "SHOPPING",
            Category::Entertainment => "ENTERTAINMENT",
            Category::Health => "HEALTH",
            Category::Bills => "BILLS",
            Category::Groceries => "GROCERIES",
            Category::Other => "OTHER",
        }
    }

    /// Human-readable label (this is what gets persisted)
    pub fn label(&self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Transport => "Transport",
            Category::Shopping => "Shopping",
            Category::Entertainment => "Entertainment",
            Category::Health => "Health",
            Category::Bills => "Bills",
            Category::Groceries => "Groceries",
            Category::Other => "Other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown category: \"{input}\"")]
pub struct CategoryParseError {
    pub input: String,
}

impl FromStr for Category {
    type Err = CategoryParseError;

    /// Accepts either the identifier or the label, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.id().eq_ignore_ascii_case(needle) || c.label().eq_ignore_ascii_case(needle))
            .ok_or_else(|| CategoryParseError {
                input: s.to_string(),
            })
    }
}

// ============================================================================
// TESTS
// ============================================================================
