// 🎙️ Utterance Interpreter - free text → expense candidate
// Keyword rules as data, first match wins (same policy as a priority-sorted rule engine)

use crate::category::Category;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tracing::debug;

// ============================================================================
// KEYWORD RULES
// ============================================================================

/// One row of the keyword table: any substring hit assigns the category
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordRule {
    /// Rule ID for tracing
    pub id: &'static str,

    /// Lower-case substrings, any of which triggers the rule
    pub keywords: &'static [&'static str],

    /// Category to assign
    pub category: Category,
}

impl KeywordRule {
    /// `normalized` must already be lower-cased
    pub fn matches(&self, normalized: &str) -> bool {
        self.keywords.iter().any(|k| normalized.contains(k))
    }
}

/// Evaluated top to bottom. Shopping, Entertainment, Health and Bills have no
/// rule: those are reachable through manual entry only.
const KEYWORD_RULES: [KeywordRule; 3] = [
    KeywordRule {
        id: "food",
        keywords: &["food", "lunch", "dinner"],
        category: Category::Food,
    },
    KeywordRule {
        id: "transport",
        keywords: &["fuel", "gas", "uber"],
        category: Category::Transport,
    },
    KeywordRule {
        id: "groceries",
        keywords: &["grocery", "market"],
        category: Category::Groceries,
    },
];

/// The ordered keyword table
pub fn keyword_rules() -> &'static [KeywordRule] {
    &KEYWORD_RULES
}

// ============================================================================
// CANDIDATE
// ============================================================================

/// Structured result of interpreting one utterance. A value, not an entity:
/// the occurrence time is stamped later by whoever persists it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseCandidate {
    pub amount: f64,
    /// The whole utterance, verbatim
    pub description: String,
    pub category: Category,
}

// ============================================================================
// INTERPRETER
// ============================================================================

fn amount_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9]+(\.[0-9]+)?$").expect("amount pattern is valid"))
}

/// First whitespace-delimited token that is a plain decimal number.
///
/// `$12.50` and `1,200` are not plain decimals and are skipped. Later numbers
/// are ignored, never summed. Returns `0.0` when nothing matches, or when the
/// first number overflows `f64`.
pub fn extract_amount(normalized: &str) -> f64 {
    normalized
        .split_whitespace()
        .find(|token| amount_pattern().is_match(token))
        .and_then(|token| token.parse::<f64>().ok())
        .filter(|amount| amount.is_finite())
        .unwrap_or(0.0)
}

/// First rule in table order whose keywords occur anywhere in the text
pub fn matching_rule(normalized: &str) -> Option<&'static KeywordRule> {
    KEYWORD_RULES.iter().find(|rule| rule.matches(normalized))
}

/// Category for an already lower-cased utterance, `Other` when no rule hits
pub fn classify(normalized: &str) -> Category {
    matching_rule(normalized)
        .map(|rule| rule.category)
        .unwrap_or_default()
}

/// Turn an utterance into an expense candidate. Never fails: whatever cannot
/// be extracted falls back to `0.0` / `Other`.
pub fn interpret(utterance: &str) -> ExpenseCandidate {
    let normalized = utterance.to_lowercase();

    let amount = extract_amount(&normalized);
    let category = classify(&normalized);

    debug!(amount, category = category.id(), "interpreted utterance");

    ExpenseCandidate {
        amount,
        description: utterance.to_string(),
        category,
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_numeric_token_wins() {
        let candidate = interpret("spent 12.50 and 30 on food");
        assert_eq!(candidate.amount, 12.50);
        assert_eq!(candidate.category, Category::Food);
    }

    #[test]
    fn test_currency_prefixed_amount_is_skipped() {
        let candidate = interpret("spent $12.50 on lunch");
        assert_eq!(candidate.amount, 0.0);
        assert_eq!(candidate.category, Category::Food);
    }

    #[test]
    fn test_thousands_separator_is_skipped() {
        let candidate = interpret("paid 1,200 then 40 for uber");
        assert_eq!(candidate.amount, 40.0);
        assert_eq!(candidate.category, Category::Transport);
    }

    #[test]
    fn test_incomplete_decimals_do_not_match() {
        assert_eq!(extract_amount("12. dollars"), 0.0);
        assert_eq!(extract_amount(".5 dollars"), 0.0);
        assert_eq!(extract_amount("12.5.1 then 7"), 7.0);
    }

    #[test]
    fn test_overflowing_amount_falls_back_to_zero() {
        let utterance = format!("{} for fuel", "9".repeat(400));
        let candidate = interpret(&utterance);
        assert_eq!(candidate.amount, 0.0);
        assert_eq!(candidate.category, Category::Transport);

        let json = serde_json::to_string(&candidate).unwrap();
        let back: ExpenseCandidate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, candidate);

        assert_eq!(extract_amount("999999999999999999999"), 1e21);
    }

    #[test]
    fn test_integer_amount() {
        assert_eq!(interpret("45 fuel for car").amount, 45.0);
    }

    #[test]
    fn test_category_first_match_wins() {
        // Groceries keyword appears first in the sentence, Food rule is first in the table
        let candidate = interpret("grocery run for dinner food");
        assert_eq!(candidate.category, Category::Food);
    }

    #[test]
    fn test_transport_beats_groceries() {
        assert_eq!(interpret("gas station market").category, Category::Transport);
    }

    #[test]
    fn test_substring_match_inside_words() {
        // "gas" sits inside "vegas"
        assert_eq!(interpret("trip to vegas 300").category, Category::Transport);
        assert_eq!(interpret("supermarket 60").category, Category::Groceries);
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let candidate = interpret("LUNCH with team 18");
        assert_eq!(candidate.category, Category::Food);
        assert_eq!(candidate.amount, 18.0);
        assert_eq!(candidate.description, "LUNCH with team 18");
    }

    #[test]
    fn test_default_fallback() {
        let candidate = interpret("random thought with no numbers");
        assert_eq!(candidate.amount, 0.0);
        assert_eq!(candidate.category, Category::Other);
        assert_eq!(candidate.description, "random thought with no numbers");
    }

    #[test]
    fn test_empty_and_whitespace_inputs() {
        let empty = interpret("");
        assert_eq!(empty.amount, 0.0);
        assert_eq!(empty.category, Category::Other);
        assert_eq!(empty.description, "");

        let blank = interpret("   \t ");
        assert_eq!(blank.amount, 0.0);
        assert_eq!(blank.category, Category::Other);
        assert_eq!(blank.description, "   \t ");
    }

    #[test]
    fn test_description_is_verbatim() {
        for input in ["Dinner at Luigi's, 42!", "  Uber  home 12.30 ", "Ünïcode Märket 3"] {
            assert_eq!(interpret(input).description, input);
        }
    }

    #[test]
    fn test_manual_only_categories_are_unreachable() {
        for input in ["netflix 15.99", "pharmacy 8", "electricity bill 60", "new shoes 90"] {
            assert_eq!(interpret(input).category, Category::Other, "{}", input);
        }
    }

    #[test]
    fn test_interpret_is_deterministic() {
        let input = "Dinner 23.40 after the market";
        assert_eq!(interpret(input), interpret(input));
    }

    #[test]
    fn test_keyword_table_order() {
        let order: Vec<Category> = keyword_rules().iter().map(|r| r.category).collect();
        assert_eq!(order, vec![Category::Food, Category::Transport, Category::Groceries]);
        assert!(keyword_rules().iter().all(|r| r
            .keywords
            .iter()
            .all(|k| *k == k.to_lowercase())));
    }

    #[test]
    fn test_classify_without_match() {
        assert_eq!(classify("movie tickets"), Category::Other);
        assert!(matching_rule("movie tickets").is_none());
    }
}
