// Finance Manager - Core Library
// Exposes all modules for use in CLI, API server, and tests

pub mod category;
pub mod interpreter;
pub mod expense;
pub mod db;
pub mod worker;
pub mod summary;
pub mod settings;

#[cfg(feature = "tui")]
pub mod ui;

#[cfg(feature = "server")]
pub mod server;

// Re-export commonly used types
pub use category::{Category, CategoryParseError};
pub use interpreter::{
    classify, extract_amount, interpret, keyword_rules,
    ExpenseCandidate, KeywordRule,
};
pub use expense::{EntryError, Expense, ManualEntry};
pub use db::{setup_database, ExpenseStore};
pub use worker::{Snapshot, StoreWorker};
pub use summary::{
    category_breakdown, format_currency, format_date, format_simple_date,
    sample_expenses, seed_if_empty, CategoryShare, Summary,
};
pub use settings::Settings;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the global `tracing` subscriber. `RUST_LOG` wins over `level`.
pub fn init_tracing(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("finance_manager={level},finance_server={level}")));

    // Tests and repeated calls may find a subscriber already installed
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
