use anyhow::{Context, Result};
use chrono::{NaiveDate, TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use finance_manager::{
    format_currency, format_date, init_tracing, interpret, seed_if_empty, Expense,
    ExpenseStore, ManualEntry, Settings, Summary,
};

#[derive(Debug, Parser)]
#[command(name = "finance-manager", version, about = "Track expenses by hand or by voice")]
struct Cli {
    /// Settings file (defaults to ./finance.toml when present)
    #[arg(long, global = true, env = "FINANCE_CONFIG")]
    config: Option<PathBuf>,

    /// Database file, overrides the settings
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Add an expense from form fields
    Add {
        #[arg(long)]
        amount: String,
        #[arg(long)]
        description: String,
        /// One of: Food, Transport, Shopping, Entertainment, Health, Bills, Groceries, Other
        #[arg(long)]
        category: String,
        /// Day the expense happened (YYYY-MM-DD), today if omitted
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Add an expense from a spoken sentence, e.g. `voice lunch 12.50`
    Voice {
        #[arg(required = true, num_args = 1..)]
        utterance: Vec<String>,
    },
    /// List expenses, newest first
    List {
        #[arg(long)]
        limit: Option<usize>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Totals, balance and spending by category
    Summary {
        #[arg(long)]
        json: bool,
    },
    /// Delete one expense by id
    Delete { id: i64 },
    /// Delete every expense
    Clear,
    /// Load sample expenses into an empty database
    Seed,
    /// Interactive dashboard
    #[cfg(feature = "tui")]
    Ui,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    if let Some(database) = cli.database {
        settings.database_path = database;
    }

    init_tracing(&settings.log_level);

    let store = ExpenseStore::open(&settings.database_path)?;

    match cli.command {
        Some(Command::Add {
            amount,
            description,
            category,
            date,
        }) => {
            let entry = ManualEntry {
                amount,
                description,
                category,
                date: date
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|d| Utc.from_utc_datetime(&d)),
            };
            let mut expense = entry.validate(Utc::now())?;
            expense.id = store.insert(&expense)?;
            println!("✓ Expense saved!");
            print_expense(&expense);
        }
        Some(Command::Voice { utterance }) => {
            let text = utterance.join(" ");
            let mut expense = Expense::from_candidate(interpret(&text), Utc::now());
            expense.id = store.insert(&expense)?;
            println!("✓ Expense added via voice!");
            print_expense(&expense);
        }
        Some(Command::List { limit, json }) => {
            let mut expenses = store.all()?;
            expenses.truncate(limit.unwrap_or(usize::MAX));
            if json {
                println!("{}", serde_json::to_string_pretty(&expenses)?);
            } else if expenses.is_empty() {
                println!("No expenses yet");
            } else {
                expenses.iter().for_each(print_expense);
            }
        }
        Some(Command::Summary { json }) => {
            let expenses = store.all()?;
            let summary =
                Summary::from_expenses(&expenses, settings.monthly_income, settings.recent_limit);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }
        Some(Command::Delete { id }) => {
            store.delete(id)?;
            println!("✓ Deleted expense {}", id);
        }
        Some(Command::Clear) => {
            let removed = store.delete_all()?;
            println!("✓ Deleted {} expenses", removed);
        }
        Some(Command::Seed) => {
            let inserted = seed_if_empty(&store, Utc::now())?;
            if inserted == 0 {
                println!("Database already has expenses, nothing seeded");
            } else {
                println!("✓ Seeded {} sample expenses", inserted);
            }
        }
        #[cfg(feature = "tui")]
        Some(Command::Ui) | None => run_ui_mode(store, &settings)?,
        #[cfg(not(feature = "tui"))]
        None => {
            eprintln!("❌ TUI mode not available!");
            eprintln!("   Rebuild with: cargo build --features tui");
            eprintln!("   Or use a subcommand, see --help");
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_expense(expense: &Expense) {
    println!(
        "#{:<5} {}  {:>12}  {:<13}  {}",
        expense.id,
        format_date(&expense.date),
        format_currency(expense.amount),
        expense.category,
        expense.description
    );
}

fn print_summary(summary: &Summary) {
    println!("Balance:   {}", format_currency(summary.balance));
    println!("Income:    {}", format_currency(summary.income));
    println!("Expenses:  {} ({} records)", format_currency(summary.total_expenses), summary.expense_count);

    if !summary.breakdown.is_empty() {
        println!("\nSpending by Category");
        for share in &summary.breakdown {
            println!(
                "  {:<14} {:>12}  {:>5.1}%",
                share.category,
                format_currency(share.total),
                share.percent
            );
        }
    }

    if !summary.recent.is_empty() {
        println!("\nRecent");
        for expense in &summary.recent {
            print_expense(expense);
        }
    }
}

#[cfg(feature = "tui")]
fn run_ui_mode(store: ExpenseStore, settings: &Settings) -> Result<()> {
    use finance_manager::ui::{run_ui, App};
    use finance_manager::StoreWorker;

    let worker = StoreWorker::spawn(store)?;
    let mut app = App::new(settings.monthly_income, settings.recent_limit);

    let res = run_ui(&mut app, &worker);
    worker.shutdown()?;
    res
}
