use crate::expense::Expense;
use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use tracing::{debug, info};

/// Handle to the expense database. Built explicitly by whoever owns the
/// process and passed to the code that needs it.
pub struct ExpenseStore {
    conn: Connection,
}

const SELECT_COLUMNS: &str = "SELECT id, amount, description, category, date, created_at FROM expenses";

impl ExpenseStore {
    /// Open (or create) a database file and make sure the schema exists
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {:?}", path))?;
        info!(path = %path.display(), "opened expense database");
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(ExpenseStore { conn })
    }

    /// Insert and return the new row id
    pub fn insert(&self, expense: &Expense) -> Result<i64> {
        self.conn
            .execute(
                "INSERT INTO expenses (amount, description, category, date, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    expense.amount,
                    expense.description,
                    expense.category,
                    expense.date.to_rfc3339(),
                    expense.created_at.to_rfc3339(),
                ],
            )
            .context("Failed to insert expense")?;

        let id = self.conn.last_insert_rowid();
        debug!(id, amount = expense.amount, category = %expense.category, "inserted expense");
        Ok(id)
    }

    /// Overwrite every field of the row with the same id
    pub fn update(&self, expense: &Expense) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE expenses
                 SET amount = ?1, description = ?2, category = ?3, date = ?4, created_at = ?5
                 WHERE id = ?6",
                params![
                    expense.amount,
                    expense.description,
                    expense.category,
                    expense.date.to_rfc3339(),
                    expense.created_at.to_rfc3339(),
                    expense.id,
                ],
            )
            .context("Failed to update expense")?;

        if changed == 0 {
            bail!("Expense {} not found", expense.id);
        }
        Ok(())
    }

    pub fn delete(&self, id: i64) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM expenses WHERE id = ?1", params![id])
            .context("Failed to delete expense")?;

        if changed == 0 {
            bail!("Expense {} not found", id);
        }
        Ok(())
    }

    /// Remove every expense, returning how many rows went
    pub fn delete_all(&self) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM expenses", [])
            .context("Failed to delete expenses")?;
        info!(removed, "deleted all expenses");
        Ok(removed)
    }

    pub fn get(&self, id: i64) -> Result<Option<Expense>> {
        let expense = self
            .conn
            .query_row(
                &format!("{} WHERE id = ?1", SELECT_COLUMNS),
                params![id],
                row_to_expense,
            )
            .optional()?;
        Ok(expense)
    }

    /// Newest first
    pub fn all(&self) -> Result<Vec<Expense>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY date DESC, id DESC", SELECT_COLUMNS))?;

        let expenses = stmt
            .query_map([], row_to_expense)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(expenses)
    }

    /// Expenses with `start <= date <= end`, newest first
    pub fn between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Expense>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE date BETWEEN ?1 AND ?2 ORDER BY date DESC, id DESC",
            SELECT_COLUMNS
        ))?;

        let expenses = stmt
            .query_map(params![start.to_rfc3339(), end.to_rfc3339()], row_to_expense)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(expenses)
    }

    pub fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM expenses", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Sum of all amounts, 0.0 when empty
    pub fn total(&self) -> Result<f64> {
        let total: f64 = self.conn.query_row(
            "SELECT COALESCE(SUM(amount), 0.0) FROM expenses",
            [],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// `(category label, sum)` ordered by label
    pub fn category_totals(&self) -> Result<Vec<(String, f64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT category, SUM(amount) AS total
             FROM expenses
             GROUP BY category
             ORDER BY category",
        )?;

        let totals = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(totals)
    }
}

/// Dates are stored as RFC 3339 text, which sorts chronologically for UTC
pub fn setup_database(conn: &Connection) -> Result<()> {
    // WAL for crash recovery; in-memory databases silently stay in "memory" mode
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS expenses (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            amount REAL NOT NULL,
            description TEXT NOT NULL,
            category TEXT NOT NULL,
            date TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(date)",
        [],
    )?;

    Ok(())
}

fn parse_timestamp(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let text: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&text)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

fn row_to_expense(row: &Row) -> rusqlite::Result<Expense> {
    Ok(Expense {
        id: row.get(0)?,
        amount: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        date: parse_timestamp(row, 4)?,
        created_at: parse_timestamp(row, 5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use chrono::{Duration, TimeZone};

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 9, 30, 0).unwrap()
    }

    fn seeded() -> ExpenseStore {
        let store = ExpenseStore::open_in_memory().unwrap();
        store.insert(&Expense::new(25.50, "Lunch at Restaurant", Category::Food, at(3))).unwrap();
        store.insert(&Expense::new(45.00, "Fuel for car", Category::Transport, at(1))).unwrap();
        store.insert(&Expense::new(120.00, "Monthly groceries", Category::Groceries, at(7))).unwrap();
        store.insert(&Expense::new(4.50, "Coffee and food", Category::Food, at(5))).unwrap();
        store
    }

    #[test]
    fn test_insert_and_get() {
        let store = ExpenseStore::open_in_memory().unwrap();
        let expense = Expense::new(12.0, "Uber home", Category::Transport, at(2));

        let id = store.insert(&expense).unwrap();
        let stored = store.get(id).unwrap().unwrap();

        assert_eq!(stored.id, id);
        assert_eq!(stored.amount, 12.0);
        assert_eq!(stored.description, "Uber home");
        assert_eq!(stored.category, "Transport");
        assert_eq!(stored.date, at(2));
        assert!(store.get(id + 100).unwrap().is_none());
    }

    #[test]
    fn test_all_is_newest_first() {
        let store = seeded();
        let descriptions: Vec<String> = store.all().unwrap().into_iter().map(|e| e.description).collect();

        assert_eq!(
            descriptions,
            vec!["Monthly groceries", "Coffee and food", "Lunch at Restaurant", "Fuel for car"]
        );
    }

    #[test]
    fn test_between_is_inclusive() {
        let store = seeded();
        let found = store.between(at(3), at(5)).unwrap();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].description, "Coffee and food");
        assert_eq!(found[1].description, "Lunch at Restaurant");

        let none = store.between(at(20), at(20) + Duration::days(1)).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn test_update() {
        let store = seeded();
        let mut expense = store.all().unwrap().remove(0);
        expense.amount = 99.0;
        expense.category = Category::Shopping.label().to_string();

        store.update(&expense).unwrap();

        let stored = store.get(expense.id).unwrap().unwrap();
        assert_eq!(stored.amount, 99.0);
        assert_eq!(stored.category, "Shopping");
    }

    #[test]
    fn test_update_missing_row_fails() {
        let store = ExpenseStore::open_in_memory().unwrap();
        let mut expense = Expense::new(1.0, "ghost", Category::Other, at(1));
        expense.id = 42;

        let err = store.update(&expense).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_delete_and_delete_all() {
        let store = seeded();
        let first = store.all().unwrap()[0].id;

        store.delete(first).unwrap();
        assert_eq!(store.count().unwrap(), 3);
        assert!(store.delete(first).is_err());

        assert_eq!(store.delete_all().unwrap(), 3);
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_totals() {
        let store = seeded();
        assert!((store.total().unwrap() - 195.0).abs() < 1e-9);

        let totals = store.category_totals().unwrap();
        assert_eq!(
            totals,
            vec![
                ("Food".to_string(), 30.0),
                ("Groceries".to_string(), 120.0),
                ("Transport".to_string(), 45.0),
            ]
        );
    }

    #[test]
    fn test_totals_on_empty_store() {
        let store = ExpenseStore::open_in_memory().unwrap();
        assert_eq!(store.total().unwrap(), 0.0);
        assert!(store.category_totals().unwrap().is_empty());
        assert!(store.all().unwrap().is_empty());
    }

    #[test]
    fn test_file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("finance.db");

        {
            let store = ExpenseStore::open(&path).unwrap();
            store.insert(&Expense::new(8.0, "Market fruit", Category::Groceries, at(4))).unwrap();
        }

        let store = ExpenseStore::open(&path).unwrap();
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(store.all().unwrap()[0].description, "Market fruit");
    }
}
