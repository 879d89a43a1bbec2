// 🧵 Store Worker - single writer thread that owns the expense store
//
// Writes are fire-and-forget: callers enqueue a command and move on, they never
// see whether it worked. Failures only show up in the log. Readers subscribe
// and get a fresh snapshot after every successful write.

use crate::db::ExpenseStore;
use crate::expense::Expense;
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Everything a list/total/chart view needs, taken after a write
#[derive(Debug, Clone, Default, Serialize)]
pub struct Snapshot {
    /// Newest first
    pub expenses: Vec<Expense>,
    pub total: f64,
    pub category_totals: Vec<(String, f64)>,
}

impl Snapshot {
    pub fn load(store: &ExpenseStore) -> Result<Self> {
        Ok(Snapshot {
            expenses: store.all()?,
            total: store.total()?,
            category_totals: store.category_totals()?,
        })
    }
}

enum Command {
    Insert(Expense),
    Update(Expense),
    Delete(i64),
    DeleteAll,
    Subscribe(Sender<Snapshot>),
    Shutdown,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Command::Insert(_) => "insert",
            Command::Update(_) => "update",
            Command::Delete(_) => "delete",
            Command::DeleteAll => "delete_all",
            Command::Subscribe(_) => "subscribe",
            Command::Shutdown => "shutdown",
        }
    }
}

pub struct StoreWorker {
    sender: Sender<Command>,
    handle: Option<JoinHandle<ExpenseStore>>,
}

impl StoreWorker {
    /// Move the store onto its own thread
    pub fn spawn(store: ExpenseStore) -> Result<Self> {
        let (sender, receiver) = mpsc::channel();

        let handle = thread::Builder::new()
            .name("expense-store".to_string())
            .spawn(move || run(store, receiver))
            .context("Failed to spawn store worker")?;

        Ok(StoreWorker {
            sender,
            handle: Some(handle),
        })
    }

    pub fn insert(&self, expense: Expense) {
        self.send(Command::Insert(expense));
    }

    pub fn update(&self, expense: Expense) {
        self.send(Command::Update(expense));
    }

    pub fn delete(&self, id: i64) {
        self.send(Command::Delete(id));
    }

    pub fn delete_all(&self) {
        self.send(Command::DeleteAll);
    }

    /// The receiver gets the current state right away, then one snapshot per
    /// successful write
    pub fn subscribe(&self) -> Receiver<Snapshot> {
        let (tx, rx) = mpsc::channel();
        self.send(Command::Subscribe(tx));
        rx
    }

    /// Finish every queued command, stop the thread and return the store
    pub fn shutdown(mut self) -> Result<ExpenseStore> {
        self.stop()
            .ok_or_else(|| anyhow!("Store worker already stopped"))?
    }

    fn send(&self, command: Command) {
        let name = command.name();
        if self.sender.send(command).is_err() {
            warn!(command = name, "store worker is gone, dropping command");
        }
    }

    fn stop(&mut self) -> Option<Result<ExpenseStore>> {
        let handle = self.handle.take()?;
        let _ = self.sender.send(Command::Shutdown);
        Some(handle.join().map_err(|_| anyhow!("Store worker panicked")))
    }
}

impl Drop for StoreWorker {
    fn drop(&mut self) {
        if let Some(Err(e)) = self.stop() {
            warn!("store worker did not stop cleanly: {}", e);
        }
    }
}

fn run(store: ExpenseStore, receiver: Receiver<Command>) -> ExpenseStore {
    let mut subscribers: Vec<Sender<Snapshot>> = Vec::new();

    while let Ok(command) = receiver.recv() {
        let name = command.name();
        let outcome = match command {
            Command::Insert(expense) => store.insert(&expense).map(|_| ()),
            Command::Update(expense) => store.update(&expense),
            Command::Delete(id) => store.delete(id),
            Command::DeleteAll => store.delete_all().map(|_| ()),
            Command::Subscribe(subscriber) => {
                match Snapshot::load(&store) {
                    Ok(snapshot) => {
                        if subscriber.send(snapshot).is_ok() {
                            subscribers.push(subscriber);
                        }
                    }
                    Err(e) => warn!("failed to load snapshot for subscriber: {:#}", e),
                }
                continue;
            }
            Command::Shutdown => break,
        };

        match outcome {
            Ok(()) => {
                debug!(command = name, "store write applied");
                publish(&store, &mut subscribers);
            }
            Err(e) => warn!(command = name, "store write failed: {:#}", e),
        }
    }

    store
}

fn publish(store: &ExpenseStore, subscribers: &mut Vec<Sender<Snapshot>>) {
    if subscribers.is_empty() {
        return;
    }

    match Snapshot::load(store) {
        Ok(snapshot) => subscribers.retain(|s| s.send(snapshot.clone()).is_ok()),
        Err(e) => warn!("failed to load snapshot: {:#}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::Category;
    use crate::interpreter::interpret;
    use chrono::Utc;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn test_fire_and_forget_writes_land() {
        let worker = StoreWorker::spawn(ExpenseStore::open_in_memory().unwrap()).unwrap();

        worker.insert(Expense::from_candidate(interpret("lunch 12"), Utc::now()));
        worker.insert(Expense::from_candidate(interpret("uber 30"), Utc::now()));

        let store = worker.shutdown().unwrap();
        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.total().unwrap(), 42.0);
    }

    #[test]
    fn test_subscriber_sees_initial_and_updated_state() {
        let worker = StoreWorker::spawn(ExpenseStore::open_in_memory().unwrap()).unwrap();
        let snapshots = worker.subscribe();

        let initial = snapshots.recv_timeout(WAIT).unwrap();
        assert!(initial.expenses.is_empty());
        assert_eq!(initial.total, 0.0);

        worker.insert(Expense::new(20.0, "Dinner", Category::Food, Utc::now()));
        let after_insert = snapshots.recv_timeout(WAIT).unwrap();
        assert_eq!(after_insert.expenses.len(), 1);
        assert_eq!(after_insert.total, 20.0);
        assert_eq!(after_insert.category_totals, vec![("Food".to_string(), 20.0)]);

        let id = after_insert.expenses[0].id;
        let mut changed = after_insert.expenses[0].clone();
        changed.amount = 25.0;
        worker.update(changed);
        assert_eq!(snapshots.recv_timeout(WAIT).unwrap().total, 25.0);

        worker.delete(id);
        assert!(snapshots.recv_timeout(WAIT).unwrap().expenses.is_empty());
    }

    #[test]
    fn test_failed_write_is_silent() {
        let worker = StoreWorker::spawn(ExpenseStore::open_in_memory().unwrap()).unwrap();
        let snapshots = worker.subscribe();
        snapshots.recv_timeout(WAIT).unwrap();

        // No such row: nothing is published, nothing is returned to the caller
        worker.delete(999);
        worker.insert(Expense::new(1.0, "gum", Category::Other, Utc::now()));

        let next = snapshots.recv_timeout(WAIT).unwrap();
        assert_eq!(next.expenses.len(), 1);
        assert_eq!(next.expenses[0].description, "gum");
    }

    #[test]
    fn test_delete_all() {
        let worker = StoreWorker::spawn(ExpenseStore::open_in_memory().unwrap()).unwrap();
        for utterance in ["food 1", "gas 2", "market 3"] {
            worker.insert(Expense::from_candidate(interpret(utterance), Utc::now()));
        }
        worker.delete_all();

        let store = worker.shutdown().unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_dropped_subscriber_is_forgotten() {
        let worker = StoreWorker::spawn(ExpenseStore::open_in_memory().unwrap()).unwrap();
        drop(worker.subscribe());

        worker.insert(Expense::new(3.0, "tea", Category::Food, Utc::now()));
        let store = worker.shutdown().unwrap();
        assert_eq!(store.count().unwrap(), 1);
    }
}
