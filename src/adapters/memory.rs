use crate::domain::model::{TableId, TableRow};
use crate::domain::ports::ReferenceTableProvider;
use crate::utils::error::{ConsultError, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Fixture provider holding parsed rows, with failure and stall injection.
#[derive(Debug, Default)]
pub struct InMemoryTableProvider {
    tables: HashMap<TableId, Vec<TableRow>>,
    failing: HashSet<TableId>,
    stalled: Mutex<HashSet<TableId>>,
    calls: AtomicUsize,
    abandoned: Arc<AtomicUsize>,
}

/// Counts a stalled fetch whose future was dropped before it answered.
struct AbandonGuard(Arc<AtomicUsize>);

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

impl InMemoryTableProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: TableId, rows: Vec<TableRow>) {
        self.tables.insert(table, rows);
    }

    /// The table answers with a transport error.
    pub fn fail(&mut self, table: TableId) {
        self.failing.insert(table);
    }

    /// The next fetch of the table never answers; later fetches behave normally.
    pub fn stall(&mut self, table: TableId) {
        if let Ok(stalled) = self.stalled.get_mut() {
            stalled.insert(table);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Stalled fetches dropped by their caller.
    pub fn abandoned(&self) -> usize {
        self.abandoned.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReferenceTableProvider for InMemoryTableProvider {
    async fn fetch_table(&self, table: TableId) -> Result<Vec<TableRow>> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let stall = self
            .stalled
            .lock()
            .map(|mut stalled| stalled.remove(&table))
            .unwrap_or(false);
        if stall {
            let _guard = AbandonGuard(Arc::clone(&self.abandoned));
            std::future::pending::<()>().await;
        }
        if self.failing.contains(&table) {
            return Err(ConsultError::MalformedResponse {
                table: table.to_string(),
                message: "injected failure".to_string(),
            });
        }

        Ok(self.tables.get(&table).cloned().unwrap_or_default())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
