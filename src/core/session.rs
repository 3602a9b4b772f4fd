use crate::core::evaluation::evaluate_pair;
use crate::core::memo::{ResidualMemo, ResidualSnapshot};
use crate::core::report::ConsultationReport;
use crate::core::resolver::{CombinedTable, TableSnapshot, ZoneAblationTable};
use crate::domain::model::{EyePair, OpticalZone, RankingPolicy, TableId, TableRow};
use crate::domain::ports::{ConfigProvider, ReferenceTableProvider};
use crate::utils::error::{ConsultError, Result};
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

pub type ReportReceiver = watch::Receiver<Option<Arc<ConsultationReport>>>;

#[derive(Debug, Clone)]
pub struct Evaluation {
    pub report: Arc<ConsultationReport>,
    /// false when the result matched the previous evaluation and no notification went out
    pub changed: bool,
}

/// 評估協調器：並行抓取參考表、計算並在結果變化時通知
pub struct ConsultationSession {
    provider: Arc<dyn ReferenceTableProvider>,
    request_timeout: Duration,
    policy: RankingPolicy,
    root: CancellationToken,
    current: Option<CancellationToken>,
    memo: ResidualMemo,
    notifier: watch::Sender<Option<Arc<ConsultationReport>>>,
}

impl ConsultationSession {
    pub fn new<C: ConfigProvider>(provider: Arc<dyn ReferenceTableProvider>, config: &C) -> Self {
        let (notifier, _) = watch::channel(None);
        Self {
            provider,
            request_timeout: config.request_timeout(),
            policy: config.ranking_policy(),
            root: CancellationToken::new(),
            current: None,
            memo: ResidualMemo::new(),
            notifier,
        }
    }

    pub fn subscribe(&self) -> ReportReceiver {
        self.notifier.subscribe()
    }

    /// Cancelling this token stops every fetch the session has in flight.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.root.clone()
    }

    pub fn policy(&self) -> &RankingPolicy {
        &self.policy
    }

    pub fn shutdown(&mut self) {
        tracing::debug!("Shutting down consultation session");
        self.root.cancel();
        self.current = None;
    }

    /// Fetches all five tables concurrently. Each table degrades to `None` on its own.
    pub async fn fetch_tables(&self, token: &CancellationToken) -> TableSnapshot {
        let spawn = |table: TableId| {
            tokio::spawn(fetch_one(
                Arc::clone(&self.provider),
                table,
                self.request_timeout,
                token.clone(),
            ))
        };

        let combined_task = spawn(TableId::Combined);
        let zone_tasks: Vec<_> = OpticalZone::ALL
            .into_iter()
            .map(|zone| spawn(TableId::Zone(zone)))
            .collect();

        let (combined_rows, zone_rows) = tokio::join!(combined_task, join_all(zone_tasks));

        let combined = joined(TableId::Combined, combined_rows)
            .and_then(|rows| CombinedTable::from_rows(&rows));

        let mut zones: [Option<ZoneAblationTable>; 4] = Default::default();
        for (zone, rows) in OpticalZone::ALL.into_iter().zip(zone_rows) {
            zones[zone.index()] = joined(TableId::Zone(zone), rows)
                .and_then(|rows| ZoneAblationTable::from_rows(zone, rows));
        }

        let snapshot = TableSnapshot { combined, zones };
        tracing::info!(
            "📡 {}: {}/5 reference tables available",
            self.provider.name(),
            snapshot.available_tables()
        );
        snapshot
    }

    /// Runs one evaluation. A previous evaluation still fetching is cancelled first.
    ///
    /// Fails with [`ConsultError::SessionClosed`] once the session has been shut down.
    pub async fn evaluate(&mut self, pair: &EyePair) -> Result<Evaluation> {
        if self.root.is_cancelled() {
            tracing::warn!("⚠️ Evaluation requested after the session was shut down");
            return Err(ConsultError::SessionClosed);
        }
        if let Some(previous) = self.current.take() {
            previous.cancel();
        }
        let token = self.root.child_token();
        self.current = Some(token.clone());

        let tables = self.fetch_tables(&token).await;
        let report = Arc::new(evaluate_pair(pair, &tables, &self.policy));

        let changed = self.memo.update(ResidualSnapshot::of(&report));
        if changed {
            tracing::debug!("Residuals changed, notifying listeners");
            self.notifier.send_replace(Some(Arc::clone(&report)));
        } else {
            tracing::debug!("Residuals unchanged, notification suppressed");
        }

        Ok(Evaluation { report, changed })
    }
}

impl Drop for ConsultationSession {
    fn drop(&mut self) {
        self.root.cancel();
    }
}

async fn fetch_one(
    provider: Arc<dyn ReferenceTableProvider>,
    table: TableId,
    request_timeout: Duration,
    token: CancellationToken,
) -> Option<Vec<TableRow>> {
    let result: Result<Vec<TableRow>> = tokio::select! {
        _ = token.cancelled() => Err(ConsultError::Cancelled { table: table.to_string() }),
        fetched = tokio::time::timeout(request_timeout, provider.fetch_table(table)) => {
            fetched.unwrap_or_else(|_| Err(ConsultError::Timeout {
                table: table.to_string(),
                seconds: request_timeout.as_secs(),
            }))
        }
    };

    match result {
        Ok(rows) if rows.is_empty() => {
            tracing::warn!("⚠️ No data in table {}", table);
            None
        }
        Ok(rows) => {
            tracing::debug!("Fetched {} rows from table {}", rows.len(), table);
            Some(rows)
        }
        Err(ConsultError::Cancelled { .. }) => {
            tracing::debug!("Fetch of table {} cancelled", table);
            None
        }
        Err(e) => {
            tracing::warn!("❌ Failed to fetch table {}: {}", table, e);
            tracing::debug!("💡 {}", e.recovery_suggestion());
            None
        }
    }
}

fn joined(
    table: TableId,
    outcome: std::result::Result<Option<Vec<TableRow>>, tokio::task::JoinError>,
) -> Option<Vec<TableRow>> {
    outcome.unwrap_or_else(|e| {
        tracing::error!("Fetch task for table {} aborted: {}", table, e);
        None
    })
}
