use crate::domain::model::{RankingPolicy, TableId, TableRow};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Read-only source of reference tables.
///
/// Rows come back already past the parsing boundary: every cell is numeric or
/// absent. An empty vector means the table has no data yet.
#[async_trait]
pub trait ReferenceTableProvider: Send + Sync {
    async fn fetch_table(&self, table: TableId) -> Result<Vec<TableRow>>;

    fn name(&self) -> &str;
}

pub trait ConfigProvider: Send + Sync {
    fn request_timeout(&self) -> Duration;
    fn ranking_policy(&self) -> RankingPolicy;
}
