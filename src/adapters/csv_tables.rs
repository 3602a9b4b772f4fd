use crate::core::numeric::cell_from_str;
use crate::domain::model::{TableId, TableRow};
use crate::domain::ports::ReferenceTableProvider;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Offline provider: one header-less CSV file per table in a directory.
///
/// File names are `combined.csv` and `zone-<diameter>.csv`, e.g. `zone-6.0mm.csv`.
#[derive(Debug, Clone)]
pub struct CsvDirectoryProvider {
    dir: PathBuf,
}

impl CsvDirectoryProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn file_for(&self, table: TableId) -> PathBuf {
        self.dir.join(format!("{}.csv", table))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

pub fn parse_csv_rows(content: &str) -> Result<Vec<TableRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(TableRow::new(record.iter().map(cell_from_str).collect()));
    }
    Ok(rows)
}

#[async_trait]
impl ReferenceTableProvider for CsvDirectoryProvider {
    async fn fetch_table(&self, table: TableId) -> Result<Vec<TableRow>> {
        let path = self.file_for(table);
        tracing::debug!("📂 Reading table {} from {}", table, path.display());
        let content = tokio::fs::read_to_string(&path).await?;
        parse_csv_rows(&content)
    }

    fn name(&self) -> &str {
        "csv"
    }
}
