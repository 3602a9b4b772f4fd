use crate::core::numeric::cell_from_json;
use crate::domain::model::{TableId, TableRow};
use crate::domain::ports::ReferenceTableProvider;
use crate::utils::error::{ConsultError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

/// Google Sheets visualization endpoint, one gid per table.
pub struct GvizSheetProvider {
    client: Client,
    base_url: String,
    sheet_id: String,
    gids: HashMap<TableId, String>,
}

impl GvizSheetProvider {
    pub fn new(base_url: impl Into<String>, sheet_id: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            sheet_id: sheet_id.into(),
            gids: HashMap::new(),
        }
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_gid(mut self, table: TableId, gid: impl Into<String>) -> Self {
        self.gids.insert(table, gid.into());
        self
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/{}/gviz/tq",
            self.base_url.trim_end_matches('/'),
            self.sheet_id
        )
    }
}

#[async_trait]
impl ReferenceTableProvider for GvizSheetProvider {
    async fn fetch_table(&self, table: TableId) -> Result<Vec<TableRow>> {
        let gid = self
            .gids
            .get(&table)
            .ok_or_else(|| ConsultError::MissingConfigError {
                field: format!("source gid for {}", table),
            })?;

        tracing::debug!("📡 Requesting table {} (gid={}) from {}", table, gid, self.endpoint());
        let response = self
            .client
            .get(self.endpoint())
            .query(&[("tqx", "out:json"), ("gid", gid.as_str())])
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        parse_gviz_body(table, &body)
    }

    fn name(&self) -> &str {
        "gviz"
    }
}

#[derive(Debug, Deserialize)]
struct GvizResponse {
    status: Option<String>,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
    table: Option<GvizTable>,
}

#[derive(Debug, Deserialize)]
struct GvizTable {
    #[serde(default)]
    rows: Vec<GvizRow>,
}

#[derive(Debug, Deserialize)]
struct GvizRow {
    #[serde(default)]
    c: Vec<Option<GvizCell>>,
}

#[derive(Debug, Deserialize)]
struct GvizCell {
    #[serde(default)]
    v: serde_json::Value,
}

/// 解析 gviz 回應：JSON 物件包在 `setResponse(...)` 之中
pub fn parse_gviz_body(table: TableId, body: &str) -> Result<Vec<TableRow>> {
    let malformed = |message: String| ConsultError::MalformedResponse {
        table: table.to_string(),
        message,
    };

    let start = body.find('{');
    let end = body.rfind('}');
    let json = match (start, end) {
        (Some(start), Some(end)) if start < end => &body[start..=end],
        _ => return Err(malformed("no JSON object in response body".to_string())),
    };

    let response: GvizResponse = serde_json::from_str(json)?;

    if response.status.as_deref() == Some("error") {
        return Err(malformed(format!("sheet reported errors: {:?}", response.errors)));
    }

    let Some(gviz_table) = response.table else {
        return Err(malformed("response has no table".to_string()));
    };

    Ok(gviz_table
        .rows
        .into_iter()
        .map(|row| {
            TableRow::new(
                row.c
                    .iter()
                    .map(|cell| cell.as_ref().and_then(|c| cell_from_json(&c.v)))
                    .collect(),
            )
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::OpticalZone;
    use httpmock::prelude::*;

    const BODY: &str = r#"/*O_o*/
google.visualization.Query.setResponse({"version":"0.6","reqId":"0","status":"ok","sig":"1","table":{"cols":[{"id":"A","label":"","type":"number"}],"rows":[{"c":[null,{"v":0.0,"f":"0.00"},{"v":-0.5,"f":"-0.50"}]},{"c":[{"v":-1.0},{"v":20},{"v":"25"}]},{"c":[{"v":-3.0},null,{"v":null}]}]}});"#;

    #[test]
    fn test_parse_wrapped_body() {
        let rows = parse_gviz_body(TableId::Zone(OpticalZone::Mm6_0), BODY).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].cells, vec![None, Some(0.0), Some(-0.5)]);
        assert_eq!(rows[1].cells, vec![Some(-1.0), Some(20.0), Some(25.0)]);
        assert_eq!(rows[2].cells, vec![Some(-3.0), None, None]);
    }

    #[test]
    fn test_parse_rejects_body_without_json() {
        let err = parse_gviz_body(TableId::Combined, "<html>Sign in</html>").unwrap_err();
        assert!(matches!(err, ConsultError::MalformedResponse { .. }));
    }

    #[test]
    fn test_parse_reports_sheet_errors() {
        let body = r#"setResponse({"status":"error","errors":[{"reason":"access_denied"}]});"#;
        let err = parse_gviz_body(TableId::Combined, body).unwrap_err();
        assert!(err.to_string().contains("access_denied"));
    }

    #[test]
    fn test_parse_empty_table() {
        let body = r#"setResponse({"status":"ok","table":{"cols":[],"rows":[]}});"#;
        assert!(parse_gviz_body(TableId::Combined, body).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_table_queries_gid() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET)
                .path("/sheet-1/gviz/tq")
                .query_param("tqx", "out:json")
                .query_param("gid", "0");
            then.status(200)
                .header("Content-Type", "text/javascript")
                .body(BODY);
        });

        let provider = GvizSheetProvider::new(server.base_url(), "sheet-1")
            .with_gid(TableId::Zone(OpticalZone::Mm6_0), "0");
        let rows = provider
            .fetch_table(TableId::Zone(OpticalZone::Mm6_0))
            .await
            .unwrap();

        api_mock.assert();
        assert_eq!(rows.len(), 3);
    }

    #[tokio::test]
    async fn test_fetch_table_http_failure() {
        let server = MockServer::start();
        let api_mock = server.mock(|when, then| {
            when.method(GET).path("/sheet-1/gviz/tq");
            then.status(500);
        });

        let provider =
            GvizSheetProvider::new(server.base_url(), "sheet-1").with_gid(TableId::Combined, "42");
        let err = provider.fetch_table(TableId::Combined).await.unwrap_err();

        api_mock.assert();
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_fetch_table_without_gid() {
        let provider = GvizSheetProvider::new("http://localhost:1", "sheet-1");
        let err = provider.fetch_table(TableId::Combined).await.unwrap_err();
        assert!(matches!(err, ConsultError::MissingConfigError { .. }));
    }
}
