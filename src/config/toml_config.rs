use crate::adapters::{CsvDirectoryProvider, GvizSheetProvider};
use crate::domain::model::{OpticalZone, ProcedureType, RankingPolicy, TableId};
use crate::domain::ports::{ConfigProvider, ReferenceTableProvider};
use crate::utils::error::{ConsultError, Result};
use crate::utils::validation::{
    validate_non_empty_string, validate_path, validate_positive_number, validate_range,
    validate_required_field, validate_url, Validate,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://docs.google.com/spreadsheets/d";
pub const DEFAULT_SHEET_ID: &str = "13qoQ6mFM6koCfP0OQVeWl_1D71n8UhRw7290ikEwtvY";
pub const DEFAULT_COMBINED_GID: &str = "1295416706";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsultConfig {
    pub source: SourceConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// "gviz" or "csv"
    pub r#type: String,
    pub base_url: Option<String>,
    pub sheet_id: Option<String>,
    pub combined_gid: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub tables_dir: Option<String>,
    #[serde(default)]
    pub zones: Vec<ZoneSourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneSourceConfig {
    pub diameter_mm: f64,
    pub gid: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankingConfig {
    pub max_reference_residual: Option<f64>,
    pub ablation_limit: Option<f64>,
    pub myopia_min: Option<f64>,
    pub myopia_max: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: Option<bool>,
}

impl Default for ConsultConfig {
    fn default() -> Self {
        let zones = [
            (6.0, "0"),
            (6.3, "1850036941"),
            (6.5, "115100868"),
            (6.8, "836732641"),
        ]
        .into_iter()
        .map(|(diameter_mm, gid)| ZoneSourceConfig {
            diameter_mm,
            gid: gid.to_string(),
        })
        .collect();

        Self {
            source: SourceConfig {
                r#type: "gviz".to_string(),
                base_url: Some(DEFAULT_BASE_URL.to_string()),
                sheet_id: Some(DEFAULT_SHEET_ID.to_string()),
                combined_gid: Some(DEFAULT_COMBINED_GID.to_string()),
                timeout_seconds: Some(DEFAULT_TIMEOUT_SECONDS),
                tables_dir: None,
                zones,
            },
            ranking: RankingConfig::default(),
            logging: None,
        }
    }
}

impl ConsultConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ConsultError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ConsultError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SHEET_ID})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConsultError::ConfigError {
            message: e.to_string(),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// Switches the source to a local directory of CSV tables.
    pub fn use_tables_dir(&mut self, dir: impl Into<String>) {
        self.source.r#type = "csv".to_string();
        self.source.tables_dir = Some(dir.into());
    }

    pub fn is_csv_source(&self) -> bool {
        self.source.r#type == "csv"
    }

    pub fn log_level(&self) -> Option<&str> {
        self.logging.as_ref().and_then(|l| l.level.as_deref())
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }

    pub fn timeout_seconds(&self) -> u64 {
        self.source.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT_SECONDS)
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validate_positive_number("source.timeout_seconds", self.timeout_seconds(), 1)?;

        match self.source.r#type.as_str() {
            "gviz" => self.validate_gviz_source()?,
            "csv" => {
                let dir = validate_required_field("source.tables_dir", &self.source.tables_dir)?;
                validate_path("source.tables_dir", dir)?;
            }
            other => {
                return Err(ConsultError::InvalidConfigValueError {
                    field: "source.type".to_string(),
                    value: other.to_string(),
                    reason: "Unsupported source type. Valid types: gviz, csv".to_string(),
                })
            }
        }

        let policy = self.ranking_policy();
        let strictest = ProcedureType::ALL
            .iter()
            .map(ProcedureType::min_residual)
            .fold(f64::MIN, f64::max);
        if policy.max_reference_residual <= strictest {
            return Err(ConsultError::InvalidConfigValueError {
                field: "ranking.max_reference_residual".to_string(),
                value: policy.max_reference_residual.to_string(),
                reason: format!("Value must exceed the highest minimum residual ({})", strictest),
            });
        }
        validate_range("ranking.ablation_limit", policy.ablation_limit, 1.0, 1000.0)?;
        validate_range("ranking.myopia_min", policy.myopia_min, 0.0, policy.myopia_max)?;

        Ok(())
    }

    fn validate_gviz_source(&self) -> Result<()> {
        let base_url = validate_required_field("source.base_url", &self.source.base_url)?;
        validate_url("source.base_url", base_url)?;
        let sheet_id = validate_required_field("source.sheet_id", &self.source.sheet_id)?;
        validate_non_empty_string("source.sheet_id", sheet_id)?;
        let combined = validate_required_field("source.combined_gid", &self.source.combined_gid)?;
        validate_non_empty_string("source.combined_gid", combined)?;

        let mut seen = Vec::new();
        for zone in &self.source.zones {
            let Some(optical_zone) = OpticalZone::from_diameter(zone.diameter_mm) else {
                return Err(ConsultError::InvalidConfigValueError {
                    field: "source.zones.diameter_mm".to_string(),
                    value: zone.diameter_mm.to_string(),
                    reason: "Valid diameters: 6.0, 6.3, 6.5, 6.8".to_string(),
                });
            };
            if seen.contains(&optical_zone) {
                return Err(ConsultError::InvalidConfigValueError {
                    field: "source.zones.diameter_mm".to_string(),
                    value: zone.diameter_mm.to_string(),
                    reason: "Zone configured twice".to_string(),
                });
            }
            validate_non_empty_string("source.zones.gid", &zone.gid)?;
            seen.push(optical_zone);
        }

        if seen.len() != OpticalZone::ALL.len() {
            return Err(ConsultError::ConfigValidationError {
                field: "source.zones".to_string(),
                message: format!("Expected 4 zone tables, found {}", seen.len()),
            });
        }
        Ok(())
    }

    /// 依設定建立參考表來源
    pub fn build_provider(&self) -> Result<Arc<dyn ReferenceTableProvider>> {
        if self.is_csv_source() {
            let dir = validate_required_field("source.tables_dir", &self.source.tables_dir)?;
            return Ok(Arc::new(CsvDirectoryProvider::new(dir)));
        }

        let base_url = validate_required_field("source.base_url", &self.source.base_url)?;
        let sheet_id = validate_required_field("source.sheet_id", &self.source.sheet_id)?;
        let combined = validate_required_field("source.combined_gid", &self.source.combined_gid)?;

        let client = reqwest::Client::builder()
            .user_agent(concat!("refractive-consult/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mut provider = GvizSheetProvider::new(base_url.as_str(), sheet_id.as_str())
            .with_client(client)
            .with_gid(TableId::Combined, combined.as_str());
        for zone in &self.source.zones {
            if let Some(optical_zone) = OpticalZone::from_diameter(zone.diameter_mm) {
                provider = provider.with_gid(TableId::Zone(optical_zone), zone.gid.as_str());
            }
        }
        Ok(Arc::new(provider))
    }
}

impl ConfigProvider for ConsultConfig {
    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds())
    }

    fn ranking_policy(&self) -> RankingPolicy {
        let defaults = RankingPolicy::default();
        RankingPolicy {
            max_reference_residual: self
                .ranking
                .max_reference_residual
                .unwrap_or(defaults.max_reference_residual),
            ablation_limit: self.ranking.ablation_limit.unwrap_or(defaults.ablation_limit),
            myopia_min: self.ranking.myopia_min.unwrap_or(defaults.myopia_min),
            myopia_max: self.ranking.myopia_max.unwrap_or(defaults.myopia_max),
        }
    }
}

impl Validate for ConsultConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
