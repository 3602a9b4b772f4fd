use crate::config::toml_config::ConsultConfig;
use crate::domain::model::{EyeMeasurement, EyePair};
use crate::utils::error::Result;
use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Csv,
}

#[derive(Debug, Clone, Parser)]
#[command(name = "refractive-consult")]
#[command(about = "Rank refractive-surgery options from per-eye biometrics")]
pub struct CliConfig {
    /// Right eye: thickness,myopia,astigmatism,pupil,target (e.g. 540,-1.25,-1.00,6.5,1.0-1)
    #[arg(long, value_parser = parse_eye, allow_hyphen_values = true)]
    pub right: EyeMeasurement,

    /// Left eye, same layout as --right
    #[arg(long, value_parser = parse_eye, allow_hyphen_values = true)]
    pub left: EyeMeasurement,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Read reference tables from CSV files in this directory instead of the sheet
    #[arg(long)]
    pub tables_dir: Option<String>,

    /// Per-table fetch timeout in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    #[arg(long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Write the report to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<String>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub json_logs: bool,
}

fn parse_eye(raw: &str) -> std::result::Result<EyeMeasurement, String> {
    raw.parse::<EyeMeasurement>().map_err(|e| e.to_string())
}

impl CliConfig {
    /// 載入設定檔並套用命令列覆蓋
    pub fn load_config(&self) -> Result<ConsultConfig> {
        let mut config = match &self.config {
            Some(path) => ConsultConfig::from_file(path)?,
            None => ConsultConfig::default(),
        };

        if let Some(dir) = &self.tables_dir {
            config.use_tables_dir(dir.clone());
        }
        if let Some(timeout) = self.timeout {
            config.source.timeout_seconds = Some(timeout);
        }
        Ok(config)
    }

    pub fn eye_pair(&self) -> EyePair {
        EyePair {
            right: self.right.clone(),
            left: self.left.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::ConfigProvider;
    use std::time::Duration;

    #[test]
    fn test_parse_cli_arguments() {
        let cli = CliConfig::try_parse_from([
            "refractive-consult",
            "--right",
            "540,-1.25,-1.00,6.5,1.0-1",
            "--left",
            "-0.5",
            "--tables-dir",
            "./tables",
            "--format",
            "json",
        ]);
        // the left eye needs all five fields
        assert!(cli.is_err());

        let cli = CliConfig::try_parse_from([
            "refractive-consult",
            "--right",
            "540,-1.25,-1.00,6.5,1.0-1",
            "--left",
            "530,-2.00,-0.50,6.0,1.0",
            "--tables-dir",
            "./tables",
            "--timeout",
            "3",
            "--format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.eye_pair().left.myopia, -2.0);

        let config = cli.load_config().unwrap();
        assert!(config.is_csv_source());
        assert_eq!(config.request_timeout(), Duration::from_secs(3));
    }
}
