use anyhow::{Context, Result};
use clap::Parser;
use refractive_consult::core::resolver::{CombinedTable, ZoneAblationTable};
use refractive_consult::domain::model::TableId;
use refractive_consult::domain::ports::ReferenceTableProvider;
use refractive_consult::utils::{logger, validation::Validate};
use refractive_consult::ConsultConfig;

#[derive(Parser, Debug)]
#[command(name = "probe-tables")]
#[command(about = "Fetch every reference table once and report its shape")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Probe a CSV tables directory instead of the configured source
    #[arg(long)]
    tables_dir: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ConsultConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path))?,
        None => ConsultConfig::default(),
    };
    if let Some(dir) = &args.tables_dir {
        config.use_tables_dir(dir.clone());
    }

    logger::init_cli_logger(args.verbose, config.log_level());
    config.validate().context("Invalid configuration")?;

    let provider = config.build_provider()?;
    println!("📡 Probing reference tables from {}", provider.name());

    let mut failures = 0;
    for table in TableId::all() {
        let rows = match provider.fetch_table(table).await {
            Ok(rows) => rows,
            Err(e) => {
                failures += 1;
                println!("❌ {:<14} {}", table.to_string(), e.user_friendly_message());
                continue;
            }
        };

        match table {
            TableId::Combined => match CombinedTable::from_rows(&rows) {
                Some(parsed) => println!(
                    "✅ {:<14} {} rows, {} diopter keys",
                    table.to_string(),
                    rows.len(),
                    parsed.len()
                ),
                None => println!("⚠️ {:<14} {} rows, unusable", table.to_string(), rows.len()),
            },
            TableId::Zone(zone) => {
                let row_count = rows.len();
                match ZoneAblationTable::from_rows(zone, rows) {
                    Some(parsed) => println!(
                        "✅ {:<14} {} rows, {} sphere keys, {} cylinder columns",
                        table.to_string(),
                        parsed.row_count(),
                        parsed.defined_sphere_keys(),
                        parsed.axis_width()
                    ),
                    None => {
                        println!("⚠️ {:<14} {} rows, unusable", table.to_string(), row_count)
                    }
                }
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of 5 tables could not be fetched", failures);
    }
    Ok(())
}
