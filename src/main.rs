use clap::Parser;
use refractive_consult::config::OutputFormat;
use refractive_consult::core::report;
use refractive_consult::domain::ports::ReferenceTableProvider;
use refractive_consult::utils::error::{ConsultError, ErrorSeverity};
use refractive_consult::utils::{logger, validation::Validate};
use refractive_consult::{CliConfig, ConsultConfig, ConsultationSession};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = CliConfig::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            // 日誌尚未初始化，直接輸出
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(exit_code(&e));
        }
    };

    // 初始化日誌
    if cli.json_logs || config.json_logs() {
        logger::init_json_logger(cli.verbose, config.log_level());
    } else {
        logger::init_cli_logger(cli.verbose, config.log_level());
    }

    tracing::info!("Starting refractive-consult CLI");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    if let Err(e) = run(&cli, &config).await {
        tracing::error!(
            "❌ Consultation failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 建議: {}", e.recovery_suggestion());

        let code = exit_code(&e);
        if code > 0 {
            std::process::exit(code);
        }
    }

    Ok(())
}

async fn run(cli: &CliConfig, config: &ConsultConfig) -> refractive_consult::Result<()> {
    // 驗證配置與輸入
    config.validate()?;
    let pair = cli.eye_pair();
    pair.validate()?;

    let provider = config.build_provider()?;
    tracing::info!("📡 Reference tables from {}", provider.name());

    let mut session = ConsultationSession::new(provider, config);
    let evaluation = session.evaluate(&pair).await?;
    session.shutdown();

    let rendered = match cli.format {
        OutputFormat::Text => report::render_text(&evaluation.report),
        OutputFormat::Json => report::to_json(&evaluation.report)?,
        OutputFormat::Csv => report::to_csv(&evaluation.report)?,
    };

    match &cli.output {
        Some(path) => {
            tokio::fs::write(path, rendered).await?;
            tracing::info!("📁 Report saved to: {}", path);
            println!("📁 Report saved to: {}", path);
        }
        None => print!("{}", rendered),
    }

    for eye in evaluation.report.eyes() {
        match eye.outcome.top() {
            Some(best) => tracing::info!(
                "✅ {}: {} recommended",
                eye.eye.label(),
                best.candidate.procedure.label()
            ),
            None => tracing::warn!("⚠️ {}: no procedure qualified", eye.eye.label()),
        }
    }

    Ok(())
}

// 根據錯誤嚴重程度決定退出碼
fn exit_code(e: &ConsultError) -> i32 {
    match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}
