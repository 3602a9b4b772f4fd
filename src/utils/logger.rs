use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn default_filter(verbose: bool, configured: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| match (verbose, configured) {
        (true, _) => EnvFilter::new("refractive_consult=debug,info"),
        (false, Some(level)) => EnvFilter::new(format!("refractive_consult={}", level)),
        (false, None) => EnvFilter::new("refractive_consult=info"),
    })
}

pub fn init_cli_logger(verbose: bool, configured_level: Option<&str>) {
    tracing_subscriber::registry()
        .with(default_filter(verbose, configured_level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();
}

/// JSON 格式日誌，方便由外部系統收集
pub fn init_json_logger(verbose: bool, configured_level: Option<&str>) {
    tracing_subscriber::registry()
        .with(default_filter(verbose, configured_level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .json(),
        )
        .init();
}
