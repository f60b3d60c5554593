use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn default_filter(level: Option<&str>, verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directive = match (verbose, level) {
            (true, _) => "dimension_etl=debug,info".to_string(),
            (false, Some(level)) => format!("dimension_etl={},warn", level),
            (false, None) => "dimension_etl=info,warn".to_string(),
        };
        EnvFilter::new(directive)
    })
}

/// `level` comes from the `[logging]` table of the config file; `verbose` wins over it.
pub fn init_cli_logger(verbose: bool, level: Option<&str>, json: bool) {
    let filter = default_filter(level, verbose);

    let fmt = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt.compact())
            .init();
    }
}

pub fn init_lambda_logger() {
    tracing_subscriber::registry()
        .with(default_filter(None, false))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .without_time()
                .json(), // CloudWatch already timestamps each line
        )
        .init();
}
