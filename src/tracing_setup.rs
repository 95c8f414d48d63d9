use eyre::{Result, WrapErr};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LoggingConfig;

/// Initialize logging from the `[logging]` section.
///
/// `RUST_LOG`, when set, takes precedence over the configured level.
pub fn init_tracing(logging: &LoggingConfig) -> Result<()> {
    init_tracing_with_config(&logging.level, logging.json, true)
}

/// Initialize console-friendly logging for one-shot CLI commands
pub fn init_console_tracing() -> Result<()> {
    init_tracing_with_config("warn", false, false)
}

/// Initialize tracing with custom configuration
pub fn init_tracing_with_config(level: &str, json_format: bool, include_spans: bool) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            EnvFilter::try_new(level).wrap_err_with(|| format!("Invalid log level: {level}"))?
        }
    };

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    let installed = if json_format {
        Registry::default()
            .with(env_filter)
            .with(
                fmt_layer
                    .json()
                    .with_current_span(include_spans)
                    .with_span_list(include_spans),
            )
            .try_init()
    } else {
        Registry::default()
            .with(env_filter)
            .with(fmt_layer.pretty().with_ansi(true))
            .try_init()
    };
    installed.wrap_err("A global tracing subscriber is already installed")?;

    tracing::debug!(level, json = json_format, "Logging initialized");
    Ok(())
}

/// Span covering one quote request
pub fn create_quote_span(identity: &str, products: usize) -> tracing::Span {
    tracing::info_span!("quote", identity = identity, products = products)
}

/// Span covering one location resolution
pub fn create_resolve_span(ip: Option<&str>) -> tracing::Span {
    tracing::info_span!("resolve_location", ip = ip.unwrap_or("default"))
}
