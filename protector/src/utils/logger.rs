use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::Layer as FmtLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

const LOG_DIRECTORY: &str = ".logs";

/// Setup logger configuration for the deployer
///
/// If LOG_INSIDE_FILE=true:
/// - Console output for all log levels
/// - A combined log file for all levels
/// - A separate file for warnings only
/// - A separate file for errors only
///
/// If LOG_INSIDE_FILE=false (default):
/// - Only console output for all log levels
///
/// All logs are rotated daily when file logging is enabled. Every user-facing
/// notification is logged too, so the files double as an action history.
pub fn setup_logger() -> Result<()> {
    let log_inside_file: bool = std::env::var("LOG_INSIDE_FILE")
        .unwrap_or("false".to_string())
        .parse()
        .unwrap_or(false);

    // Set default log level to INFO if RUST_LOG is not set
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = FmtLayer::new()
        .with_line_number(false)
        .with_target(false)
        .with_thread_ids(false);

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if !log_inside_file {
        registry.init();
        return Ok(());
    }

    let file_layer = FmtLayer::new()
        .with_writer(rolling_appender("combined")?)
        .with_ansi(false)
        .with_thread_ids(false);

    let warn_layer = FmtLayer::new()
        .with_writer(rolling_appender("warn")?)
        .with_ansi(false)
        .with_thread_ids(false)
        .with_filter(EnvFilter::new("warn"));

    let error_layer = FmtLayer::new()
        .with_writer(rolling_appender("error")?)
        .with_ansi(false)
        .with_thread_ids(false)
        .with_filter(EnvFilter::new("error"));

    registry
        .with(file_layer)
        .with(warn_layer)
        .with(error_layer)
        .init();

    Ok(())
}

fn rolling_appender(prefix: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(LOG_DIRECTORY)
        .context(format!("Failed to create {} logs appender", prefix))
}
