use tracing::Level;

use crate::config::{LogFormat, LoggingConfig};

/// Installs the global `tracing` subscriber, writing to stderr.
///
/// Returns an error if a subscriber is already installed.
pub fn init_logging(
    config: &LoggingConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let log_level = config.level.trim().parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
}
