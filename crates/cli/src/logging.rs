use anyhow::{anyhow, Result};
use cartprice_core::config::{AppConfig, LogFormat};
use tracing::Level;

/// Installs the global subscriber on stderr so command output on stdout stays parseable.
///
/// Fails when a subscriber is already installed.
pub fn init_logging(config: &AppConfig) -> Result<()> {
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|error| anyhow!("could not install log subscriber: {error}"))
}
