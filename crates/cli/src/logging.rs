use slackmoji_core::config::{LogFormat, LoggingConfig};
use tracing::Level;

/// Installs the global subscriber. `verbose` forces debug level. Safe to call
/// more than once; later calls are ignored.
pub fn init(config: &LoggingConfig, verbose: bool) {
    let log_level = if verbose {
        Level::DEBUG
    } else {
        config.level.parse::<Level>().unwrap_or(Level::INFO)
    };

    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}
