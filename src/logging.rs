//! Install a tracing subscriber for the command-line tool.
//!
//! The library only emits `tracing` events; nothing is printed unless a
//! binary calls [`init`]. Events go to stderr so they never mix with command
//! output on stdout.

use crate::config::{LogFormat, LoggingConfig};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, Layer, Registry};

/// The level used when `RUST_LOG` is unset: the command-line override if
/// given, else the configured level, else `INFO`.
pub fn default_level(config: &LoggingConfig, level_override: Option<&str>) -> LevelFilter {
    level_override
        .unwrap_or(&config.level)
        .trim()
        .parse()
        .unwrap_or(LevelFilter::INFO)
}

fn fmt_layer(format: LogFormat) -> Box<dyn Layer<Registry> + Send + Sync> {
    match format {
        LogFormat::Json => fmt::layer().json().with_writer(std::io::stderr).boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_writer(std::io::stderr).boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed(),
    }
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(config: &LoggingConfig, level_override: Option<&str>) -> Result<(), TryInitError> {
    let filter = EnvFilter::builder()
        .with_default_directive(default_level(config, level_override).into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(fmt_layer(config.format))
        .with(filter)
        .try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_level_precedence() {
        let config = LoggingConfig {
            level: "warn".to_string(),
            ..LoggingConfig::default()
        };
        assert_eq!(default_level(&config, None), LevelFilter::WARN);
        assert_eq!(default_level(&config, Some("trace")), LevelFilter::TRACE);
    }

    #[test]
    fn test_unknown_level_falls_back_to_info() {
        let config = LoggingConfig {
            level: "chatty".to_string(),
            ..LoggingConfig::default()
        };
        assert_eq!(default_level(&config, None), LevelFilter::INFO);
    }
}
