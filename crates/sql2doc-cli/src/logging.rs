//! Structured logging for the sql2doc CLI
//!
//! Features:
//! - Human-readable or compact console logging on stderr (stdout carries results)
//! - Structured JSON logging
//! - File rotation with daily log files
//! - Configurable log levels per module

use crate::config::LoggingConfig;
use std::str::FromStr;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Log format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format for development
    Pretty,
    /// JSON format (structured logging)
    Json,
    /// Compact single-line format
    Compact,
}

impl FromStr for LogFormat {
    type Err = std::convert::Infallible;

    /// Unknown values fall back to compact
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Compact,
        })
    }
}

/// Log output configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stderr,
    File,
    Both,
}

impl FromStr for LogOutput {
    type Err = std::convert::Infallible;

    /// Unknown values fall back to stderr
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "file" => LogOutput::File,
            "both" => LogOutput::Both,
            _ => LogOutput::Stderr,
        })
    }
}

fn parse<T: FromStr<Err = std::convert::Infallible>>(s: &str) -> T {
    match s.parse() {
        Ok(v) => v,
        Err(never) => match never {},
    }
}

fn env_filter(level: &str) -> EnvFilter {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));

    // Third-party crates stay quiet unless asked for explicitly
    ["tracing_appender=warn"]
        .into_iter()
        .filter_map(|directive| directive.parse().ok())
        .fold(filter, EnvFilter::add_directive)
}

fn console_layer<S>(format: LogFormat) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    match format {
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed(),
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_writer(std::io::stderr)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_writer(std::io::stderr)
            .boxed(),
    }
}

fn file_layer<S>(directory: &str) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    std::fs::create_dir_all(directory).ok();
    let appender = RollingFileAppender::new(Rotation::DAILY, directory, "sql2doc.log");
    fmt::layer().with_writer(appender).with_ansi(false).boxed()
}

/// Initialize the logging system from configuration
///
/// Config keys (overridable through the environment):
/// - `level` / `RUST_LOG`: Log level (e.g., "debug", "info", "sql2doc_builder=debug")
/// - `format` / `LOG_FORMAT`: Output format ("pretty", "json", "compact")
/// - `output` / `LOG_OUTPUT`: Where to write logs ("stderr", "file", "both")
/// - `directory` / `LOG_DIR`: Directory for log files (default: "./logs")
///
/// Examples:
/// ```bash
/// # See which predicates a query drops
/// RUST_LOG=sql2doc_builder=debug sql2doc query.yaml
///
/// # JSON logs to a daily file
/// LOG_FORMAT=json LOG_OUTPUT=file LOG_DIR=/var/log/sql2doc sql2doc query.yaml
/// ```
///
/// Calling it twice is harmless; the second subscriber is not installed.
pub fn init(config: &LoggingConfig) {
    let format: LogFormat = parse(&config.format);
    let output: LogOutput = parse(&config.output);
    let env_filter = env_filter(&config.level);

    let result = match output {
        LogOutput::Stderr => tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer(format))
            .try_init(),
        LogOutput::File => tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer(&config.directory))
            .try_init(),
        LogOutput::Both => tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer(format))
            .with(file_layer(&config.directory))
            .try_init(),
    };

    if result.is_ok() {
        tracing::debug!(format = ?format, output = ?output, "logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(parse::<LogFormat>("json"), LogFormat::Json);
        assert_eq!(parse::<LogFormat>("pretty"), LogFormat::Pretty);
        assert_eq!(parse::<LogFormat>("compact"), LogFormat::Compact);
        assert_eq!(parse::<LogFormat>("anything"), LogFormat::Compact);
    }

    #[test]
    fn test_log_output_parsing() {
        assert_eq!(parse::<LogOutput>("file"), LogOutput::File);
        assert_eq!(parse::<LogOutput>("both"), LogOutput::Both);
        assert_eq!(parse::<LogOutput>("stderr"), LogOutput::Stderr);
        assert_eq!(parse::<LogOutput>(""), LogOutput::Stderr);
    }

    #[test]
    fn test_bad_level_falls_back() {
        // must not panic on garbage directives
        let _ = env_filter("sql2doc=[[[");
    }
}
