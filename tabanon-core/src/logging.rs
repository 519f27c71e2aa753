//! Logging setup for the tabanon binary and embedding applications.
//!
//! Log lines carry counts, sizes and distances, never record values. They
//! go to stderr so datasets printed on stdout stay machine-readable.

use std::fmt;
use std::str::FromStr;

use tracing_subscriber::EnvFilter;

use crate::error::{Result, TabAnonError};

/// Environment variable with a `tracing` filter directive that takes
/// precedence over the verbosity flags, e.g.
/// `TABANON_LOG=tabanon_core::anonymize=trace`.
pub const LOG_ENV: &str = "TABANON_LOG";

/// Output format of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable single-line events
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

impl FromStr for LogFormat {
    type Err = TabAnonError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" | "pretty" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(TabAnonError::configuration(format!(
                "unknown log format '{}', expected 'text' or 'json'",
                other
            ))),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Filter directive for the CLI verbosity flags.
///
/// `quiet` wins over any verbosity; 0 is info, 1 is debug, 2+ is trace.
pub fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    }
}

/// Initializes the global subscriber.
///
/// # Example
/// ```rust,no_run
/// use tabanon_core::logging::{LogFormat, init_logging};
///
/// init_logging(1, false, LogFormat::Text).expect("Failed to initialize logging");
/// ```
pub fn init_logging(verbose: u8, quiet: bool, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose, quiet)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|e| {
        TabAnonError::configuration(format!("Failed to initialize logging: {}", e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // The global subscriber can only be installed once per process.
    #[test]
    fn test_verbosity_directives() {
        let test_cases = [
            ((true, 0), "error"),
            ((true, 5), "error"),
            ((false, 0), "info"),
            ((false, 1), "debug"),
            ((false, 2), "trace"),
            ((false, 10), "trace"),
        ];

        for ((quiet, verbose), expected) in test_cases {
            assert_eq!(
                default_directive(verbose, quiet),
                expected,
                "quiet={}, verbose={}",
                quiet,
                verbose
            );
        }
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" Text ".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert!("yaml".parse::<LogFormat>().unwrap_err().is_configuration());
        assert_eq!(LogFormat::Json.to_string(), "json");
    }
}
