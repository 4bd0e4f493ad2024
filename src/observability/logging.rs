//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Default filter when nothing else is configured.
const DEFAULT_LEVEL: &str = "info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name, falling back to pretty output.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Event filter.
    pub filter: EnvFilter,
    /// Log file; stderr when unset.
    pub file: Option<PathBuf>,
}

impl LoggingConfig {
    /// Builds the logging configuration from file settings and the
    /// environment.
    ///
    /// Precedence, highest first: `--verbose` (debug), `RUST_LOG`,
    /// `PIIGUARD_LOG_LEVEL`, the config file, `info`. Format and file follow
    /// `PIIGUARD_LOG_FORMAT` and `PIIGUARD_LOG_FILE` over the config file.
    #[must_use]
    pub fn from_settings(settings: Option<&LoggingSettings>, verbose: bool) -> Self {
        let directive = resolve_directive(
            settings,
            verbose,
            std::env::var("RUST_LOG").ok(),
            std::env::var("PIIGUARD_LOG_LEVEL").ok(),
        );
        let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LEVEL));

        let format = std::env::var("PIIGUARD_LOG_FORMAT")
            .ok()
            .or_else(|| settings.and_then(|s| s.format.clone()))
            .map_or_else(LogFormat::default, |f| LogFormat::parse(&f));

        let file = std::env::var_os("PIIGUARD_LOG_FILE")
            .map(PathBuf::from)
            .or_else(|| settings.and_then(|s| s.file.clone()));

        Self {
            format,
            filter,
            file,
        }
    }
}

fn resolve_directive(
    settings: Option<&LoggingSettings>,
    verbose: bool,
    rust_log: Option<String>,
    level_env: Option<String>,
) -> String {
    if verbose {
        return "debug".to_string();
    }
    rust_log
        .or(level_env)
        .or_else(|| settings.and_then(|s| s.level.clone()))
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LEVEL.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_format() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("xml"), LogFormat::Pretty);
    }

    #[test]
    fn test_directive_precedence() {
        let settings = LoggingSettings {
            level: Some("warn".to_string()),
            ..LoggingSettings::default()
        };

        assert_eq!(resolve_directive(Some(&settings), false, None, None), "warn");
        assert_eq!(
            resolve_directive(Some(&settings), false, None, Some("error".to_string())),
            "error"
        );
        assert_eq!(
            resolve_directive(
                Some(&settings),
                false,
                Some("piiguard=trace".to_string()),
                Some("error".to_string())
            ),
            "piiguard=trace"
        );
        assert_eq!(
            resolve_directive(Some(&settings), true, Some("off".to_string()), None),
            "debug"
        );
        assert_eq!(resolve_directive(None, false, None, None), "info");
    }
}
