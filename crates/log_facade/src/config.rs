//! Configuration consumed by [`build_logger`][crate::build_logger].

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::Level;

/// Configuration of the logger built by [`build_logger`][crate::build_logger].
///
/// Every field has a default, so a configuration source only needs to mention what it changes:
///
/// ```
/// use log_facade::{Level, LoggerConfig};
///
/// let config: LoggerConfig = serde_json::from_str(
///     r#"{ "pretty_output": true, "console_level": "debug", "file_output_path": "/var/log/router.log" }"#,
/// )?;
///
/// assert_eq!(config.console_level, Level::Debug);
/// assert_eq!(config.file_level, Level::Info);
/// # Ok::<(), serde_json::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Use the human-readable console encoder for standard output instead of JSON.
    pub pretty_output: bool,

    /// Attach the source location of the emitting call to every record.
    pub debug_mode: bool,

    /// Minimum level written to standard output.
    pub console_level: Level,

    /// If set, records are also appended as JSON to this file.
    pub file_output_path: Option<PathBuf>,

    /// Minimum level written to the file.
    pub file_level: Level,

    /// An [`EnvFilter`][tracing_subscriber::EnvFilter] directive (e.g. `"info,hyper=warn"`)
    /// applied to events emitted through the `tracing` macros.
    ///
    /// This allows quieting third-party crates without raising the level of the sinks.
    pub filtering_directive: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            pretty_output: false,
            debug_mode: false,
            console_level: Level::Info,
            file_output_path: None,
            file_level: Level::Info,
            filtering_directive: None,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_configuration_uses_defaults() {
        let config: LoggerConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, LoggerConfig::default());
    }

    #[test]
    fn unknown_level_names_are_rejected() {
        let error = serde_json::from_str::<LoggerConfig>(r#"{ "file_level": "verbose" }"#)
            .unwrap_err();
        assert!(error.to_string().contains("unknown log level: verbose"));
    }

    #[test]
    fn serialized_configuration_reads_back() {
        let config = LoggerConfig {
            debug_mode: true,
            console_level: Level::Warning,
            file_output_path: Some("logs/router.log".into()),
            ..LoggerConfig::default()
        };

        let serialized = serde_json::to_string(&config).unwrap();
        assert!(serialized.contains("\"WARNING\""));
        assert_eq!(
            serde_json::from_str::<LoggerConfig>(&serialized).unwrap(),
            config
        );
    }
}
