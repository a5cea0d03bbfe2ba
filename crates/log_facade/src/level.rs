//! Severity levels and their parsing from configuration strings.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing_subscriber::filter::LevelFilter;

use super::LoggerError;

/// Severity of a log record.
///
/// Levels are totally ordered (`Debug < Info < Warning < Error < Fatal < Panic`). A sink
/// configured at a given level emits every record at that level or above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    /// Verbose diagnostics, usually disabled in production.
    Debug,

    /// Routine operational messages.
    Info,

    /// Something unexpected that does not stop the current operation.
    Warning,

    /// An operation failed.
    Error,

    /// The process cannot continue and exits after logging.
    Fatal,

    /// The current thread panics after logging.
    Panic,
}

impl Level {
    /// All levels, from least to most severe.
    pub const ALL: [Self; 6] = [
        Self::Debug,
        Self::Info,
        Self::Warning,
        Self::Error,
        Self::Fatal,
        Self::Panic,
    ];

    /// Lower-case name used by the JSON encoder.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
            Self::Panic => "panic",
        }
    }

    /// Capitalized name used by the console encoder.
    pub fn as_capital_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Error => "ERROR",
            Self::Fatal => "FATAL",
            Self::Panic => "PANIC",
        }
    }

    /// Name accepted by [`parse_level`], used when serializing configuration.
    fn config_name(self) -> &'static str {
        match self {
            Self::Warning => "WARNING",
            level => level.as_capital_str(),
        }
    }

    /// Maps a [`tracing::Level`] onto a [`Level`].
    ///
    /// `TRACE` has no counterpart and yields `None`; such events are never emitted.
    pub(crate) fn from_tracing(level: tracing::Level) -> Option<Self> {
        match level {
            tracing::Level::TRACE => None,
            tracing::Level::DEBUG => Some(Self::Debug),
            tracing::Level::INFO => Some(Self::Info),
            tracing::Level::WARN => Some(Self::Warning),
            tracing::Level::ERROR => Some(Self::Error),
        }
    }

    /// The most verbose [`LevelFilter`] that still lets events of this level through.
    ///
    /// `tracing` has nothing above `ERROR`, so `Fatal` and `Panic` clamp to it.
    pub(crate) fn as_level_filter(self) -> LevelFilter {
        match self {
            Self::Debug => LevelFilter::DEBUG,
            Self::Info => LevelFilter::INFO,
            Self::Warning => LevelFilter::WARN,
            Self::Error | Self::Fatal | Self::Panic => LevelFilter::ERROR,
        }
    }
}

/// Parses a level name, ignoring case.
///
/// Accepted names are `DEBUG`, `INFO`, `WARNING`, `ERROR`, `FATAL` and `PANIC`.
///
/// # Examples
///
/// ```
/// use log_facade::{Level, parse_level};
///
/// assert_eq!(parse_level("warning").ok(), Some(Level::Warning));
/// assert!(parse_level("verbose").is_err());
/// ```
///
/// # Errors
///
/// Returns [`LoggerError::UnknownLevel`] carrying the input when it matches no level.
pub fn parse_level(name: &str) -> Result<Level, LoggerError> {
    match name.to_ascii_uppercase().as_str() {
        "DEBUG" => Ok(Level::Debug),
        "INFO" => Ok(Level::Info),
        "WARNING" => Ok(Level::Warning),
        "ERROR" => Ok(Level::Error),
        "FATAL" => Ok(Level::Fatal),
        "PANIC" => Ok(Level::Panic),
        _ => Err(LoggerError::UnknownLevel(name.to_owned())),
    }
}

impl FromStr for Level {
    type Err = LoggerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_level(s)
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_name())
    }
}

impl Serialize for Level {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.config_name())
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        parse_level(&name).map_err(serde::de::Error::custom)
    }
}
