//! `log_facade` builds a structured logger over the [`tracing`] ecosystem.
//!
//! It offers:
//! - A [`build_logger`] function constructing a [`Logger`] from a [`LoggerConfig`]: a console
//!   sink on standard output, and optionally a JSON file sink, each with its own minimum
//!   [`Level`].
//! - [`Encoder`]s for JSON (millisecond epoch timestamps) and human-readable console output.
//! - [`BaseFields`] (hostname and pid) attached to JSON sinks through the [`WithFields`]
//!   decorator.
//! - [`parse_level`] for reading levels from configuration, and [`request_id`] for correlating
//!   the records of one request.
//! - [`new_observer`], an in-memory logger for asserting on records in tests.
//!
//! A [`Logger`] is an ordinary value: build it once at startup and pass it to the components that
//! log. Events emitted with the `tracing` macros reach the same sinks while the logger is the
//! current dispatcher.

mod bridge;
mod config;
mod encoder;
mod field;
mod level;
mod logger;
mod observer;
mod record;
mod sink;

#[cfg(test)]
mod test_utils;

pub use self::{
    config::LoggerConfig,
    encoder::{ConsoleEncoder, Encoder},
    field::{request_id, request_span, BaseFields, Field, UNKNOWN_HOSTNAME},
    level::{parse_level, Level},
    logger::{build_logger, build_logger_or_exit, Logger, LoggerOptions},
    observer::{new_observer, ObservedRecords},
    record::{Caller, Record},
    sink::{
        console_sink, file_sink, with_base_fields, FileSink, Sink, StdoutSink, Tee, WithFields,
        WriterSink,
    },
};

/// Keys of the members written by the encoders.
pub mod keys {
    use std::sync::LazyLock;

    use rustc_hash::FxHashSet;

    /// The log message.
    pub const MESSAGE: &str = "msg";
    /// The record's level.
    pub const LEVEL: &str = "level";
    /// Milliseconds since the Unix epoch.
    pub const TIME: &str = "time";
    /// Source location of the emitting call.
    pub const CALLER: &str = "caller";
    /// Stacktrace captured for errors.
    pub const STACKTRACE: &str = "stacktrace";
    /// Host the process runs on.
    pub const HOSTNAME: &str = "hostname";
    /// Process id.
    pub const PID: &str = "pid";
    /// Request correlation id.
    pub const REQUEST_ID: &str = "reqId";

    /// Name of the message field of `tracing` events.
    pub(crate) const TRACING_MESSAGE: &str = "message";

    /// Keys that callers cannot supply as fields.
    pub(crate) static IMPLICIT_KEYS: LazyLock<FxHashSet<&'static str>> = LazyLock::new(|| {
        [MESSAGE, LEVEL, TIME, CALLER, STACKTRACE, HOSTNAME, PID]
            .iter()
            .copied()
            .collect()
    });
}

/// Errors that can occur within the logger.
#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// Represents an error in configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A level name did not match any [`Level`].
    #[error("unknown log level: {0}")]
    UnknownLevel(String),

    /// Represents an error during JSON serialization.
    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    /// Represents an error while formatting a timestamp.
    #[error("Time formatting error: {0}")]
    TimeFormatting(#[from] time::error::Format),

    /// Represents an error while writing a record to its destination.
    #[error("Failed to write log record: {0}")]
    Io(#[from] std::io::Error),

    /// Represents an error while opening the log file.
    #[error("Failed to open log file: {0}")]
    FileAppenderInitialization(#[from] tracing_appender::rolling::InitError),

    /// Represents an error due to an invalid filtering directive.
    #[error("Failed to parse filtering directive: {0}")]
    InvalidFilteringDirective(#[from] tracing_subscriber::filter::ParseError),
}
