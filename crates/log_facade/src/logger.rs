//! The [`Logger`] and the factory building it from a [`LoggerConfig`].

use std::{backtrace::Backtrace, panic::Location, sync::Arc};

use tracing::{dispatcher::DefaultGuard, Dispatch};
use tracing_subscriber::{layer::SubscriberExt, EnvFilter};

use super::{
    bridge::{BridgeLayer, SpanStorageLayer},
    sink::{console_sink, file_sink, Sink, Tee},
    Caller, Field, Level, LoggerConfig, LoggerError, Record,
};

/// Options applying to every record of a [`Logger`], regardless of sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggerOptions {
    /// Attach the `caller` (source file and line) to every record.
    pub add_caller: bool,

    /// Attach a `stacktrace` to records at or above this level. `None` disables stacktraces.
    pub stacktrace_level: Option<Level>,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            add_caller: false,
            stacktrace_level: Some(Level::Error),
        }
    }
}

/// State shared by a [`Logger`] and its `tracing` bridge.
#[derive(Debug)]
pub(crate) struct Core {
    tee: Tee,
    options: LoggerOptions,
}

impl Core {
    pub(crate) fn enabled(&self, level: Level) -> bool {
        self.tee.enabled(level)
    }

    /// Builds a record and hands it to every sink accepting its level.
    ///
    /// Write failures are reported on standard error; they never reach the emitting caller.
    pub(crate) fn emit(
        &self,
        level: Level,
        message: &str,
        fields: impl IntoIterator<Item = Field>,
        caller: Option<Caller>,
    ) {
        if !self.enabled(level) {
            return;
        }

        let (reserved, fields): (Vec<Field>, Vec<Field>) =
            fields.into_iter().partition(Field::is_reserved);
        if self.enabled(Level::Warning) {
            for field in &reserved {
                self.write(&Record::new(
                    Level::Warning,
                    format!(
                        "Attempting to log a reserved key `{}` (value: `{}`). Skipping.",
                        field.key(),
                        field.value()
                    ),
                ));
            }
        }

        let mut record = Record::new(level, message).with_fields(fields);
        if self.options.add_caller {
            if let Some(caller) = caller {
                record = record.with_caller(caller);
            }
        }
        if self
            .options
            .stacktrace_level
            .is_some_and(|threshold| level >= threshold)
        {
            record = record.with_stacktrace(Backtrace::force_capture().to_string());
        }

        self.write(&record);
    }

    fn write(&self, record: &Record) {
        if let Err(error) = self.tee.write(record) {
            #[allow(clippy::print_stderr)]
            {
                eprintln!(
                    "[ERROR] {}: failed to write log record: {error}",
                    env!("CARGO_PKG_NAME")
                );
            }
        }
    }
}

/// A structured logger writing to one or more sinks.
///
/// A `Logger` is built once and passed to the components that log; clones share the same sinks.
/// Records can be emitted through its methods, or through the `tracing` macros while the logger
/// is the current dispatcher (see [`Logger::with_default`]).
#[derive(Clone, Debug)]
pub struct Logger {
    core: Arc<Core>,
    dispatch: Dispatch,
}

impl Logger {
    /// Creates a logger over the given fan-out.
    pub fn new(tee: Tee, options: LoggerOptions) -> Self {
        Self::assemble(tee, options, None)
    }

    /// Creates a logger whose `tracing` bridge is additionally filtered by `filter`.
    ///
    /// The filter only applies to events emitted through the `tracing` macros.
    pub fn with_env_filter(tee: Tee, options: LoggerOptions, filter: EnvFilter) -> Self {
        Self::assemble(tee, options, Some(filter))
    }

    fn assemble(tee: Tee, options: LoggerOptions, filter: Option<EnvFilter>) -> Self {
        let core = Arc::new(Core { tee, options });
        let bridge = BridgeLayer::new(Arc::clone(&core));

        let dispatch = match filter {
            Some(filter) => Dispatch::new(
                tracing_subscriber::registry()
                    .with(filter)
                    .with(SpanStorageLayer)
                    .with(bridge),
            ),
            None => Dispatch::new(
                tracing_subscriber::registry()
                    .with(SpanStorageLayer)
                    .with(bridge),
            ),
        };

        Self { core, dispatch }
    }

    /// The number of sinks records fan out to.
    pub fn sink_count(&self) -> usize {
        self.core.tee.len()
    }

    /// The options this logger was built with.
    pub fn options(&self) -> LoggerOptions {
        self.core.options
    }

    /// Whether any sink would write a record at `level`.
    pub fn enabled(&self, level: Level) -> bool {
        self.core.enabled(level)
    }

    /// The `tracing` dispatcher feeding this logger's sinks.
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Runs `f` with this logger as the `tracing` dispatcher of the current thread.
    pub fn with_default<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }

    /// Makes this logger the `tracing` dispatcher of the current thread until the guard is
    /// dropped.
    pub fn set_default(&self) -> DefaultGuard {
        tracing::dispatcher::set_default(&self.dispatch)
    }

    /// Emits a record at `level`.
    #[track_caller]
    pub fn log(&self, level: Level, message: &str, fields: &[Field]) {
        self.core.emit(
            level,
            message,
            fields.iter().cloned(),
            Some(Caller::from(Location::caller())),
        );
    }

    /// Emits a [`Level::Debug`] record.
    #[track_caller]
    pub fn debug(&self, message: &str, fields: &[Field]) {
        self.log(Level::Debug, message, fields);
    }

    /// Emits a [`Level::Info`] record.
    #[track_caller]
    pub fn info(&self, message: &str, fields: &[Field]) {
        self.log(Level::Info, message, fields);
    }

    /// Emits a [`Level::Warning`] record.
    #[track_caller]
    pub fn warn(&self, message: &str, fields: &[Field]) {
        self.log(Level::Warning, message, fields);
    }

    /// Emits a [`Level::Error`] record.
    #[track_caller]
    pub fn error(&self, message: &str, fields: &[Field]) {
        self.log(Level::Error, message, fields);
    }

    /// Emits a [`Level::Fatal`] record, then exits the process with status 1.
    #[track_caller]
    pub fn fatal(&self, message: &str, fields: &[Field]) -> ! {
        self.log(Level::Fatal, message, fields);
        std::process::exit(1)
    }

    /// Emits a [`Level::Panic`] record, then panics with `message`.
    ///
    /// # Panics
    ///
    /// Always.
    #[track_caller]
    #[allow(clippy::panic)]
    pub fn panic(&self, message: &str, fields: &[Field]) -> ! {
        self.log(Level::Panic, message, fields);
        panic!("{message}")
    }
}

/// Builds a [`Logger`] from `config`.
///
/// The logger always writes to standard output at `console_level`, using the console encoder if
/// `pretty_output` is set and JSON otherwise. If `file_output_path` is set, records at or above
/// `file_level` are also appended to that file as JSON.
///
/// # Example
///
/// ```
/// use log_facade::{build_logger, request_id, Level, LoggerConfig};
///
/// let logger = build_logger(LoggerConfig {
///     pretty_output: true,
///     console_level: Level::Debug,
///     ..LoggerConfig::default()
/// })?;
///
/// logger.info("listening", &[request_id("c0ffee")]);
/// logger.with_default(|| tracing::warn!(attempt = 2, "upstream slow"));
/// # Ok::<(), log_facade::LoggerError>(())
/// ```
///
/// # Errors
///
/// Returns [`LoggerError::FileAppenderInitialization`] if the log file cannot be opened,
/// [`LoggerError::Configuration`] if the file path names no file, and
/// [`LoggerError::InvalidFilteringDirective`] if `filtering_directive` does not parse.
pub fn build_logger(config: LoggerConfig) -> Result<Logger, LoggerError> {
    let mut tee = Tee::new(vec![console_sink(
        config.pretty_output,
        config.console_level,
    )]);

    if let Some(path) = config
        .file_output_path
        .as_deref()
        .filter(|path| !path.as_os_str().is_empty())
    {
        tee.push(Box::new(file_sink(path, config.file_level)?));
    }

    let options = LoggerOptions {
        add_caller: config.debug_mode,
        stacktrace_level: Some(Level::Error),
    };

    match config.filtering_directive {
        Some(directive) => {
            let filter = EnvFilter::builder()
                .with_default_directive(tee.level().as_level_filter().into())
                .parse(directive)?;
            Ok(Logger::with_env_filter(tee, options, filter))
        }
        None => Ok(Logger::new(tee, options)),
    }
}

/// Builds a [`Logger`] from `config`, terminating the process if that fails.
///
/// A logging destination that cannot be opened is not recoverable: the error is printed to
/// standard error and the process exits with status 1.
#[allow(clippy::print_stderr)]
pub fn build_logger_or_exit(config: LoggerConfig) -> Logger {
    match build_logger(config) {
        Ok(logger) => logger,
        Err(error) => {
            eprintln!("[ERROR] {}: {}", env!("CARGO_PKG_NAME"), startup_failure(&error));
            std::process::exit(1)
        }
    }
}

fn startup_failure(error: &LoggerError) -> String {
    match error {
        LoggerError::FileAppenderInitialization(error) => {
            format!("could not open log file: {error}")
        }
        error => format!("could not build logger: {error}"),
    }
}
