//! Sinks: the destinations log records are written to.
//!
//! A [`Sink`] pairs an [`Encoder`] with a minimum [`Level`] and a destination. Sinks compose:
//! [`WithFields`] decorates a sink with fixed fields, and [`Tee`] fans a record out to several
//! sinks, each applying its own level threshold.

use std::{
    ffi::OsStr,
    fmt,
    io::{self, Write},
    path::Path,
    sync::Mutex,
};

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;

use super::{BaseFields, Encoder, Field, Level, LoggerError, Record};

/// A destination for log records.
///
/// Implementations must be safe to share between threads, and must write each record as a unit
/// so that concurrent records never interleave.
pub trait Sink: fmt::Debug + Send + Sync {
    /// The minimum level this sink emits.
    fn level(&self) -> Level;

    /// Whether a record at `level` would be written by this sink.
    fn enabled(&self, level: Level) -> bool {
        level >= self.level()
    }

    /// Writes a record.
    ///
    /// Callers are expected to check [`Sink::enabled`] first.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError`] if the record cannot be encoded or written.
    fn write(&self, record: &Record) -> Result<(), LoggerError>;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn level(&self) -> Level {
        (**self).level()
    }

    fn enabled(&self, level: Level) -> bool {
        (**self).enabled(level)
    }

    fn write(&self, record: &Record) -> Result<(), LoggerError> {
        (**self).write(record)
    }
}

/// A sink encoding records and writing them through a [`MakeWriter`].
#[derive(Debug)]
pub struct WriterSink<W> {
    encoder: Encoder,
    level: Level,
    dst_writer: W,
}

impl<W> WriterSink<W>
where
    W: for<'a> MakeWriter<'a> + fmt::Debug + Send + Sync + 'static,
{
    /// Creates a sink writing records at or above `level`, encoded with `encoder`.
    pub fn new(encoder: Encoder, level: Level, dst_writer: W) -> Self {
        Self {
            encoder,
            level,
            dst_writer,
        }
    }

    /// The encoder used by this sink.
    pub fn encoder(&self) -> Encoder {
        self.encoder
    }
}

impl<W> Sink for WriterSink<W>
where
    W: for<'a> MakeWriter<'a> + fmt::Debug + Send + Sync + 'static,
{
    fn level(&self) -> Level {
        self.level
    }

    /// Encodes into a memory buffer and writes it with a single `write_all` call, so that
    /// records from different threads are not fragmented.
    fn write(&self, record: &Record) -> Result<(), LoggerError> {
        let buffer = self.encoder.encode(record)?;
        self.dst_writer.make_writer().write_all(&buffer)?;
        Ok(())
    }
}

/// A sink decorator adding fixed fields to every record it forwards.
///
/// The fields are placed before the record's own fields.
#[derive(Debug)]
pub struct WithFields<S> {
    inner: S,
    fields: Vec<Field>,
}

impl<S: Sink> WithFields<S> {
    /// Wraps `inner`, attaching `fields` to every record.
    pub fn new(inner: S, fields: impl IntoIterator<Item = Field>) -> Self {
        Self {
            inner,
            fields: fields.into_iter().collect(),
        }
    }

    /// The wrapped sink.
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// The attached fields.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }
}

impl<S: Sink> Sink for WithFields<S> {
    fn level(&self) -> Level {
        self.inner.level()
    }

    fn enabled(&self, level: Level) -> bool {
        self.inner.enabled(level)
    }

    fn write(&self, record: &Record) -> Result<(), LoggerError> {
        self.inner.write(&record.with_leading_fields(&self.fields))
    }
}

/// Wraps `sink` so that every record carries the hostname and pid of this process.
///
/// The base fields are read once, when this function is called.
pub fn with_base_fields<S: Sink>(sink: S) -> WithFields<S> {
    WithFields::new(sink, BaseFields::detect().to_fields())
}

/// Fans records out to an ordered collection of sinks.
///
/// Each sink receives a record only if the record satisfies that sink's level.
#[derive(Debug, Default)]
pub struct Tee {
    sinks: Vec<Box<dyn Sink>>,
}

impl Tee {
    /// Creates a fan-out over `sinks`.
    pub fn new(sinks: Vec<Box<dyn Sink>>) -> Self {
        Self { sinks }
    }

    /// Appends a sink.
    pub fn push(&mut self, sink: Box<dyn Sink>) {
        self.sinks.push(sink);
    }

    /// The number of sinks.
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether the fan-out has no sinks.
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl Sink for Tee {
    /// The lowest level of any sink, or [`Level::Panic`] when empty.
    fn level(&self) -> Level {
        self.sinks
            .iter()
            .map(|sink| sink.level())
            .min()
            .unwrap_or(Level::Panic)
    }

    fn enabled(&self, level: Level) -> bool {
        self.sinks.iter().any(|sink| sink.enabled(level))
    }

    /// Writes to every enabled sink, even if an earlier one fails; the first error is returned.
    fn write(&self, record: &Record) -> Result<(), LoggerError> {
        let mut result = Ok(());
        for sink in self.sinks.iter().filter(|sink| sink.enabled(record.level())) {
            if let Err(error) = sink.write(record) {
                if result.is_ok() {
                    result = Err(error);
                }
            }
        }
        result
    }
}

/// The sink writing to standard output.
pub type StdoutSink = WriterSink<fn() -> io::Stdout>;

/// The sink writing JSON records to a log file.
pub type FileSink = WithFields<WriterSink<Mutex<RollingFileAppender>>>;

/// Builds the standard output sink.
///
/// Pretty output uses the console encoder and carries no base fields; otherwise records are
/// JSON-encoded and carry the hostname and pid.
pub fn console_sink(pretty_output: bool, level: Level) -> Box<dyn Sink> {
    let stdout: fn() -> io::Stdout = io::stdout;
    if pretty_output {
        Box::new(StdoutSink::new(Encoder::console(), level, stdout))
    } else {
        Box::new(with_base_fields(StdoutSink::new(
            Encoder::Json,
            level,
            stdout,
        )))
    }
}

/// Builds a JSON sink appending to the file at `path`.
///
/// The file is created if it does not exist, along with any missing parent directories.
///
/// # Errors
///
/// Returns [`LoggerError::Configuration`] if `path` does not end in a file name, and
/// [`LoggerError::FileAppenderInitialization`] if the file cannot be opened.
pub fn file_sink(path: &Path, level: Level) -> Result<FileSink, LoggerError> {
    let appender = open_log_file(path)?;
    Ok(with_base_fields(WriterSink::new(
        Encoder::Json,
        level,
        Mutex::new(appender),
    )))
}

fn open_log_file(path: &Path) -> Result<RollingFileAppender, LoggerError> {
    let file_name = path
        .file_name()
        .and_then(OsStr::to_str)
        .ok_or_else(|| {
            LoggerError::Configuration(format!(
                "log file path `{}` does not name a file",
                path.display()
            ))
        })?;
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    // A single file that is never rotated
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name)
        .build(directory)?;

    Ok(appender)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::Value;

    use super::*;
    use crate::{test_utils::SharedBuffer, ConsoleEncoder};

    fn buffer_sink(encoder: Encoder, level: Level) -> (WriterSink<SharedBuffer>, SharedBuffer) {
        let buffer = SharedBuffer::default();
        (WriterSink::new(encoder, level, buffer.clone()), buffer)
    }

    #[test]
    fn writer_sink_applies_its_level() {
        let (sink, _buffer) = buffer_sink(Encoder::Json, Level::Warning);
        assert!(!sink.enabled(Level::Info));
        assert!(sink.enabled(Level::Warning));
        assert!(sink.enabled(Level::Panic));
    }

    #[test]
    fn decorated_sink_prepends_fields() {
        let (sink, buffer) = buffer_sink(Encoder::Json, Level::Debug);
        let sink = WithFields::new(sink, BaseFields::new("box-1", 7).to_fields());

        let record = Record::new(Level::Info, "ready").with_fields([crate::request_id("r-1")]);
        sink.write(&record).unwrap();

        let lines = buffer.lines();
        let value: Value = serde_json::from_str(lines.first().unwrap()).unwrap();
        assert_eq!(value["hostname"], "box-1");
        assert_eq!(value["pid"], 7);
        assert_eq!(value["reqId"], "r-1");
        assert!(record.field("hostname").is_none());
    }

    #[test]
    fn tee_filters_per_sink() {
        let (debug_sink, debug_buffer) = buffer_sink(Encoder::Json, Level::Debug);
        let (error_sink, error_buffer) = buffer_sink(Encoder::Json, Level::Error);
        let tee = Tee::new(vec![Box::new(debug_sink), Box::new(error_sink)]);

        assert_eq!(tee.len(), 2);
        assert_eq!(tee.level(), Level::Debug);

        for level in Level::ALL {
            let record = Record::new(level, level.as_str());
            if tee.enabled(level) {
                tee.write(&record).unwrap();
            }
        }

        assert_eq!(debug_buffer.lines().len(), 6);
        let error_lines = error_buffer.lines();
        assert_eq!(error_lines.len(), 3);
        assert!(error_lines
            .iter()
            .all(|line| !line.contains("\"info\"") && !line.contains("\"debug\"")));
    }

    #[test]
    fn empty_tee_enables_nothing() {
        let tee = Tee::default();
        assert!(tee.is_empty());
        assert!(!tee.enabled(Level::Panic));
        assert_eq!(tee.level(), Level::Panic);
    }

    #[test]
    fn pretty_console_sink_carries_no_base_fields() {
        let (sink, buffer) = buffer_sink(
            Encoder::Console(ConsoleEncoder::new().with_colors(false)),
            Level::Debug,
        );
        sink.write(&Record::new(Level::Info, "ready")).unwrap();

        let output = buffer.contents();
        assert!(output.contains("INFO ready"));
        assert!(!output.contains("hostname"));
        assert!(!output.contains("pid"));
    }

    #[test]
    fn file_sink_appends_json_with_base_fields() {
        let directory = tempfile::tempdir().unwrap();
        let path = directory.path().join("nested").join("router.log");

        let sink = file_sink(&path, Level::Info).unwrap();
        sink.write(&Record::new(Level::Info, "first")).unwrap();
        sink.write(&Record::new(Level::Error, "second")).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let records: Vec<Value> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        for record in &records {
            assert_eq!(record["pid"], std::process::id());
            assert!(record["hostname"].is_string());
        }
        assert_eq!(records[1]["msg"], "second");
    }

    #[test]
    fn file_sink_fails_when_the_directory_cannot_be_created() {
        let blocker = tempfile::NamedTempFile::new().unwrap();
        let path = blocker.path().join("router.log");

        let error = file_sink(&path, Level::Info).unwrap_err();
        assert!(matches!(error, LoggerError::FileAppenderInitialization(_)));
    }

    #[test]
    fn file_sink_requires_a_file_name() {
        let error = file_sink(Path::new("/"), Level::Info).unwrap_err();
        assert!(matches!(error, LoggerError::Configuration(_)));
    }
}
