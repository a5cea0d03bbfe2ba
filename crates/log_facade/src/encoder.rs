//! Encoders turning a [`Record`] into the bytes written by a sink.
//!
//! Two encoders are provided: [`Encoder::Json`] for machine-readable output and
//! [`Encoder::Console`] for humans reading a terminal.

use colored::{Color, Colorize};
use serde::ser::{SerializeMap, Serializer};
use time::{
    format_description::BorrowedFormatItem, macros::format_description, OffsetDateTime, UtcOffset,
};

use super::{keys, Level, LoggerError, Record};

/// Wall-clock layout of the console encoder, e.g. `03:04:05 PM`.
const CONSOLE_TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour repr:12]:[minute]:[second] [period]");

/// Milliseconds elapsed since the Unix epoch, rounded towards negative infinity.
pub(crate) fn unix_millis(time: OffsetDateTime) -> i64 {
    let millis = time.unix_timestamp_nanos().div_euclid(1_000_000);
    i64::try_from(millis).unwrap_or(i64::MAX)
}

/// Serialization strategy of a sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoder {
    /// One compact JSON object per line.
    Json,

    /// Space-separated, human-readable lines.
    Console(ConsoleEncoder),
}

impl Encoder {
    /// Creates a console encoder using the local UTC offset, with colored levels.
    pub fn console() -> Self {
        Self::Console(ConsoleEncoder::new())
    }

    /// Whether this is the JSON encoder.
    pub fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }

    /// Encodes a record into a newline-terminated buffer.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError`] if a field cannot be serialized or the timestamp cannot be
    /// formatted.
    pub fn encode(self, record: &Record) -> Result<Vec<u8>, LoggerError> {
        let mut buffer = Vec::new();
        match self {
            Self::Json => encode_json(record, &mut buffer)?,
            Self::Console(console) => console.encode_into(record, &mut buffer)?,
        }
        Ok(buffer)
    }
}

/// Serializes the record as a single JSON object followed by a newline.
fn encode_json(record: &Record, buffer: &mut Vec<u8>) -> Result<(), LoggerError> {
    {
        let mut serializer = serde_json::Serializer::new(&mut *buffer);
        let mut map_serializer = serializer.serialize_map(None)?;

        map_serializer.serialize_entry(keys::LEVEL, record.level().as_str())?;
        map_serializer.serialize_entry(keys::TIME, &unix_millis(record.time()))?;
        if let Some(caller) = record.caller() {
            map_serializer.serialize_entry(keys::CALLER, &format_args!("{caller}"))?;
        }
        map_serializer.serialize_entry(keys::MESSAGE, record.message())?;

        for field in record.fields() {
            map_serializer.serialize_entry(field.key(), field.value())?;
        }

        if let Some(stacktrace) = record.stacktrace() {
            map_serializer.serialize_entry(keys::STACKTRACE, stacktrace)?;
        }

        map_serializer.end()?;
    }
    buffer.push(b'\n');
    Ok(())
}

/// Human-readable encoder: `TIME LEVEL [caller] message [{fields}]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsoleEncoder {
    offset: UtcOffset,
    colors: bool,
}

impl Default for ConsoleEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConsoleEncoder {
    /// Creates a console encoder rendering times in the local offset.
    ///
    /// The offset is determined once; UTC is used when it cannot be determined. On Unix the
    /// `time` crate refuses to read the local offset once the process runs more than one thread,
    /// so build the logger before starting an async runtime or worker threads, or pass the offset
    /// explicitly with [`ConsoleEncoder::with_offset`].
    pub fn new() -> Self {
        Self {
            offset: UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
            colors: true,
        }
    }

    /// Renders times in the given offset instead of the local one.
    pub fn with_offset(mut self, offset: UtcOffset) -> Self {
        self.offset = offset;
        self
    }

    /// Enables or disables level colors.
    pub fn with_colors(mut self, colors: bool) -> Self {
        self.colors = colors;
        self
    }

    fn level_color(level: Level) -> Color {
        match level {
            Level::Debug => Color::Magenta,
            Level::Info => Color::Blue,
            Level::Warning => Color::Yellow,
            Level::Error | Level::Fatal | Level::Panic => Color::Red,
        }
    }

    fn encode_into(self, record: &Record, buffer: &mut Vec<u8>) -> Result<(), LoggerError> {
        use std::io::Write;

        record
            .time()
            .to_offset(self.offset)
            .format_into(buffer, CONSOLE_TIME_FORMAT)?;

        let level = record.level().as_capital_str();
        if self.colors {
            write!(buffer, " {}", level.color(Self::level_color(record.level())))?;
        } else {
            write!(buffer, " {level}")?;
        }

        if let Some(caller) = record.caller() {
            write!(buffer, " {caller}")?;
        }
        write!(buffer, " {}", record.message())?;

        if !record.fields().is_empty() {
            buffer.push(b' ');
            let mut serializer = serde_json::Serializer::new(&mut *buffer);
            let mut map_serializer = serializer.serialize_map(Some(record.fields().len()))?;
            for field in record.fields() {
                map_serializer.serialize_entry(field.key(), field.value())?;
            }
            map_serializer.end()?;
        }
        buffer.push(b'\n');

        if let Some(stacktrace) = record.stacktrace() {
            buffer.extend_from_slice(stacktrace.trim_end().as_bytes());
            buffer.push(b'\n');
        }

        Ok(())
    }
}
