//! The structured log record passed from the logger to its sinks.

use std::{fmt, panic::Location};

use serde_json::Value;
use time::OffsetDateTime;

use super::{Field, Level};

/// Source location of the call that emitted a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Caller {
    file: &'static str,
    line: u32,
}

impl Caller {
    /// Creates a caller from a file path and line number.
    pub fn new(file: &'static str, line: u32) -> Self {
        Self { file, line }
    }

    /// The full source file path.
    pub fn file(&self) -> &'static str {
        self.file
    }

    /// The source line.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// The last directory and file name of the source path, e.g. `src/main.rs`.
    fn short_file(&self) -> &'static str {
        match self.file.rmatch_indices(['/', '\\']).nth(1) {
            Some((index, _)) => self.file.get(index + 1..).unwrap_or(self.file),
            None => self.file,
        }
    }
}

impl From<&'static Location<'static>> for Caller {
    fn from(location: &'static Location<'static>) -> Self {
        Self::new(location.file(), location.line())
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.short_file(), self.line)
    }
}

/// A single log record.
///
/// Records are built by the [`Logger`][crate::Logger] and handed to every sink whose level
/// threshold the record satisfies.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    time: OffsetDateTime,
    level: Level,
    message: String,
    fields: Vec<Field>,
    caller: Option<Caller>,
    stacktrace: Option<String>,
}

impl Record {
    /// Creates a record timestamped with the current time.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            time: OffsetDateTime::now_utc(),
            level,
            message: message.into(),
            fields: Vec::new(),
            caller: None,
            stacktrace: None,
        }
    }

    /// Replaces the timestamp.
    pub fn with_time(mut self, time: OffsetDateTime) -> Self {
        self.time = time;
        self
    }

    /// Appends fields, skipping any that use a reserved key.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        for field in fields {
            self.push_field(field);
        }
        self
    }

    /// Sets the caller location.
    pub fn with_caller(mut self, caller: Caller) -> Self {
        self.caller = Some(caller);
        self
    }

    /// Sets the captured stacktrace.
    pub fn with_stacktrace(mut self, stacktrace: impl Into<String>) -> Self {
        self.stacktrace = Some(stacktrace.into());
        self
    }

    /// Appends a field unless its key is reserved for the record layout.
    pub(crate) fn push_field(&mut self, field: Field) {
        if !field.is_reserved() {
            self.fields.push(field);
        }
    }

    /// Returns a copy of this record with `fields` placed before its own fields.
    ///
    /// Reserved keys are accepted here, since sinks use this to attach [`BaseFields`].
    ///
    /// [`BaseFields`]: crate::BaseFields
    pub(crate) fn with_leading_fields(&self, fields: &[Field]) -> Self {
        let mut all = Vec::with_capacity(fields.len() + self.fields.len());
        all.extend_from_slice(fields);
        all.extend_from_slice(&self.fields);
        Self {
            fields: all,
            ..self.clone()
        }
    }

    /// When the record was emitted.
    pub fn time(&self) -> OffsetDateTime {
        self.time
    }

    /// The record's severity.
    pub fn level(&self) -> Level {
        self.level
    }

    /// The log message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// All fields, in emission order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The value of the first field with the given key.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|field| field.key() == key)
            .map(Field::value)
    }

    /// The caller location, present when caller capture is enabled.
    pub fn caller(&self) -> Option<Caller> {
        self.caller
    }

    /// The stacktrace, present for records at [`Level::Error`] or above.
    pub fn stacktrace(&self) -> Option<&str> {
        self.stacktrace.as_deref()
    }
}
