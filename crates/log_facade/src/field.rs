//! Structured fields attached to log records.

use std::{borrow::Cow, time::Duration};

use serde::Serialize;
use serde_json::Value;

use super::{keys, LoggerError};

/// Hostname recorded when the operating system does not report one.
pub const UNKNOWN_HOSTNAME: &str = "unknown";

/// A single key-value pair carried by a log record.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    key: Cow<'static, str>,
    value: Value,
}

impl Field {
    /// Creates a field from anything convertible into a JSON value.
    ///
    /// ```
    /// use log_facade::Field;
    ///
    /// let field = Field::new("attempt", 3);
    /// assert_eq!(field.key(), "attempt");
    /// assert_eq!(field.value(), &serde_json::json!(3));
    /// ```
    pub fn new(key: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Creates a field holding a duration, rendered as fractional seconds.
    pub fn duration(key: impl Into<Cow<'static, str>>, duration: Duration) -> Self {
        Self::new(key, duration.as_secs_f64())
    }

    /// Creates a field holding the JSON serialization of `value`.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::JsonSerialization`] if `value` cannot be represented as JSON.
    pub fn serialized<T: Serialize + ?Sized>(
        key: impl Into<Cow<'static, str>>,
        value: &T,
    ) -> Result<Self, LoggerError> {
        Ok(Self::new(key, serde_json::to_value(value)?))
    }

    /// The field key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The field value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Whether the key belongs to the record layout and cannot be supplied by callers.
    pub(crate) fn is_reserved(&self) -> bool {
        keys::IMPLICIT_KEYS.contains(self.key())
    }
}

/// Creates the `reqId` field used to correlate the records of one logical request.
///
/// ```
/// use log_facade::request_id;
///
/// let field = request_id("3f1c");
/// assert_eq!(field.key(), "reqId");
/// assert_eq!(field.value(), "3f1c");
/// ```
pub fn request_id(id: impl Into<String>) -> Field {
    Field::new(keys::REQUEST_ID, id.into())
}

/// Creates an `INFO` span carrying `reqId`.
///
/// Events emitted through `tracing` macros while the span is entered inherit the field.
pub fn request_span(id: &str) -> tracing::Span {
    tracing::info_span!("request", reqId = id)
}

/// The fixed fields attached to every record of a field-enriched sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseFields {
    hostname: String,
    pid: u32,
}

impl BaseFields {
    /// Reads the hostname and process id of the running process.
    ///
    /// An empty hostname is replaced by [`UNKNOWN_HOSTNAME`].
    pub fn detect() -> Self {
        let hostname = gethostname::gethostname().to_string_lossy().into_owned();
        Self::new(hostname, std::process::id())
    }

    /// Creates base fields from explicit values.
    pub fn new(hostname: impl Into<String>, pid: u32) -> Self {
        let hostname = hostname.into();
        let hostname = if hostname.is_empty() {
            UNKNOWN_HOSTNAME.to_owned()
        } else {
            hostname
        };
        Self { hostname, pid }
    }

    /// The recorded hostname.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// The recorded process id.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub(crate) fn to_fields(&self) -> Vec<Field> {
        vec![
            Field::new(keys::HOSTNAME, self.hostname.clone()),
            Field::new(keys::PID, i64::from(self.pid)),
        ]
    }
}
