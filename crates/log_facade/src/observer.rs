//! An in-memory sink for asserting on emitted records in tests.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;

use super::{sink::Sink, Level, Logger, LoggerError, LoggerOptions, Record, Tee};

/// The records captured by an observing logger, in emission order.
#[derive(Clone, Debug, Default)]
pub struct ObservedRecords {
    records: Arc<Mutex<Vec<Record>>>,
}

impl ObservedRecords {
    fn lock(&self) -> MutexGuard<'_, Vec<Record>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The number of captured records.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no record was captured.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// A copy of all captured records.
    pub fn all(&self) -> Vec<Record> {
        self.lock().clone()
    }

    /// Removes and returns all captured records.
    pub fn take_all(&self) -> Vec<Record> {
        std::mem::take(&mut *self.lock())
    }

    /// The captured records with the given message.
    pub fn filter_message(&self, message: &str) -> Vec<Record> {
        self.filter(|record| record.message() == message)
    }

    /// The captured records at exactly `level`.
    pub fn filter_level(&self, level: Level) -> Vec<Record> {
        self.filter(|record| record.level() == level)
    }

    /// The captured records whose message contains `snippet`.
    pub fn filter_message_snippet(&self, snippet: &str) -> Vec<Record> {
        self.filter(|record| record.message().contains(snippet))
    }

    /// The captured records carrying a field `key`, whatever its value.
    pub fn filter_field_key(&self, key: &str) -> Vec<Record> {
        self.filter(|record| record.field(key).is_some())
    }

    /// The captured records carrying a field `key` equal to `value`.
    pub fn filter_field(&self, key: &str, value: &Value) -> Vec<Record> {
        self.filter(|record| record.field(key) == Some(value))
    }

    fn filter(&self, predicate: impl Fn(&Record) -> bool) -> Vec<Record> {
        self.lock()
            .iter()
            .filter(|record| predicate(record))
            .cloned()
            .collect()
    }
}

#[derive(Debug)]
struct ObservingSink {
    records: ObservedRecords,
}

impl Sink for ObservingSink {
    fn level(&self) -> Level {
        Level::Debug
    }

    fn write(&self, record: &Record) -> Result<(), LoggerError> {
        self.records.lock().push(record.clone());
        Ok(())
    }
}

/// Builds a logger capturing every record in memory, and the handle to read them back.
///
/// ```
/// use log_facade::{new_observer, request_id};
///
/// let (logger, observed) = new_observer();
/// logger.info("accepted", &[request_id("r-1")]);
///
/// let records = observed.filter_message("accepted");
/// assert_eq!(records.len(), 1);
/// assert_eq!(records[0].field("reqId"), Some(&serde_json::json!("r-1")));
/// ```
pub fn new_observer() -> (Logger, ObservedRecords) {
    let records = ObservedRecords::default();
    let sink = ObservingSink {
        records: records.clone(),
    };
    let logger = Logger::new(Tee::new(vec![Box::new(sink)]), LoggerOptions::default());
    (logger, records)
}
