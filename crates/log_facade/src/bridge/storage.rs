//! Provides a [`tracing_subscriber::Layer`] ([`SpanStorageLayer`]) for capturing and storing
//! key-value data from tracing spans.

use std::fmt;

use serde_json::Value;
use tracing::{
    field::{Field, Visit},
    span::{Attributes, Record},
    Id, Subscriber,
};
use tracing_subscriber::{layer::Context, registry::LookupSpan, Layer};

use crate::keys;

/// A [`tracing_subscriber::Layer`] that stores span fields within span extensions, so that events
/// emitted inside a span inherit them.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct SpanStorageLayer;

/// Holds key-value data recorded for a span or an event, in recording order.
#[derive(Clone, Debug, Default)]
pub(crate) struct Storage<'a> {
    /// The collected key-value pairs.
    values: Vec<(&'a str, Value)>,

    /// The primary message of an event, if captured.
    message: Option<String>,
}

impl<'a> Storage<'a> {
    /// Records a key-value pair, replacing an earlier value for the same key.
    pub(crate) fn record_value(&mut self, key: &'a str, value: Value) {
        match self.values.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, existing)) => *existing = value,
            None => self.values.push((key, value)),
        }
    }

    pub(crate) fn values(&self) -> &[(&'a str, Value)] {
        &self.values
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.values.iter().any(|(existing, _)| *existing == key)
    }

    pub(crate) fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

impl Storage<'_> {
    /// Records a scalar, which only becomes the message when no string message was seen.
    fn record_scalar<T>(&mut self, field: &Field, value: T)
    where
        T: ToString,
        Value: From<T>,
    {
        if field.name() != keys::TRACING_MESSAGE {
            self.record_value(field.name(), Value::from(value));
        } else if self.message.is_none() {
            self.message = Some(value.to_string());
        }
    }
}

impl Visit for Storage<'_> {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.record_scalar(field, value);
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record_scalar(field, value);
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record_scalar(field, value);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.record_scalar(field, value);
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == keys::TRACING_MESSAGE {
            self.message = Some(value.to_owned());
        } else {
            self.record_value(field.name(), Value::from(value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        match field.name() {
            keys::TRACING_MESSAGE => {
                if self.message.is_none() {
                    self.message = Some(format!("{value:?}"));
                }
            }
            // `log` crate metadata, already carried by the event's own metadata
            name if name.starts_with("log.") => {}
            name => {
                let name = name.strip_prefix("r#").unwrap_or(name);
                self.record_value(name, Value::from(format!("{value:?}")));
            }
        }
    }
}

impl<S: Subscriber + for<'a> LookupSpan<'a>> Layer<S> for SpanStorageLayer {
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(id) else {
            return;
        };

        // Inherit storage from parent span if it exists, otherwise create a new one.
        let mut visitor = span
            .parent()
            .and_then(|parent_span| parent_span.extensions().get::<Storage<'_>>().cloned())
            .unwrap_or_default();

        attrs.record(&mut visitor);
        span.extensions_mut().insert(visitor);
    }

    fn on_record(&self, span_id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span) = ctx.span(span_id) else {
            return;
        };
        let mut extensions = span.extensions_mut();

        if let Some(visitor) = extensions.get_mut::<Storage<'_>>() {
            values.record(visitor);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::json;
    use tracing_subscriber::layer::SubscriberExt;

    use super::*;

    #[test]
    fn later_values_replace_earlier_ones_in_place() {
        let mut storage = Storage::default();
        storage.record_value("reqId", json!("a"));
        storage.record_value("attempt", json!(1));
        storage.record_value("reqId", json!("b"));

        assert_eq!(
            storage.values(),
            &[("reqId", json!("b")), ("attempt", json!(1))]
        );
        assert!(storage.contains("attempt"));
        assert!(!storage.contains("msg"));
        assert_eq!(storage.message(), None);
    }

    type Collected = Arc<Mutex<Option<(Vec<(String, Value)>, Option<String>)>>>;

    struct CollectEvent(Collected);

    impl<S: Subscriber> Layer<S> for CollectEvent {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            let mut storage = Storage::default();
            event.record(&mut storage);
            let values = storage
                .values()
                .iter()
                .map(|(key, value)| ((*key).to_owned(), value.clone()))
                .collect();
            *self.0.lock().unwrap() = Some((values, storage.message().map(str::to_owned)));
        }
    }

    #[test]
    fn events_collect_scalars_and_the_message() {
        let collected = Collected::default();
        let subscriber = tracing_subscriber::registry().with(CollectEvent(Arc::clone(&collected)));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(
                attempt = 2_u64,
                delta = -1_i64,
                ok = true,
                ratio = 0.5,
                route = "payments",
                "backing off"
            );
        });

        let (values, message) = collected.lock().unwrap().take().unwrap();
        assert_eq!(message.as_deref(), Some("backing off"));
        assert_eq!(
            values,
            [
                ("attempt".to_owned(), json!(2)),
                ("delta".to_owned(), json!(-1)),
                ("ok".to_owned(), json!(true)),
                ("ratio".to_owned(), json!(0.5)),
                ("route".to_owned(), json!("payments")),
            ]
        );
    }
}
