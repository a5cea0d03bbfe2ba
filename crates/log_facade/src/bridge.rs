//! Routes events emitted through the `tracing` macros into a [`Logger`][crate::Logger]'s sinks.

mod storage;

use std::sync::Arc;

use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::{layer::Context, registry::LookupSpan, Layer};

pub(crate) use self::storage::SpanStorageLayer;
use self::storage::Storage;
use super::{logger::Core, Caller, Field, Level};

/// A [`tracing_subscriber::Layer`] turning `tracing` events into records for the fan-out.
///
/// Event fields come first, followed by the fields of the enclosing spans that the event did not
/// set itself.
#[derive(Debug)]
pub(crate) struct BridgeLayer {
    core: Arc<Core>,
}

impl BridgeLayer {
    pub(crate) fn new(core: Arc<Core>) -> Self {
        Self { core }
    }
}

impl<S> Layer<S> for BridgeLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        metadata.is_span()
            || Level::from_tracing(*metadata.level()).is_some_and(|level| self.core.enabled(level))
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let Some(level) = Level::from_tracing(*metadata.level()) else {
            return;
        };
        if !self.core.enabled(level) {
            return;
        }

        let mut storage = Storage::default();
        event.record(&mut storage);

        let mut fields: Vec<Field> = storage
            .values()
            .iter()
            .map(|(key, value)| Field::new(*key, value.clone()))
            .collect();

        if let Some(span) = ctx.event_span(event) {
            let extensions = span.extensions();
            if let Some(span_storage) = extensions.get::<Storage<'_>>() {
                fields.extend(
                    span_storage
                        .values()
                        .iter()
                        .filter(|(key, _)| !storage.contains(key))
                        .map(|(key, value)| Field::new(*key, value.clone())),
                );
            }
        }

        // Obtain the value of the `message` field if set, or the `target` from metadata otherwise.
        let message = storage.message().unwrap_or_else(|| metadata.target());

        let caller = metadata
            .file()
            .zip(metadata.line())
            .map(|(file, line)| Caller::new(file, line));

        self.core.emit(level, message, fields, caller);
    }
}
