//! Records the engine's tracing events so tests can assert on cache decisions.
//!
//! The recorder is installed as the current thread's default subscriber, so
//! pair it with `#[tokio::test]` (current-thread runtime): background refreshes
//! and deduplicated fetches are spawned onto the same thread and still get
//! recorded.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::Level;
use tracing::field::{Field, Visit};
use tracing_subscriber::layer::{Context, SubscriberExt};

/// One recorded event: level, message and its structured fields.
#[derive(Debug, Clone)]
pub struct Event {
    pub level: Level,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

impl Event {
    fn mentions(&self, needle: &str) -> bool {
        self.message.contains(needle)
    }
}

/// Event recorder; capture stops when it is dropped.
pub struct TestLogCapture {
    events: Arc<Mutex<Vec<Event>>>,
    _guard: tracing::subscriber::DefaultGuard,
}

impl TestLogCapture {
    pub fn start() -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(Recorder {
            events: Arc::clone(&events),
        });
        Self {
            events,
            _guard: tracing::subscriber::set_default(subscriber),
        }
    }

    fn matching(&self, level: Option<Level>, needle: &str) -> Vec<Event> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| level.is_none_or(|l| e.level == l) && e.mentions(needle))
            .cloned()
            .collect()
    }

    fn messages(&self) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| format!("{} {}", e.level, e.message))
            .collect()
    }

    pub fn assert_logged(&self, needle: &str) {
        assert!(
            !self.matching(None, needle).is_empty(),
            "nothing logged containing '{needle}'; got {:#?}",
            self.messages()
        );
    }

    pub fn assert_logged_at_level(&self, level: Level, needle: &str) {
        assert!(
            !self.matching(Some(level), needle).is_empty(),
            "no {level} event containing '{needle}'; got {:#?}",
            self.messages()
        );
    }

    pub fn assert_not_logged(&self, needle: &str) {
        let hits = self.matching(None, needle);
        assert!(hits.is_empty(), "unexpected events containing '{needle}': {hits:#?}");
    }

    pub fn assert_no_errors(&self) {
        let errors: Vec<_> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.level == Level::ERROR)
            .cloned()
            .collect();
        assert!(errors.is_empty(), "unexpected errors: {errors:#?}");
    }

    /// The event whose message contains `needle` carries every listed field.
    ///
    /// A field matches when its recorded value contains the expected text.
    pub fn assert_event_fields(&self, needle: &str, expected: &[(&str, &str)]) {
        let events = self.matching(None, needle);
        let found = events.iter().any(|event| {
            expected.iter().all(|(name, value)| {
                event
                    .fields
                    .get(*name)
                    .is_some_and(|recorded| recorded.contains(value))
            })
        });
        assert!(
            found,
            "no '{needle}' event with fields {expected:?}; candidates: {events:#?}"
        );
    }

    /// Number of events at `level` whose message contains `needle`.
    pub fn count(&self, level: Level, needle: &str) -> usize {
        self.matching(Some(level), needle).len()
    }
}

struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for Recorder {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = Fields::default();
        event.record(&mut fields);
        self.events.lock().unwrap().push(Event {
            level: *event.metadata().level(),
            message: fields.message,
            fields: fields.values,
        });
    }
}

#[derive(Default)]
struct Fields {
    message: String,
    values: BTreeMap<String, String>,
}

impl Fields {
    fn put(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.values.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for Fields {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, value.to_string());
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }
}
