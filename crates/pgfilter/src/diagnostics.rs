//! Diagnostic sinks for internal errors and warnings.
//!
//! Builders never log through global state: a sink is injected with
//! [`QueryBuilder::with_sink`](crate::QueryBuilder::with_sink) and defaults to
//! [`NoopSink`]. Sinks are shared across builders (one per request is common),
//! so implementations must be `Send + Sync`.
//!
//! # Example
//!
//! ```
//! use pgfilter::diagnostics::{CollectingSink, Level};
//! use pgfilter::QueryBuilder;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let sink = Arc::new(CollectingSink::new());
//! let mut qb = QueryBuilder::new().with_sink(sink.clone());
//! qb.add_where("age", "greater_than", json!(18));
//! qb.get_query("users", "").unwrap();
//!
//! assert_eq!(sink.entries()[0].level, Level::Warn);
//! ```

use std::collections::BTreeMap;
use std::sync::Mutex;

/// Severity of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

/// A message plus low-cardinality structured fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: Level,
    pub message: String,
    pub fields: BTreeMap<String, String>,
}

impl Diagnostic {
    /// Create a diagnostic without fields.
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn warn(message: impl Into<String>) -> Self {
        Self::new(Level::Warn, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Level::Error, message)
    }

    /// Add a structured field.
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }
}

/// Receiver for builder diagnostics.
///
/// `report` must not block query construction; a sink that fails to deliver
/// should drop the event.
pub trait DiagnosticSink: Send + Sync {
    fn report(&self, diagnostic: &Diagnostic);
}

/// Discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl DiagnosticSink for NoopSink {
    fn report(&self, _diagnostic: &Diagnostic) {}
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    entries: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the collected diagnostics, oldest first.
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clear();
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(diagnostic.clone());
    }
}

/// Forwards diagnostics as `tracing` events under the `pgfilter` target.
///
/// Enable via the crate feature: `pgfilter = { features = ["tracing"] }`.
#[cfg(feature = "tracing")]
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

#[cfg(feature = "tracing")]
impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "tracing")]
impl DiagnosticSink for TracingSink {
    fn report(&self, diagnostic: &Diagnostic) {
        let fields = tracing::field::debug(&diagnostic.fields);
        let message = diagnostic.message.as_str();
        match diagnostic.level {
            Level::Debug => tracing::debug!(target: "pgfilter", fields = fields, "{message}"),
            Level::Info => tracing::info!(target: "pgfilter", fields = fields, "{message}"),
            Level::Warn => tracing::warn!(target: "pgfilter", fields = fields, "{message}"),
            Level::Error => tracing::error!(target: "pgfilter", fields = fields, "{message}"),
        }
    }
}
