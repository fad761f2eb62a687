//! Per-window accumulation.

use chrono::{DateTime, Duration, FixedOffset};
use serde::{Serialize, Serializer};

use super::section::section;
use super::top_k::{Entry, TopK};
use crate::clf::{format_timestamp, Record};

/// A closed time range `[start, end)` and the hits counted in it.
///
/// This is all that is retained in history once a window is flushed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    pub hits: u64,
}

impl Window {
    /// An empty window of the given length.
    pub fn empty(start: DateTime<FixedOffset>, duration: Duration) -> Self {
        Self {
            start,
            end: start + duration,
            hits: 0,
        }
    }
}

/// Hit counts for each breakdown dimension of one window.
///
/// A fresh `Breakdown` is built for every window so no label carries over.
#[derive(Debug, Clone, Default)]
pub struct Breakdown {
    pub sections: TopK,
    pub methods: TopK,
    pub protocols: TopK,
    pub statuses: TopK,
}

impl Breakdown {
    fn observe(&mut self, record: &Record) {
        let (method, resource, protocol) = record.request_fields();
        if !resource.is_empty() {
            self.sections.add(section(resource));
        }
        if !method.is_empty() {
            self.methods.add(method);
        }
        if !protocol.is_empty() {
            self.protocols.add(protocol);
        }
        if let Some(status) = record.status {
            self.statuses.add(&status.to_string());
        }
    }
}

/// Counters for the single open window.
#[derive(Debug, Clone)]
pub struct WindowAccumulator {
    window: Window,
    last_seen: Option<DateTime<FixedOffset>>,
    breakdown: Breakdown,
}

impl WindowAccumulator {
    pub fn open(start: DateTime<FixedOffset>, duration: Duration) -> Self {
        Self {
            window: Window::empty(start, duration),
            last_seen: None,
            breakdown: Breakdown::default(),
        }
    }

    pub fn start(&self) -> DateTime<FixedOffset> {
        self.window.start
    }

    pub fn end(&self) -> DateTime<FixedOffset> {
        self.window.end
    }

    pub fn hits(&self) -> u64 {
        self.window.hits
    }

    pub fn breakdown(&self) -> &Breakdown {
        &self.breakdown
    }

    /// Counts a record. Boundary checks are the caller's concern.
    pub fn observe(&mut self, record: &Record) {
        self.window.hits += 1;
        if let Some(ts) = record.timestamp {
            if self.last_seen.map_or(true, |seen| ts > seen) {
                self.last_seen = Some(ts);
            }
        }
        self.breakdown.observe(record);
    }

    /// Closes the window at its full length.
    pub fn close(self) -> (Window, Breakdown) {
        (self.window, self.breakdown)
    }

    /// Closes the window early, ending at the latest timestamp observed in
    /// it, or at its start if it saw none.
    pub fn close_at_last_seen(self) -> (Window, Breakdown) {
        let mut window = self.window;
        window.end = self.last_seen.unwrap_or(window.start);
        (window, self.breakdown)
    }
}

/// Report for a flushed window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSummary {
    #[serde(serialize_with = "serialize_timestamp")]
    pub start: DateTime<FixedOffset>,
    #[serde(serialize_with = "serialize_timestamp")]
    pub end: DateTime<FixedOffset>,
    pub hits: u64,
    pub sections: Vec<Entry>,
    pub methods: Vec<Entry>,
    pub protocols: Vec<Entry>,
    pub statuses: Vec<Entry>,
}

impl WindowSummary {
    pub fn new(window: &Window, breakdown: &Breakdown, top_entries: usize) -> Self {
        Self {
            start: window.start,
            end: window.end,
            hits: window.hits,
            sections: breakdown.sections.top(top_entries),
            methods: breakdown.methods.top(top_entries),
            protocols: breakdown.protocols.top(top_entries),
            statuses: breakdown.statuses.top(top_entries),
        }
    }
}

pub(crate) fn serialize_timestamp<S: Serializer>(
    ts: &DateTime<FixedOffset>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format_timestamp(ts))
}
