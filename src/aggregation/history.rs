//! Fixed-capacity history of flushed windows.

use chrono::{DateTime, FixedOffset};

use super::window::Window;

/// Circular buffer of the most recent windows.
///
/// The cursor always points at the slot written next; once full, each `put`
/// evicts the oldest window.
#[derive(Debug, Clone)]
pub struct HistoryRing {
    slots: Vec<Option<Window>>,
    cursor: usize,
}

impl HistoryRing {
    /// Creates a ring with `capacity` slots (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
            cursor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Index of the slot that the next `put` overwrites.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn put(&mut self, window: Window) {
        self.slots[self.cursor] = Some(window);
        self.cursor = (self.cursor + 1) % self.slots.len();
    }

    /// Retained windows in slot order.
    pub fn windows(&self) -> impl Iterator<Item = &Window> {
        self.slots.iter().flatten()
    }

    /// Mean hits per window over retained windows ending strictly after
    /// `cutoff`; `0.0` when none qualify.
    pub fn average_traffic(&self, cutoff: DateTime<FixedOffset>) -> f64 {
        let (sum, count) = self
            .windows()
            .filter(|window| window.end > cutoff)
            .fold((0u64, 0u64), |(sum, count), window| (sum + window.hits, count + 1));
        if count == 0 {
            return 0.0;
        }
        sum as f64 / count as f64
    }
}
