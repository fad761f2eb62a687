//! Label frequency counting with top-N reporting.

use serde::Serialize;
use std::collections::HashMap;

/// A label and the number of times it was seen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entry {
    pub label: String,
    pub count: u64,
}

impl Entry {
    pub fn new<S: Into<String>>(label: S, count: u64) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Tally {
    count: u64,
    first_seen: usize,
}

/// Counts label occurrences.
///
/// Ties in [`TopK::top`] are broken by first-seen order, so results are
/// deterministic regardless of hash iteration order.
#[derive(Debug, Clone, Default)]
pub struct TopK {
    tallies: HashMap<String, Tally>,
}

impl TopK {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increments the count for `label`, starting at 1 if unseen.
    pub fn add(&mut self, label: &str) {
        if let Some(tally) = self.tallies.get_mut(label) {
            tally.count += 1;
            return;
        }
        let first_seen = self.tallies.len();
        self.tallies.insert(
            label.to_string(),
            Tally {
                count: 1,
                first_seen,
            },
        );
    }

    /// Count recorded for `label`, zero if unseen.
    pub fn count(&self, label: &str) -> u64 {
        self.tallies.get(label).map_or(0, |tally| tally.count)
    }

    /// Number of distinct labels.
    pub fn len(&self) -> usize {
        self.tallies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
    }

    /// The `n` most frequent labels, highest count first. Returns every label
    /// when `n` exceeds the number of distinct labels.
    pub fn top(&self, n: usize) -> Vec<Entry> {
        let mut ranked: Vec<(&String, &Tally)> = self.tallies.iter().collect();
        ranked.sort_by(|(_, a), (_, b)| {
            b.count
                .cmp(&a.count)
                .then_with(|| a.first_seen.cmp(&b.first_seen))
        });
        ranked
            .into_iter()
            .take(n)
            .map(|(label, tally)| Entry::new(label.as_str(), tally.count))
            .collect()
    }
}
