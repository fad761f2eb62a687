//! High-traffic alerting with hysteresis.

use chrono::{DateTime, FixedOffset};
use serde::Serialize;

use super::window::serialize_timestamp;

/// Current alerting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlertState {
    #[default]
    Normal,
    HighTraffic,
}

/// A state transition. Readings that leave the state unchanged produce none.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AlertEvent {
    /// Average traffic rose above the threshold.
    Alert {
        average: f64,
        #[serde(serialize_with = "serialize_timestamp")]
        at: DateTime<FixedOffset>,
    },
    /// Average traffic fell back to or below the threshold.
    Recovery {
        average: f64,
        #[serde(serialize_with = "serialize_timestamp")]
        at: DateTime<FixedOffset>,
    },
}

/// Two-state machine: enter on `average > threshold`, leave on
/// `average <= threshold`.
#[derive(Debug, Clone)]
pub struct AlertMonitor {
    threshold: f64,
    state: AlertState,
}

impl AlertMonitor {
    pub fn new(threshold: u64) -> Self {
        Self {
            threshold: threshold as f64,
            state: AlertState::Normal,
        }
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    /// Feeds the average computed at a window boundary `at`.
    pub fn evaluate(&mut self, average: f64, at: DateTime<FixedOffset>) -> Option<AlertEvent> {
        match self.state {
            AlertState::Normal if average > self.threshold => {
                self.state = AlertState::HighTraffic;
                Some(AlertEvent::Alert { average, at })
            }
            AlertState::HighTraffic if average <= self.threshold => {
                self.state = AlertState::Normal;
                Some(AlertEvent::Recovery { average, at })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clf::parse_timestamp;

    #[test]
    fn test_alert_then_recover_once() {
        let at = parse_timestamp("10/Oct/2000:13:55:36 -0700").unwrap();
        let mut monitor = AlertMonitor::new(10);

        assert_eq!(monitor.evaluate(5.0, at), None);
        assert_eq!(
            monitor.evaluate(11.0, at),
            Some(AlertEvent::Alert { average: 11.0, at })
        );
        assert_eq!(monitor.state(), AlertState::HighTraffic);
        assert_eq!(monitor.evaluate(50.0, at), None);
        assert_eq!(monitor.evaluate(10.5, at), None);
        assert_eq!(
            monitor.evaluate(10.0, at),
            Some(AlertEvent::Recovery { average: 10.0, at })
        );
        assert_eq!(monitor.evaluate(3.0, at), None);
        assert_eq!(monitor.state(), AlertState::Normal);
    }

    #[test]
    fn test_threshold_is_not_alerting() {
        let at = parse_timestamp("10/Oct/2000:13:55:36 -0700").unwrap();
        let mut monitor = AlertMonitor::new(10);
        assert_eq!(monitor.evaluate(10.0, at), None);
        assert_eq!(monitor.state(), AlertState::Normal);
    }
}
