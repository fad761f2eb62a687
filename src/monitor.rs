//! The stream monitor: window lifecycle, history and alerting.
//!
//! A [`StreamMonitor`] is driven by three inputs: records ([`StreamMonitor::handle`]),
//! window timer expiry ([`StreamMonitor::tick`]) and end of input
//! ([`StreamMonitor::finish`]). It is owned by a single task and holds no locks.

use chrono::{DateTime, Duration, FixedOffset};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::aggregation::{
    AlertEvent, AlertMonitor, AlertState, Breakdown, HistoryRing, Window, WindowAccumulator,
    WindowSummary,
};
use crate::clf::{format_timestamp, Record};
use crate::config::MonitorConfig;
use crate::error::Result;
use crate::sink::SummarySink;

pub struct StreamMonitor<S> {
    config: MonitorConfig,
    window: Duration,
    span: Duration,
    current: Option<WindowAccumulator>,
    history: HistoryRing,
    alerts: AlertMonitor,
    deadline: Option<Instant>,
    flushed: u64,
    sink: S,
}

impl<S: SummarySink> StreamMonitor<S> {
    pub fn new(config: MonitorConfig, sink: S) -> Result<Self> {
        config.validate()?;
        let window = config.window_duration()?;
        let span = config.span_duration()?;
        Ok(Self {
            history: HistoryRing::new(config.history_capacity()),
            alerts: AlertMonitor::new(config.threshold),
            config,
            window,
            span,
            current: None,
            deadline: None,
            flushed: 0,
            sink,
        })
    }

    /// Counts a record into the current window, rolling windows forward
    /// first if its timestamp is at or past the current window's end.
    ///
    /// Records without a timestamp are counted only while a window is open.
    /// Records older than the current window's start are dropped.
    pub fn handle(&mut self, record: &Record) -> Result<()> {
        let Some(ts) = record.timestamp else {
            match self.current.as_mut() {
                Some(current) => current.observe(record),
                None => trace!("dropping record without timestamp, no window open"),
            }
            return Ok(());
        };

        match self.current.as_ref().map(|current| (current.start(), current.end())) {
            None => self.open_window(ts),
            Some((start, _)) if ts < start => {
                trace!(
                    timestamp = %format_timestamp(&ts),
                    window_start = %format_timestamp(&start),
                    "dropping out-of-order record"
                );
                return Ok(());
            }
            Some((start, end)) if ts >= end => self.advance_to(start, ts)?,
            Some(_) => {}
        }

        if let Some(current) = self.current.as_mut() {
            current.observe(record);
        }
        Ok(())
    }

    /// Window timer expiry: flushes the current window at its end and opens
    /// the next one starting there.
    pub fn tick(&mut self) -> Result<()> {
        let Some(current) = self.current.take() else {
            self.deadline = None;
            return Ok(());
        };
        let (window, breakdown) = current.close();
        let next = window.end;
        self.flush(window, &breakdown)?;
        self.open_window(next);
        Ok(())
    }

    /// End of input: flushes the current window, truncated to the last
    /// timestamp it saw.
    pub fn finish(&mut self) -> Result<()> {
        self.deadline = None;
        if let Some(current) = self.current.take() {
            let (window, breakdown) = current.close_at_last_seen();
            self.flush(window, &breakdown)?;
        }
        self.sink.flush()
    }

    /// Wall-clock instant at which [`StreamMonitor::tick`] is due, if a window is open.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn current(&self) -> Option<&WindowAccumulator> {
        self.current.as_ref()
    }

    pub fn history(&self) -> &HistoryRing {
        &self.history
    }

    pub fn alert_state(&self) -> AlertState {
        self.alerts.state()
    }

    /// Number of windows flushed so far, including synthesized empty ones.
    pub fn flushed(&self) -> u64 {
        self.flushed
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn open_window(&mut self, start: DateTime<FixedOffset>) {
        trace!(start = %format_timestamp(&start), "opening window");
        self.current = Some(WindowAccumulator::open(start, self.window));
        self.deadline = Some(Instant::now() + self.config.window);
    }

    /// Flushes the current window and one empty window per silent interval,
    /// then opens the window containing `ts`.
    fn advance_to(
        &mut self,
        start: DateTime<FixedOffset>,
        ts: DateTime<FixedOffset>,
    ) -> Result<()> {
        let window_ms = self.window.num_milliseconds();
        let steps = (ts - start).num_milliseconds() / window_ms;

        if let Some(current) = self.current.take() {
            let (window, breakdown) = current.close();
            self.flush(window, &breakdown)?;
        }

        if steps > self.history.capacity() as i64 {
            warn!(
                count = steps - 1,
                from = %format_timestamp(&start),
                to = %format_timestamp(&ts),
                "timestamp jumped past the moving average span, filling silent windows"
            );
        } else if steps > 1 {
            debug!(count = steps - 1, "filling silent windows");
        }
        for step in 1..steps {
            let start = start + Duration::milliseconds(window_ms * step);
            self.flush(Window::empty(start, self.window), &Breakdown::default())?;
        }

        self.open_window(start + Duration::milliseconds(window_ms * steps));
        Ok(())
    }

    fn flush(&mut self, window: Window, breakdown: &Breakdown) -> Result<()> {
        let summary = WindowSummary::new(&window, breakdown, self.config.top_entries);
        self.sink.window(&summary)?;
        self.flushed += 1;

        self.history.put(window);
        let average = self.history.average_traffic(window.end - self.span);
        debug!(
            start = %format_timestamp(&window.start),
            end = %format_timestamp(&window.end),
            hits = window.hits,
            average,
            "window flushed"
        );

        if let Some(event) = self.alerts.evaluate(average, window.end) {
            match &event {
                AlertEvent::Alert { average, at } => {
                    warn!(average, at = %format_timestamp(at), "high traffic alert")
                }
                AlertEvent::Recovery { average, at } => {
                    info!(average, at = %format_timestamp(at), "high traffic recovered")
                }
            }
            self.sink.alert(&event)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clf::parse_timestamp;
    use crate::sink::TextSink;
    use std::time::Duration as StdDuration;

    #[derive(Default)]
    struct Recorder {
        windows: Vec<WindowSummary>,
        events: Vec<AlertEvent>,
    }

    impl SummarySink for Recorder {
        fn window(&mut self, summary: &WindowSummary) -> Result<()> {
            self.windows.push(summary.clone());
            Ok(())
        }

        fn alert(&mut self, event: &AlertEvent) -> Result<()> {
            self.events.push(event.clone());
            Ok(())
        }
    }

    fn t0() -> DateTime<FixedOffset> {
        parse_timestamp("10/Oct/2000:13:55:36 -0700").unwrap()
    }

    fn at(offset_ms: i64) -> Record {
        Record {
            timestamp: Some(t0() + Duration::milliseconds(offset_ms)),
            request: Some("GET /pages/create HTTP/1.0".to_string()),
            status: Some(200),
            ..Record::default()
        }
    }

    fn monitor(window_secs: u64, span_secs: u64, threshold: u64) -> StreamMonitor<Recorder> {
        let config = MonitorConfig::new(
            StdDuration::from_secs(window_secs),
            StdDuration::from_secs(span_secs),
            threshold,
        );
        StreamMonitor::new(config, Recorder::default()).unwrap()
    }

    #[test]
    fn test_hits_sum_to_timestamped_records() {
        let mut monitor = monitor(10, 120, 1000);
        let offsets = [0, 1_000, 9_999, 10_000, 15_000, 42_000, 42_500, 95_000];
        for offset in offsets {
            monitor.handle(&at(offset)).unwrap();
        }
        monitor.finish().unwrap();

        let total: u64 = monitor.sink().windows.iter().map(|w| w.hits).sum();
        assert_eq!(total, offsets.len() as u64);
        assert_eq!(monitor.sink().windows.len(), 10);
    }

    #[test]
    fn test_gap_fills_empty_windows() {
        let mut monitor = monitor(10, 120, 1000);
        monitor.handle(&at(0)).unwrap();
        monitor.handle(&at(30_001)).unwrap();

        let windows = &monitor.sink().windows;
        assert_eq!(windows.len(), 3);
        assert_eq!(
            windows.iter().map(|w| w.hits).collect::<Vec<_>>(),
            vec![1, 0, 0]
        );
        assert_eq!(windows[1].start, t0() + Duration::seconds(10));
        assert_eq!(windows[2].end, t0() + Duration::seconds(30));

        let current = monitor.current().unwrap();
        assert_eq!(current.start(), t0() + Duration::seconds(30));
        assert_eq!(current.hits(), 1);
    }

    #[test]
    fn test_long_gap_flushes_every_window_and_recovers() {
        let mut monitor = monitor(10, 20, 2);
        for _ in 0..5 {
            monitor.handle(&at(0)).unwrap();
        }
        monitor.handle(&at(100_000)).unwrap();

        let windows = &monitor.sink().windows;
        assert!(monitor.history().capacity() < 10);
        assert_eq!(windows.len(), 10);
        assert_eq!(windows[0].hits, 5);
        assert!(windows[1..].iter().all(|w| w.hits == 0));
        assert_eq!(windows[9].end, t0() + Duration::seconds(100));
        assert_eq!(monitor.current().unwrap().start(), t0() + Duration::seconds(100));

        let events = &monitor.sink().events;
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], AlertEvent::Alert { .. }));
        assert!(matches!(events[1], AlertEvent::Recovery { .. }));
    }

    #[test]
    fn test_record_at_window_end_rolls_over() {
        let mut monitor = monitor(10, 120, 1000);
        monitor.handle(&at(0)).unwrap();
        monitor.handle(&at(10_000)).unwrap();
        assert_eq!(monitor.flushed(), 1);
        assert_eq!(monitor.current().unwrap().start(), t0() + Duration::seconds(10));
    }

    #[test]
    fn test_drops_out_of_order_and_undated_records() {
        let mut monitor = monitor(10, 120, 1000);

        monitor.handle(&Record::default()).unwrap();
        assert!(monitor.current().is_none());

        monitor.handle(&at(20_000)).unwrap();
        monitor.handle(&at(5_000)).unwrap();
        monitor.handle(&Record::default()).unwrap();
        assert_eq!(monitor.current().unwrap().hits(), 2);

        monitor.finish().unwrap();
        assert_eq!(monitor.sink().windows.len(), 1);
        assert_eq!(monitor.sink().windows[0].hits, 2);
    }

    #[test]
    fn test_tick_opens_next_window_at_end() {
        let mut monitor = monitor(10, 120, 1000);
        monitor.tick().unwrap();
        assert_eq!(monitor.flushed(), 0);
        assert!(monitor.deadline().is_none());

        monitor.handle(&at(3_000)).unwrap();
        assert!(monitor.deadline().is_some());
        monitor.tick().unwrap();
        monitor.tick().unwrap();

        let windows = &monitor.sink().windows;
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].hits, 1);
        assert_eq!(windows[0].end, t0() + Duration::seconds(13));
        assert_eq!(windows[1].start, t0() + Duration::seconds(13));
        assert_eq!(windows[1].hits, 0);
        assert_eq!(monitor.current().unwrap().start(), t0() + Duration::seconds(23));
    }

    #[test]
    fn test_alert_hysteresis() {
        let mut monitor = monitor(10, 10, 2);
        for (window, hits) in [(0, 5), (1, 5), (2, 5), (3, 1), (4, 1)] {
            for _ in 0..hits {
                monitor.handle(&at(window * 10_000)).unwrap();
            }
        }
        monitor.finish().unwrap();

        let events = &monitor.sink().events;
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0],
            AlertEvent::Alert {
                average: 5.0,
                at: t0() + Duration::seconds(10)
            }
        );
        assert_eq!(
            events[1],
            AlertEvent::Recovery {
                average: 1.0,
                at: t0() + Duration::seconds(40)
            }
        );
        assert_eq!(monitor.alert_state(), AlertState::Normal);
    }

    #[test]
    fn test_single_line_text_output() {
        let config =
            MonitorConfig::new(StdDuration::from_secs(10), StdDuration::from_secs(120), 10);
        let mut monitor = StreamMonitor::new(config, TextSink::new(Vec::new())).unwrap();
        let record = Record::parse(
            r#"127.0.0.1 - - [10/Oct/2000:13:55:36 -0700] "GET http://my.site.com/pages/create HTTP/1.0" 200 100"#,
        )
        .unwrap();
        monitor.handle(&record).unwrap();
        monitor.finish().unwrap();

        let out = String::from_utf8(monitor.into_sink().into_inner()).unwrap();
        let mut lines = out.lines();
        assert_eq!(
            lines.next(),
            Some("10/Oct/2000:13:55:36 -0700 - 10/Oct/2000:13:55:36 -0700")
        );
        assert!(out.contains("\tSection Hits: http://my.site.com/pages (1)\n"));
        assert!(!out.contains("High traffic"));
    }
}
