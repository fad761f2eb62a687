//! Configuration management for logmon.
//!
//! Configuration is layered from several sources:
//! 1. Default configuration (embedded in binary)
//! 2. System-wide configuration file (`/etc/logmon/config.toml`)
//! 3. User-specified configuration file
//! 4. Environment variables (prefixed with `LOGMON_`, e.g. `LOGMON_MONITOR__THRESHOLD`)
//! 5. Command-line arguments
//!
//! Later sources override earlier ones.

use clap::{ArgAction, Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

use crate::error::{Error, Result};

/// Command-line arguments
#[derive(Debug, Default, Parser)]
#[command(
    author,
    version,
    about = "Summarizes an HTTP access log stream and alerts on high traffic"
)]
pub struct Args {
    /// Input file to read instead of stdin
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// High traffic threshold, in average hits per window
    #[arg(short, long)]
    pub threshold: Option<u64>,

    /// Window length in seconds
    #[arg(long)]
    pub window_secs: Option<u64>,

    /// Moving average span in seconds
    #[arg(long)]
    pub span_secs: Option<u64>,

    /// Entries reported per breakdown dimension
    #[arg(long = "top")]
    pub top_entries: Option<usize>,

    /// Summary output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,

    #[command(flatten)]
    pub logging: LoggingArgs,
}

/// Diagnostic logging options. Diagnostics go to stderr.
#[derive(Debug, Default, Clone, clap::Args)]
pub struct LoggingArgs {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Log filter directives, e.g. `logmon_core=debug` (defaults to RUST_LOG)
    #[arg(long)]
    pub log_filter: Option<String>,
}

impl LoggingArgs {
    pub fn get_effective_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

/// How summaries and alerts are written.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// File/environment configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Monitor settings
    pub monitor: MonitorSettings,
}

/// Monitor settings as written in configuration files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Window length in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Moving average span in seconds
    #[serde(default = "default_span_secs")]
    pub span_secs: u64,
    /// Average hits per window that triggers an alert
    #[serde(default = "default_threshold")]
    pub threshold: u64,
    /// Entries reported per breakdown dimension
    #[serde(default = "default_top_entries")]
    pub top_entries: usize,
    /// Bounded queue size between ingestion and aggregation
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Output format
    #[serde(default)]
    pub format: OutputFormat,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            span_secs: default_span_secs(),
            threshold: default_threshold(),
            top_entries: default_top_entries(),
            queue_capacity: default_queue_capacity(),
            format: OutputFormat::default(),
        }
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load(args: &Args) -> Result<Self> {
        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            .add_source(config::File::with_name("/etc/logmon/config.toml").required(false));

        if let Some(path) = &args.config {
            builder = builder.add_source(config::File::from(path.as_path()));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("LOGMON")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut settings: Settings = builder.build()?.try_deserialize()?;

        // Override with command line args
        if let Some(threshold) = args.threshold {
            settings.monitor.threshold = threshold;
        }
        if let Some(window_secs) = args.window_secs {
            settings.monitor.window_secs = window_secs;
        }
        if let Some(span_secs) = args.span_secs {
            settings.monitor.span_secs = span_secs;
        }
        if let Some(top_entries) = args.top_entries {
            settings.monitor.top_entries = top_entries;
        }
        if let Some(format) = args.format {
            settings.monitor.format = format;
        }

        Ok(settings)
    }

    /// Convert monitor settings to a validated MonitorConfig
    pub fn monitor_config(&self) -> Result<MonitorConfig> {
        let config = MonitorConfig {
            window: Duration::from_secs(self.monitor.window_secs),
            span: Duration::from_secs(self.monitor.span_secs),
            threshold: self.monitor.threshold,
            top_entries: self.monitor.top_entries,
            queue_capacity: self.monitor.queue_capacity,
        };
        config.validate()?;
        Ok(config)
    }
}

/// Runtime configuration of a stream monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Minimum length of every window
    pub window: Duration,
    /// Trailing span of the high-traffic moving average
    pub span: Duration,
    /// Average hits per window above which an alert fires
    pub threshold: u64,
    /// Entries reported per breakdown dimension
    pub top_entries: usize,
    /// Bounded queue size between ingestion and aggregation
    pub queue_capacity: usize,
}

impl MonitorConfig {
    pub fn new(window: Duration, span: Duration, threshold: u64) -> Self {
        Self {
            window,
            span,
            threshold,
            top_entries: default_top_entries(),
            queue_capacity: default_queue_capacity(),
        }
    }

    pub fn with_top_entries(mut self, top_entries: usize) -> Self {
        self.top_entries = top_entries;
        self
    }

    pub fn with_queue_capacity(mut self, queue_capacity: usize) -> Self {
        self.queue_capacity = queue_capacity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.window.as_millis() == 0 {
            return Err(Error::config("window duration must be at least one millisecond"));
        }
        if self.top_entries == 0 {
            return Err(Error::config("top_entries must be positive"));
        }
        if self.queue_capacity == 0 {
            return Err(Error::config("queue_capacity must be positive"));
        }
        self.window_duration()?;
        self.span_duration()?;
        Ok(())
    }

    /// Window length for log-time arithmetic.
    pub fn window_duration(&self) -> Result<chrono::Duration> {
        chrono::Duration::from_std(self.window)
            .map_err(|e| Error::config(format!("window duration out of range: {}", e)))
    }

    /// Moving average span for log-time arithmetic.
    pub fn span_duration(&self) -> Result<chrono::Duration> {
        chrono::Duration::from_std(self.span)
            .map_err(|e| Error::config(format!("span out of range: {}", e)))
    }

    /// Number of windows kept for the moving average: `ceil(span / window) + 1`.
    pub fn history_capacity(&self) -> usize {
        let window = self.window.as_millis().max(1);
        let span = self.span.as_millis();
        (span.div_ceil(window) + 1) as usize
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(default_window_secs()),
            Duration::from_secs(default_span_secs()),
            default_threshold(),
        )
    }
}

fn default_window_secs() -> u64 {
    10
}

fn default_span_secs() -> u64 {
    120
}

fn default_threshold() -> u64 {
    1000
}

fn default_top_entries() -> usize {
    5
}

fn default_queue_capacity() -> usize {
    1024
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_config_defaults() {
        let settings = Settings::load(&Args::default()).unwrap();
        assert_eq!(settings.monitor.window_secs, 10);
        assert_eq!(settings.monitor.span_secs, 120);
        assert_eq!(settings.monitor.top_entries, 5);
        assert_eq!(settings.monitor.format, OutputFormat::Text);

        let config = settings.monitor_config().unwrap();
        assert_eq!(config.window, Duration::from_secs(10));
        assert_eq!(config.history_capacity(), 13);
    }

    #[test]
    fn test_user_file_and_args_override() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[monitor]\nthreshold = 42\nspan_secs = 60\nformat = \"json\"").unwrap();

        let args = Args {
            config: Some(file.path().to_path_buf()),
            window_secs: Some(5),
            ..Args::default()
        };
        let settings = Settings::load(&args).unwrap();
        assert_eq!(settings.monitor.threshold, 42);
        assert_eq!(settings.monitor.span_secs, 60);
        assert_eq!(settings.monitor.window_secs, 5);
        assert_eq!(settings.monitor.format, OutputFormat::Json);

        let args = Args {
            config: Some(file.path().to_path_buf()),
            threshold: Some(7),
            format: Some(OutputFormat::Text),
            ..Args::default()
        };
        let settings = Settings::load(&args).unwrap();
        assert_eq!(settings.monitor.threshold, 7);
        assert_eq!(settings.monitor.format, OutputFormat::Text);
    }

    #[test]
    fn test_history_capacity_rounds_up() {
        let config = MonitorConfig::new(Duration::from_secs(10), Duration::from_secs(125), 1);
        assert_eq!(config.history_capacity(), 14);

        let config = MonitorConfig::new(Duration::from_secs(10), Duration::ZERO, 1);
        assert_eq!(config.history_capacity(), 1);
    }

    #[test]
    fn test_validation() {
        let config = MonitorConfig::new(Duration::ZERO, Duration::from_secs(60), 1);
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = MonitorConfig::default().with_top_entries(0);
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let config = MonitorConfig::default().with_queue_capacity(0);
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        assert!(MonitorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_effective_level() {
        let mut logging = LoggingArgs::default();
        assert_eq!(logging.get_effective_level(), Level::WARN);
        logging.verbose = 2;
        assert_eq!(logging.get_effective_level(), Level::DEBUG);
        logging.verbose = 9;
        assert_eq!(logging.get_effective_level(), Level::TRACE);
    }
}
