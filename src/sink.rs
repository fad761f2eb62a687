//! Output sinks for window summaries and alert transitions.

use serde::Serialize;
use std::io::Write;

use crate::aggregation::{AlertEvent, Entry, WindowSummary};
use crate::clf::format_timestamp;
use crate::error::{Error, Result};

/// Destination for monitor output.
pub trait SummarySink {
    /// Writes the report for one flushed window.
    fn window(&mut self, summary: &WindowSummary) -> Result<()>;

    /// Writes an alert or recovery line.
    fn alert(&mut self, event: &AlertEvent) -> Result<()>;

    /// Flushes buffered output.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: SummarySink + ?Sized> SummarySink for Box<S> {
    fn window(&mut self, summary: &WindowSummary) -> Result<()> {
        (**self).window(summary)
    }

    fn alert(&mut self, event: &AlertEvent) -> Result<()> {
        (**self).alert(event)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Human-readable summary blocks.
///
/// ```text
/// 10/Oct/2000:13:55:36 -0700 - 10/Oct/2000:13:55:46 -0700
///     Hits: 2
///     Section Hits: /pages (2)
///     ...
/// ```
#[derive(Debug)]
pub struct TextSink<W: Write> {
    writer: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_entries(&mut self, name: &str, entries: &[Entry]) -> Result<()> {
        write!(self.writer, "\t{} Hits: ", name).map_err(Error::Write)?;
        if entries.is_empty() {
            self.writer.write_all(b"-").map_err(Error::Write)?;
        }
        for (idx, entry) in entries.iter().enumerate() {
            if idx > 0 {
                self.writer.write_all(b", ").map_err(Error::Write)?;
            }
            write!(self.writer, "{} ({})", entry.label, entry.count).map_err(Error::Write)?;
        }
        self.writer.write_all(b"\n").map_err(Error::Write)
    }
}

impl<W: Write> SummarySink for TextSink<W> {
    fn window(&mut self, summary: &WindowSummary) -> Result<()> {
        writeln!(
            self.writer,
            "{} - {}",
            format_timestamp(&summary.start),
            format_timestamp(&summary.end)
        )
        .map_err(Error::Write)?;
        writeln!(self.writer, "\tHits: {}", summary.hits).map_err(Error::Write)?;
        self.write_entries("Section", &summary.sections)?;
        self.write_entries("Method", &summary.methods)?;
        self.write_entries("Protocol", &summary.protocols)?;
        self.write_entries("Status", &summary.statuses)
    }

    fn alert(&mut self, event: &AlertEvent) -> Result<()> {
        let written = match event {
            AlertEvent::Alert { average, at } => writeln!(
                self.writer,
                "High traffic generated an alert - hits = {:.2}, triggered at {}",
                average,
                format_timestamp(at)
            ),
            AlertEvent::Recovery { average, at } => writeln!(
                self.writer,
                "High traffic alert recovered - hits = {:.2}, recovered at {}",
                average,
                format_timestamp(at)
            ),
        };
        written.map_err(Error::Write)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(Error::Write)
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum JsonLine<'a> {
    Window(&'a WindowSummary),
}

/// One JSON object per line, tagged with `"type"`.
#[derive(Debug)]
pub struct JsonSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line<T: Serialize>(&mut self, value: &T) -> Result<()> {
        serde_json::to_writer(&mut self.writer, value)?;
        self.writer.write_all(b"\n").map_err(Error::Write)
    }
}

impl<W: Write> SummarySink for JsonSink<W> {
    fn window(&mut self, summary: &WindowSummary) -> Result<()> {
        self.write_line(&JsonLine::Window(summary))
    }

    fn alert(&mut self, event: &AlertEvent) -> Result<()> {
        self.write_line(event)
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(Error::Write)
    }
}
