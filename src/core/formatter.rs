//! Record formatting
//!
//! A formatted line is a header followed by the raw record text. The console
//! header names the logger, the file header does not:
//!
//! ```text
//! [20250108-10:30:45.123] [net] [INFO]  connected
//! [20250108-10:30:45.123] [INFO]  connected
//! ```

use super::level::LogLevel;
use super::record::LogRecord;
use chrono::{DateTime, Local};
use std::fmt::Write;

/// Timestamp layout: `YYYYMMDD-HH:MM:SS.mmm`, local time, milliseconds truncated.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H:%M:%S%.3f";

/// Bytes reserved for a header up front (timestamp, tag, brackets).
const HEADER_CAPACITY: usize = 48;

/// Turns a record into one output line (without trailing newline).
pub trait Formatter: Send + Sync {
    /// Append the header for `record` to `out`.
    fn format_header(&self, record: &LogRecord, out: &mut String);

    fn name(&self) -> &str;

    fn format(&self, record: &LogRecord) -> String {
        let mut line = String::with_capacity(
            HEADER_CAPACITY + record.logger_name().len() + record.text().len(),
        );
        self.format_header(record, &mut line);
        line.push_str(record.text());
        line
    }
}

pub fn write_timestamp(timestamp: &DateTime<Local>, out: &mut String) {
    // Writing into a String cannot fail
    let _ = write!(out, "{}", timestamp.format(TIMESTAMP_FORMAT));
}

pub fn format_timestamp(timestamp: &DateTime<Local>) -> String {
    let mut out = String::with_capacity(21);
    write_timestamp(timestamp, &mut out);
    out
}

fn write_level(level: LogLevel, _colored: bool, out: &mut String) {
    #[cfg(feature = "console")]
    if _colored {
        use colored::Colorize;
        let _ = write!(out, "{}", level.tag().color(level.color_code()));
        return;
    }
    out.push_str(level.tag());
}

/// `[timestamp] [logger_name] [LEVEL] `
#[derive(Debug, Clone, Default)]
pub struct ConsoleFormatter {
    use_colors: bool,
}

impl ConsoleFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Colour the level tag with ANSI escapes. Off by default.
    #[cfg(feature = "console")]
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }
}

impl Formatter for ConsoleFormatter {
    fn format_header(&self, record: &LogRecord, out: &mut String) {
        out.push('[');
        write_timestamp(record.timestamp(), out);
        out.push_str("] [");
        out.push_str(record.logger_name());
        out.push_str("] ");
        write_level(record.level(), self.use_colors, out);
        out.push(' ');
    }

    fn name(&self) -> &str {
        "console"
    }
}

/// `[timestamp] [LEVEL] `
#[derive(Debug, Clone, Copy, Default)]
pub struct FileFormatter;

impl FileFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl Formatter for FileFormatter {
    fn format_header(&self, record: &LogRecord, out: &mut String) {
        out.push('[');
        write_timestamp(record.timestamp(), out);
        out.push_str("] ");
        write_level(record.level(), false, out);
        out.push(' ');
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use std::sync::Arc;

    fn fixed_record(level: LogLevel, text: &str) -> LogRecord {
        // 2025-01-08 10:30:45.123987 local time
        let naive = NaiveDate::from_ymd_opt(2025, 1, 8)
            .and_then(|d| d.and_hms_micro_opt(10, 30, 45, 123_987))
            .expect("valid datetime");
        let timestamp = Local
            .from_local_datetime(&naive)
            .earliest()
            .expect("representable local time");
        LogRecord::with_timestamp(Arc::from("net"), level, text, timestamp)
    }

    #[test]
    fn test_timestamp_truncates_to_millis() {
        let record = fixed_record(LogLevel::Info, "x");
        assert_eq!(format_timestamp(record.timestamp()), "20250108-10:30:45.123");
    }

    #[test]
    fn test_console_format() {
        let record = fixed_record(LogLevel::Info, "connected");
        assert_eq!(
            ConsoleFormatter::new().format(&record),
            "[20250108-10:30:45.123] [net] [INFO]  connected"
        );
    }

    #[test]
    fn test_file_format_omits_logger_name() {
        let record = fixed_record(LogLevel::Error, "disk full");
        assert_eq!(
            FileFormatter.format(&record),
            "[20250108-10:30:45.123] [ERROR] disk full"
        );
    }

    #[test]
    fn test_sentinel_levels_render_unknown() {
        let record = fixed_record(LogLevel::Off, "odd");
        assert!(FileFormatter.format(&record).contains("[UNKNOWN] odd"));
    }

    #[cfg(feature = "console")]
    #[test]
    fn test_colored_console_keeps_text_suffix() {
        colored::control::set_override(true);
        let record = fixed_record(LogLevel::Warn, "slow");
        let line = ConsoleFormatter::new().with_colors(true).format(&record);
        assert!(line.ends_with("slow"));
        assert!(line.contains("\u{1b}["));
    }
}
