//! Console sink

use crate::core::{ConsoleFormatter, Result, Sink, SinkWriter};
use std::io::{self, Write};
use std::sync::Arc;

/// Writes each line to standard output and flushes immediately.
#[derive(Debug, Default)]
pub struct ConsoleWriter;

impl ConsoleWriter {
    pub fn new() -> Self {
        Self
    }
}

impl SinkWriter for ConsoleWriter {
    fn write_line(&mut self, line: &str) -> Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(line.as_bytes())?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        io::stdout().flush()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "console"
    }
}

impl Sink {
    /// A running sink writing [`ConsoleFormatter`] lines to standard output.
    ///
    /// # Example
    ///
    /// ```
    /// use sinklog::{Logger, LogLevel, Sink};
    ///
    /// let console = Sink::console().unwrap();
    /// let logger = Logger::new("app", LogLevel::All);
    /// logger.add_sink(console);
    /// logger.info("ready");
    /// ```
    pub fn console() -> Result<Arc<Sink>> {
        Sink::spawn(ConsoleWriter::new(), ConsoleFormatter::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LogLevel, LogRecord};

    #[test]
    fn test_console_sink_writes() {
        let sink = Sink::console().unwrap();
        assert_eq!(sink.name(), "console");

        sink.submit(LogRecord::new(Arc::from("console_test"), LogLevel::Info, "hello"));
        sink.stop();

        assert_eq!(sink.metrics().written(), 1);
        assert_eq!(sink.metrics().failed(), 0);
    }
}
