//! Named logger with a severity threshold and attached sinks

use super::{
    error::Result,
    level::LogLevel,
    message::MessageBuilder,
    record::LogRecord,
    sink::Sink,
};
use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Turns accepted log calls into records and fans them out to its sinks.
///
/// Sinks are shared: the same `Arc<Sink>` may be attached to several
/// loggers and is stopped when its last owner lets go of it.
///
/// # Example
///
/// ```
/// use sinklog::{Logger, LogLevel, Sink};
///
/// let logger = Logger::new("db", LogLevel::Info);
/// logger.add_sink(Sink::console().unwrap());
///
/// logger.debug("filtered out");
/// logger.info("connection pool ready");
/// ```
pub struct Logger {
    name: Arc<str>,
    level: AtomicU8,
    sinks: RwLock<Vec<Arc<Sink>>>,
}

impl Logger {
    #[must_use]
    pub fn new(name: &str, level: LogLevel) -> Self {
        Self {
            name: Arc::from(name),
            level: AtomicU8::new(level.rank()),
            sinks: RwLock::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::from_rank(self.level.load(Ordering::Acquire)).unwrap_or(LogLevel::Off)
    }

    /// Whether a record at `level` passes the threshold.
    ///
    /// `Off` rejects everything, `All` accepts everything, otherwise the
    /// level must rank at or above the threshold.
    #[inline]
    pub fn allow(&self, level: LogLevel) -> bool {
        match self.level() {
            LogLevel::Off => false,
            LogLevel::All => true,
            threshold => level >= threshold,
        }
    }

    /// Change the threshold.
    ///
    /// `Off` also stops every attached sink, draining what they hold. Any
    /// other level restarts them.
    ///
    /// # Errors
    ///
    /// Returns the first error from restarting a sink; the remaining sinks
    /// are still restarted.
    pub fn set_level(&self, level: LogLevel) -> Result<()> {
        self.level.store(level.rank(), Ordering::Release);

        let sinks = self.sinks.read().clone();
        if level == LogLevel::Off {
            for sink in &sinks {
                sink.stop();
            }
            return Ok(());
        }

        let mut first_err = None;
        for sink in &sinks {
            if let Err(e) = sink.restart() {
                eprintln!(
                    "[sinklog ERROR] Logger '{}' could not restart sink '{}': {}",
                    self.name,
                    sink.name(),
                    e
                );
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    pub fn add_sink(&self, sink: Arc<Sink>) {
        self.sinks.write().push(sink);
    }

    pub fn sinks(&self) -> Vec<Arc<Sink>> {
        self.sinks.read().clone()
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.read().len()
    }

    /// Build a record and submit it to every sink in attachment order.
    ///
    /// Nothing is allocated when the threshold rejects `level`. `All` and
    /// `Off` are thresholds, not record levels, and are ignored here.
    pub fn log(&self, level: LogLevel, text: impl Into<String>) {
        if !level.is_record_level() || !self.allow(level) {
            return;
        }

        let sinks = self.sinks.read();
        let Some((last, rest)) = sinks.split_last() else {
            return;
        };

        let record = LogRecord::new(Arc::clone(&self.name), level, text);
        for sink in rest {
            sink.submit(record.clone());
        }
        last.submit(record);
    }

    /// Block until every record logged so far reached each sink's writer.
    ///
    /// Sinks keep running, so concurrent callers are not affected.
    pub fn flush(&self) -> Result<()> {
        for sink in self.sinks() {
            sink.flush()?;
        }
        Ok(())
    }

    #[inline]
    pub fn debug(&self, text: impl Into<String>) {
        self.log(LogLevel::Debug, text);
    }

    #[inline]
    pub fn info(&self, text: impl Into<String>) {
        self.log(LogLevel::Info, text);
    }

    #[inline]
    pub fn warn(&self, text: impl Into<String>) {
        self.log(LogLevel::Warn, text);
    }

    #[inline]
    pub fn error(&self, text: impl Into<String>) {
        self.log(LogLevel::Error, text);
    }

    #[inline]
    pub fn fatal(&self, text: impl Into<String>) {
        self.log(LogLevel::Fatal, text);
    }

    /// Start a message assembled from several values, sent on `flush`.
    pub fn builder(&self, level: LogLevel) -> MessageBuilder<'_> {
        MessageBuilder::new(self, level)
    }

    pub fn debug_builder(&self) -> MessageBuilder<'_> {
        self.builder(LogLevel::Debug)
    }

    pub fn info_builder(&self) -> MessageBuilder<'_> {
        self.builder(LogLevel::Info)
    }

    pub fn warn_builder(&self) -> MessageBuilder<'_> {
        self.builder(LogLevel::Warn)
    }

    pub fn error_builder(&self) -> MessageBuilder<'_> {
        self.builder(LogLevel::Error)
    }

    pub fn fatal_builder(&self) -> MessageBuilder<'_> {
        self.builder(LogLevel::Fatal)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("level", &self.level())
            .field("sinks", &self.sink_count())
            .finish()
    }
}
