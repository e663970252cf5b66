//! Stream-style message assembly
//!
//! Collects heterogeneous values into one line and hands it to the logger on
//! [`MessageBuilder::flush`].

use super::level::LogLevel;
use super::logger::Logger;
use std::fmt::{Display, Write};

/// Accumulates displayable values into one message for a logger.
///
/// Values pushed to a builder whose level the logger rejects are not
/// formatted. Dropping a builder without calling `flush` discards it.
///
/// # Example
///
/// ```
/// use sinklog::{Logger, LogLevel};
///
/// let logger = Logger::new("jobs", LogLevel::All);
///
/// logger.info_builder()
///     .push("processed ")
///     .push(128)
///     .push(" items in ")
///     .push(2.5)
///     .push("s")
///     .flush();
/// ```
#[must_use = "a message is only logged when flushed"]
pub struct MessageBuilder<'a> {
    logger: &'a Logger,
    level: LogLevel,
    enabled: bool,
    text: String,
}

impl<'a> MessageBuilder<'a> {
    pub fn new(logger: &'a Logger, level: LogLevel) -> Self {
        Self {
            logger,
            level,
            enabled: level.is_record_level() && logger.allow(level),
            text: String::new(),
        }
    }

    pub fn push<T: Display>(mut self, value: T) -> Self {
        if self.enabled {
            // Writing into a String cannot fail
            let _ = write!(self.text, "{}", value);
        }
        self
    }

    pub fn push_str(mut self, value: &str) -> Self {
        if self.enabled {
            self.text.push_str(value);
        }
        self
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Send the assembled message.
    pub fn flush(self) {
        if self.enabled {
            self.logger.log(self.level, self.text);
        }
    }
}
