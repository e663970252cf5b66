//! Log record structure

use super::level::LogLevel;
use chrono::{DateTime, Local};
use std::sync::Arc;

/// One immutable unit of log data.
///
/// Built once per accepted `Logger::log` call and cloned into each attached
/// sink's queue. Workers only ever read it.
#[derive(Debug, Clone)]
pub struct LogRecord {
    logger_name: Arc<str>,
    level: LogLevel,
    text: String,
    timestamp: DateTime<Local>,
}

impl LogRecord {
    pub fn new(logger_name: Arc<str>, level: LogLevel, text: impl Into<String>) -> Self {
        Self::with_timestamp(logger_name, level, text, Local::now())
    }

    pub fn with_timestamp(
        logger_name: Arc<str>,
        level: LogLevel,
        text: impl Into<String>,
        timestamp: DateTime<Local>,
    ) -> Self {
        Self {
            logger_name,
            level,
            text: text.into(),
            timestamp,
        }
    }

    #[inline]
    pub fn logger_name(&self) -> &str {
        &self.logger_name
    }

    #[inline]
    pub fn level(&self) -> LogLevel {
        self.level
    }

    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[inline]
    pub fn timestamp(&self) -> &DateTime<Local> {
        &self.timestamp
    }
}
