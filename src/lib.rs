//! # sinklog
//!
//! An in-process logging engine. Named loggers filter records by severity and
//! fan them out to sinks; every sink owns a queue and one background worker
//! that formats and writes records, so callers never wait on I/O.
//!
//! ## Features
//!
//! - **Non-blocking producers**: enqueueing is the only cost on the caller
//! - **Console and rotating file sinks**, shareable between loggers
//! - **Drain on stop**: a controlled shutdown writes every accepted record
//! - **Explicit configuration**: [`Settings`] and [`LoggerRegistry`] are plain values
//!
//! ```
//! use sinklog::prelude::*;
//!
//! let registry = LoggerRegistry::new(Settings::default());
//! let logger = registry.get_or_create("app");
//! logger.add_sink(registry.console_sink().unwrap());
//!
//! logger.info("started");
//! sinklog::warn!(logger, "cache miss rate {}%", 12);
//! ```

pub mod core;
pub mod macros;
pub mod sinks;

#[cfg(test)]
mod test_support;

pub mod prelude {
    pub use crate::core::{
        ConsoleFormatter, FileFormatter, Formatter, LogLevel, LogRecord, Logger, LoggerError,
        LoggerRegistry, MessageBuilder, Result, Settings, Sink, SinkMetrics, SinkWriter,
    };
    pub use crate::sinks::{ConsoleWriter, RotatingFileWriter, RotationPolicy};
}

pub use crate::core::{
    ConsoleFormatter, FileFormatter, Formatter, LogLevel, LogRecord, Logger, LoggerError,
    LoggerRegistry, MessageBuilder, Result, Settings, SettingsBuilder, Sink, SinkMetrics,
    SinkWriter,
};
pub use sinks::{ConsoleWriter, RotatingFileWriter, RotationPolicy};
