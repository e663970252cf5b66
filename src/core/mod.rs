//! Core engine types: records, formatting, sinks, loggers and the registry

pub mod error;
pub mod formatter;
pub mod level;
pub mod logger;
pub mod message;
pub mod metrics;
pub mod record;
pub mod registry;
pub mod settings;
pub mod sink;

pub use error::{LoggerError, Result};
pub use formatter::{ConsoleFormatter, FileFormatter, Formatter, TIMESTAMP_FORMAT};
pub use level::LogLevel;
pub use logger::Logger;
pub use message::MessageBuilder;
pub use metrics::SinkMetrics;
pub use record::LogRecord;
pub use registry::LoggerRegistry;
pub use settings::{Settings, SettingsBuilder, DEFAULT_MAX_FILE_SIZE_MB, MAX_FILE_SIZE_LIMIT_MB};
pub use sink::{Sink, SinkWriter};
