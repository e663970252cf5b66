//! Name-to-logger registry

use super::error::Result;
use super::level::LogLevel;
use super::logger::Logger;
use super::settings::Settings;
use super::sink::Sink;
use parking_lot::{Mutex, RwLock};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Owns the loggers of one application, keyed by name.
///
/// The registry is an explicit object: construct one at startup and pass it
/// (or an `Arc` of it) to whatever needs a logger. It also holds the
/// [`Settings`] used when creating loggers and file sinks.
///
/// # Example
///
/// ```
/// use sinklog::{LoggerRegistry, LogLevel, Settings};
/// use std::sync::Arc;
///
/// let settings = Settings::builder().lowest_level(LogLevel::Info).build().unwrap();
/// let registry = LoggerRegistry::new(settings);
///
/// let a = registry.get_or_create("http");
/// let b = registry.get_or_create("http");
/// assert!(Arc::ptr_eq(&a, &b));
/// assert_eq!(a.level(), LogLevel::Info);
/// ```
#[derive(Debug, Default)]
pub struct LoggerRegistry {
    settings: RwLock<Settings>,
    loggers: RwLock<BTreeMap<String, Arc<Logger>>>,
    console: Mutex<Option<Arc<Sink>>>,
}

impl LoggerRegistry {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
            loggers: RwLock::new(BTreeMap::new()),
            console: Mutex::new(None),
        }
    }

    pub fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    /// Replace the settings used for loggers and sinks created from now on.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::InvalidConfiguration`](super::LoggerError) if
    /// `settings` fails validation; the current settings are kept.
    pub fn set_settings(&self, settings: Settings) -> Result<()> {
        settings.validate()?;
        *self.settings.write() = settings;
        Ok(())
    }

    /// The logger registered under `name`, created with the default
    /// threshold if absent. Racing callers always receive the same instance.
    pub fn get_or_create(&self, name: &str) -> Arc<Logger> {
        if let Some(logger) = self.loggers.read().get(name) {
            return Arc::clone(logger);
        }

        let level = self.settings.read().lowest_level();
        let mut loggers = self.loggers.write();
        let logger = loggers
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Logger::new(name, level)));
        Arc::clone(logger)
    }

    /// Register `logger` under its name unless that name is taken.
    ///
    /// Returns the instance registered after the call: `logger` itself, or
    /// the earlier registration that won.
    pub fn register(&self, logger: Arc<Logger>) -> Arc<Logger> {
        let mut loggers = self.loggers.write();
        let entry = loggers
            .entry(logger.name().to_string())
            .or_insert(logger);
        Arc::clone(entry)
    }

    pub fn query(&self, name: &str) -> Option<Arc<Logger>> {
        self.loggers.read().get(name).cloned()
    }

    /// Registered logger names in sorted order
    pub fn names(&self) -> Vec<String> {
        self.loggers.read().keys().cloned().collect()
    }

    /// Silence the logger named `name`. Returns whether it exists.
    pub fn disable(&self, name: &str) -> Result<bool> {
        match self.query(name) {
            Some(logger) => {
                logger.set_level(LogLevel::Off)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    pub fn len(&self) -> usize {
        self.loggers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.loggers.read().is_empty()
    }

    /// Forget every logger. Sinks stop once nothing else holds them.
    pub fn clear(&self) {
        let drained = std::mem::take(&mut *self.loggers.write());
        drop(drained);
    }

    /// The registry-wide console sink, started on first use.
    pub fn console_sink(&self) -> Result<Arc<Sink>> {
        let mut console = self.console.lock();
        if let Some(sink) = console.as_ref() {
            return Ok(Arc::clone(sink));
        }
        let sink = Sink::console()?;
        *console = Some(Arc::clone(&sink));
        Ok(sink)
    }

    /// A new running file sink at `path` under the configured directory.
    pub fn file_sink(&self, path: impl AsRef<Path>) -> Result<Arc<Sink>> {
        let settings = self.settings.read().clone();
        Sink::file(path, &settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_get_or_create_uses_default_level() {
        let mut settings = Settings::default();
        settings.set_lowest_level(LogLevel::Warn);
        let registry = LoggerRegistry::new(settings);

        let logger = registry.get_or_create("x");
        assert_eq!(logger.level(), LogLevel::Warn);
        assert_eq!(logger.name(), "x");
    }

    #[test]
    fn test_concurrent_get_or_create_returns_one_instance() {
        let registry = Arc::new(LoggerRegistry::default());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.get_or_create("x"))
            })
            .collect();

        let loggers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for logger in &loggers[1..] {
            assert!(Arc::ptr_eq(&loggers[0], logger));
        }
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_first_writer_wins() {
        let registry = LoggerRegistry::default();
        let first = Arc::new(Logger::new("svc", LogLevel::Info));
        let second = Arc::new(Logger::new("svc", LogLevel::Error));

        let kept = registry.register(Arc::clone(&first));
        assert!(Arc::ptr_eq(&kept, &first));

        let kept = registry.register(second);
        assert!(Arc::ptr_eq(&kept, &first));
        assert_eq!(registry.query("svc").unwrap().level(), LogLevel::Info);
    }

    #[test]
    fn test_names_disable_and_clear() {
        let registry = LoggerRegistry::default();
        registry.get_or_create("zeta");
        registry.get_or_create("alpha");

        assert_eq!(registry.names(), vec!["alpha".to_string(), "zeta".to_string()]);

        assert!(registry.disable("alpha").unwrap());
        assert!(!registry.disable("missing").unwrap());
        assert_eq!(registry.query("alpha").unwrap().level(), LogLevel::Off);

        registry.clear();
        assert!(registry.is_empty());
        assert!(registry.query("zeta").is_none());
    }

    #[test]
    fn test_invalid_host_settings_never_reach_registry() {
        let loaded = serde_json::from_str::<Settings>(r#"{"max_file_size_mb": 0, "backup_count": 3}"#);
        assert!(loaded.is_err());

        let registry = LoggerRegistry::default();
        let valid: Settings = serde_json::from_str(r#"{"max_file_size_mb": 5}"#).unwrap();
        registry.set_settings(valid).unwrap();
        assert_eq!(registry.settings().max_file_size_mb(), 5);
    }

    #[test]
    fn test_console_sink_is_shared() {
        let registry = LoggerRegistry::default();
        let a = registry.console_sink().unwrap();
        let b = registry.console_sink().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
