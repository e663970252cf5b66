//! Engine-wide defaults
//!
//! Settings are consulted when loggers and sinks are constructed, never on
//! the per-record path. They are an explicit value owned by whoever builds
//! the [`LoggerRegistry`](super::LoggerRegistry); there is no hidden global.

use super::error::{LoggerError, Result};
use super::level::LogLevel;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default maximum size of one log file, in megabytes
pub const DEFAULT_MAX_FILE_SIZE_MB: u32 = 3;

/// Upper bound for the maximum file size (10 GiB), in megabytes
pub const MAX_FILE_SIZE_LIMIT_MB: u32 = 10 * 1024;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Deserializing checks the same ranges as the setters, so an out-of-range
/// host config fails to load instead of reaching a sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSettings")]
pub struct Settings {
    lowest_level: LogLevel,
    backup_count: u32,
    max_file_size_mb: u32,
    directory: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lowest_level: LogLevel::All,
            backup_count: 0,
            max_file_size_mb: DEFAULT_MAX_FILE_SIZE_MB,
            directory: current_directory(),
        }
    }
}

/// Unchecked wire form of [`Settings`]; missing fields take the defaults
#[derive(Deserialize)]
#[serde(default)]
struct RawSettings {
    lowest_level: LogLevel,
    backup_count: u32,
    max_file_size_mb: u32,
    directory: PathBuf,
}

impl Default for RawSettings {
    fn default() -> Self {
        let Settings {
            lowest_level,
            backup_count,
            max_file_size_mb,
            directory,
        } = Settings::default();
        Self {
            lowest_level,
            backup_count,
            max_file_size_mb,
            directory,
        }
    }
}

impl TryFrom<RawSettings> for Settings {
    type Error = LoggerError;

    fn try_from(raw: RawSettings) -> Result<Self> {
        let settings = Settings {
            lowest_level: raw.lowest_level,
            backup_count: raw.backup_count,
            max_file_size_mb: raw.max_file_size_mb,
            directory: raw.directory,
        };
        settings.validate()?;
        Ok(settings)
    }
}

fn current_directory() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("./"))
}

fn check_file_size(size_mb: u32) -> Result<()> {
    if size_mb == 0 || size_mb > MAX_FILE_SIZE_LIMIT_MB {
        return Err(LoggerError::config(
            "Settings",
            format!(
                "max file size {}MB outside valid range (0MB, {}MB]",
                size_mb, MAX_FILE_SIZE_LIMIT_MB
            ),
        ));
    }
    Ok(())
}

impl Settings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::new()
    }

    pub fn lowest_level(&self) -> LogLevel {
        self.lowest_level
    }

    pub fn set_lowest_level(&mut self, level: LogLevel) {
        self.lowest_level = level;
    }

    pub fn backup_count(&self) -> u32 {
        self.backup_count
    }

    pub fn set_backup_count(&mut self, count: u32) {
        self.backup_count = count;
    }

    pub fn max_file_size_mb(&self) -> u32 {
        self.max_file_size_mb
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        u64::from(self.max_file_size_mb) * BYTES_PER_MB
    }

    /// Set the maximum size of one log file in megabytes.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::InvalidConfiguration`] when `size_mb` is zero or
    /// larger than [`MAX_FILE_SIZE_LIMIT_MB`]. The previous value is kept.
    pub fn set_max_file_size_mb(&mut self, size_mb: u32) -> Result<()> {
        check_file_size(size_mb)?;
        self.max_file_size_mb = size_mb;
        Ok(())
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn set_directory(&mut self, dir: impl Into<PathBuf>) {
        self.directory = dir.into();
    }

    /// Resolve a sink path against the base directory. Absolute paths are kept.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.directory.join(path)
    }

    /// Re-check value ranges, e.g. after deserializing from a host config.
    pub fn validate(&self) -> Result<()> {
        check_file_size(self.max_file_size_mb)
    }
}

/// Fluent construction of [`Settings`]; range errors surface from `build`.
///
/// # Example
///
/// ```
/// use sinklog::{LogLevel, Settings};
///
/// let settings = Settings::builder()
///     .lowest_level(LogLevel::Info)
///     .backup_count(5)
///     .max_file_size_mb(16)
///     .build()
///     .unwrap();
/// assert_eq!(settings.max_file_size_bytes(), 16 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SettingsBuilder {
    settings: Settings,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value"]
    pub fn lowest_level(mut self, level: LogLevel) -> Self {
        self.settings.lowest_level = level;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn backup_count(mut self, count: u32) -> Self {
        self.settings.backup_count = count;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn max_file_size_mb(mut self, size_mb: u32) -> Self {
        self.settings.max_file_size_mb = size_mb;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.settings.directory = dir.into();
        self
    }

    pub fn build(self) -> Result<Settings> {
        self.settings.validate()?;
        Ok(self.settings)
    }
}
