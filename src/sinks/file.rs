//! Rotating file sink
//!
//! Lines are appended to a primary file. Once the write offset reaches the
//! configured size, the file is marked full and rotated right before the next
//! line is written:
//!
//! ```text
//! path.N      deleted
//! path.N-1 -> path.N
//! ...
//! path     -> path.1
//! path        reopened empty
//! ```
//!
//! `path.1` is always the most recently rotated-out file. A backup count of
//! 0 or 1 disables rotation.

use crate::core::{FileFormatter, LoggerError, Result, Settings, Sink, SinkWriter};
use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Size-triggered rotation settings for one file sink
///
/// # Examples
///
/// ```
/// use sinklog::sinks::RotationPolicy;
///
/// let policy = RotationPolicy::new()
///     .with_max_bytes(50 * 1024 * 1024)
///     .with_max_backups(7);
/// assert!(policy.is_enabled());
///
/// assert!(!RotationPolicy::new().with_max_backups(1).is_enabled());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Number of rotated files kept (`path.1` ... `path.N`)
    pub max_backups: u32,
    /// Write offset at which the file counts as full
    pub max_bytes: u64,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl RotationPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_backups: settings.backup_count(),
            max_bytes: settings.max_file_size_bytes(),
        }
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_backups(mut self, count: u32) -> Self {
        self.max_backups = count;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_bytes(mut self, bytes: u64) -> Self {
        self.max_bytes = bytes;
        self
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.max_backups > 1
    }
}

pub struct RotatingFileWriter {
    path: PathBuf,
    policy: RotationPolicy,
    writer: Option<BufWriter<File>>,
    offset: u64,
    /// File reached its size limit; rotate before the next write
    full: bool,
    /// Lines accepted while the file could not be opened
    backlog: VecDeque<String>,
}

impl RotatingFileWriter {
    /// Open `path` in append mode.
    ///
    /// An open failure is reported on stderr and does not fail construction:
    /// lines are kept in memory and the open is retried on every write.
    pub fn new(path: impl Into<PathBuf>, policy: RotationPolicy) -> Self {
        let mut writer = Self {
            path: path.into(),
            policy,
            writer: None,
            offset: 0,
            full: false,
            backlog: VecDeque::new(),
        };

        if let Err(e) = writer.open() {
            eprintln!("[sinklog ERROR] {}", e);
        }
        writer
    }

    fn open(&mut self) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                LoggerError::file_sink(
                    self.path.display().to_string(),
                    format!("Failed to open: {}", e),
                )
            })?;

        let offset = file.metadata().map(|m| m.len()).map_err(|e| {
            LoggerError::file_sink(
                self.path.display().to_string(),
                format!("Cannot access file metadata: {}", e),
            )
        })?;

        self.writer = Some(BufWriter::new(file));
        self.offset = offset;
        self.full = self.policy.is_enabled() && offset >= self.policy.max_bytes;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| {
                LoggerError::file_rotation(
                    self.path.display().to_string(),
                    format!("Failed to flush before rotation: {}", e),
                )
            })?;
        }
        Ok(())
    }

    fn rotate(&mut self) -> Result<()> {
        self.close()?;

        for index in (1..=self.policy.max_backups).rev() {
            let dst = self.backup_path(index);
            remove_if_exists(&dst)?;

            let src = self.backup_path(index - 1);
            if src.exists() {
                fs::rename(&src, &dst).map_err(|e| {
                    LoggerError::io_operation(
                        "rotating log file",
                        format!("cannot rename '{}' to '{}'", src.display(), dst.display()),
                        e,
                    )
                })?;
            }
        }

        // Already renamed to path.1 above; only left behind by a failed rename
        remove_if_exists(&self.path)?;
        self.open()
    }

    /// `path` for index 0, `path.<index>` otherwise
    pub fn backup_path(&self, index: u32) -> PathBuf {
        if index == 0 {
            return self.path.clone();
        }
        let mut name = self.path.clone().into_os_string();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn write_raw(&mut self, line: &str) -> Result<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| LoggerError::file_sink(self.path.display().to_string(), "not open"))?;

        writer
            .write_all(line.as_bytes())
            .and_then(|()| writer.write_all(b"\n"))
            .map_err(|e| {
                LoggerError::file_sink(
                    self.path.display().to_string(),
                    format!("Failed to write log line: {}", e),
                )
            })?;

        self.offset += line.len() as u64 + 1;
        if self.policy.is_enabled() && self.offset >= self.policy.max_bytes {
            self.full = true;
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Bytes in the current primary file
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }
}

fn remove_if_exists(path: &Path) -> Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(LoggerError::file_rotation(
            path.display().to_string(),
            format!("Failed to remove: {}", e),
        )),
    }
}

impl SinkWriter for RotatingFileWriter {
    fn write_line(&mut self, line: &str) -> Result<()> {
        if self.full && self.writer.is_some() {
            if let Err(e) = self.rotate() {
                // The primary is reopened below and the line still lands in it;
                // reopening marks it full again, so the next write retries
                eprintln!("[sinklog WARN] Log rotation failed: {}. Continuing.", e);
            }
        }

        if self.writer.is_none() {
            if let Err(e) = self.open() {
                self.backlog.push_back(line.to_string());
                return Err(e);
            }
        }

        while let Some(pending) = self.backlog.pop_front() {
            if let Err(e) = self.write_raw(&pending) {
                self.backlog.push_front(pending);
                self.backlog.push_back(line.to_string());
                return Err(e);
            }
        }

        self.write_raw(line)
    }

    fn flush(&mut self) -> Result<()> {
        if let Some(ref mut writer) = self.writer {
            writer.flush().map_err(|e| {
                LoggerError::file_sink(
                    self.path.display().to_string(),
                    format!("Failed to flush: {}", e),
                )
            })?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

impl Drop for RotatingFileWriter {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            let _ = writer.flush();
        }
    }
}

impl Sink {
    /// A running file sink at `path`, resolved against the settings' base
    /// directory, rotating per the settings' backup count and size limit.
    pub fn file(path: impl AsRef<Path>, settings: &Settings) -> Result<Arc<Sink>> {
        Self::file_with_policy(settings.resolve(path), RotationPolicy::from_settings(settings))
    }

    pub fn file_with_policy(path: impl Into<PathBuf>, policy: RotationPolicy) -> Result<Arc<Sink>> {
        Sink::spawn(RotatingFileWriter::new(path, policy), FileFormatter::new())
    }
}
