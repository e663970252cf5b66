//! Writers shared by unit tests

use crate::core::{Result, SinkWriter};
use parking_lot::Mutex;
use std::sync::Arc;

/// Records every line it is given
#[derive(Clone, Default)]
pub(crate) struct CaptureWriter {
    pub(crate) lines: Arc<Mutex<Vec<String>>>,
}

impl SinkWriter for CaptureWriter {
    fn write_line(&mut self, line: &str) -> Result<()> {
        self.lines.lock().push(line.to_string());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "capture"
    }
}
