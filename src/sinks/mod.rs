//! Sink writers: console and rotating file

pub mod console;
pub mod file;

pub use console::ConsoleWriter;
pub use file::{RotatingFileWriter, RotationPolicy};
