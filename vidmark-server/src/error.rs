use std::{io, path::PathBuf};

use thiserror::Error;

/// Failures surfaced at the session boundary (`open_video`, `save`, ...)
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("No free port in {low}-{high} after {attempts} attempts")]
    NoPortAvailable { low: u16, high: u16, attempts: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Subtitle error: {0}")]
    Subtitles(#[from] vidmark_core::ParseError),
}
