//! Error types for range and subtitle parsing

use thiserror::Error;

/// Errors that can occur when resolving a `Range` header against a file
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    /// Range starts at or beyond the end of the file
    #[error("Range start {start} is beyond file size {file_size}")]
    StartBeyondEnd { start: u64, file_size: u64 },

    /// Range end lies before its start
    #[error("Range end {end} is before start {start}")]
    Inverted { start: u64, end: u64 },

    /// File has no bytes, so no range can be satisfied
    #[error("Cannot satisfy a range on an empty file")]
    EmptyFile,
}

/// Errors that can occur when parsing a subtitle (SRT) file
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Block has fewer than the three required lines
    #[error("Subtitle block {block}: expected index, timing and text lines")]
    TooShort { block: usize },

    /// First line of the block is not a cue number
    #[error("Subtitle block {block}: invalid cue index '{line}'")]
    InvalidIndex { block: usize, line: String },

    /// Second line of the block is not a `start --> end` timing line
    #[error("Subtitle block {block}: invalid timing line '{line}'")]
    InvalidTiming { block: usize, line: String },
}
