//! Mark Timeline
//!
//! The ordered list of marks an operator records while a video plays. Marks
//! are appended in the order the operator taps, which is not necessarily
//! sorted by offset when they seek backwards first.
//!
//! ## Debounce
//!
//! A mark is dropped when it lands within [`DEBOUNCE_SECONDS`] of the most
//! recently stored mark. Only the structurally adjacent mark is checked, so
//! undoing a mark re-opens the window around the one before it.
//!
//! ```rust
//! use vidmark_core::MarkTimeline;
//!
//! let mut timeline = MarkTimeline::new();
//! timeline.append(1.0);
//! timeline.append(5.25);
//! let result = timeline.append(5.3); // debounced
//! assert_eq!(result.count, 2);
//!
//! timeline.undo();
//! assert_eq!(timeline.list(), vec![1.0]);
//! ```

use serde::{Deserialize, Serialize};

/// Minimum distance between two adjacent marks, in seconds
pub const DEBOUNCE_SECONDS: f64 = 0.2;

const DEBOUNCE_MS: i64 = 200;

/// Result of an append: the timeline length and its newest mark
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkResult {
    pub count: usize,
    /// Newest mark in seconds, `None` only when the timeline is empty
    pub last: Option<f64>,
}

/// Result of an undo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UndoResult {
    pub count: usize,
}

/// In-memory mark timeline for one session
#[derive(Debug, Clone, Default)]
pub struct MarkTimeline {
    marks: Vec<f64>,
}

/// Round an offset to millisecond precision
fn round_to_millis(offset_seconds: f64) -> f64 {
    (offset_seconds * 1000.0).round() / 1000.0
}

fn as_millis(offset_seconds: f64) -> i64 {
    (offset_seconds * 1000.0).round() as i64
}

impl MarkTimeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mark unless it is within the debounce window of the last one.
    ///
    /// The offset is rounded to milliseconds before it is compared and stored.
    /// Negative offsets are clamped to zero; NaN and infinite offsets are
    /// ignored. Debounced and ignored calls still report the current state.
    pub fn append(&mut self, offset_seconds: f64) -> MarkResult {
        if !offset_seconds.is_finite() {
            return self.summary();
        }
        let offset = round_to_millis(offset_seconds.max(0.0));

        let debounced = self
            .marks
            .last()
            .is_some_and(|&last| (as_millis(last) - as_millis(offset)).abs() < DEBOUNCE_MS);
        if !debounced {
            self.marks.push(offset);
        }

        self.summary()
    }

    /// Remove the most recent mark. No-op on an empty timeline.
    pub fn undo(&mut self) -> UndoResult {
        self.marks.pop();
        UndoResult {
            count: self.marks.len(),
        }
    }

    /// Snapshot of all marks in insertion order
    pub fn list(&self) -> Vec<f64> {
        self.marks.clone()
    }

    pub fn len(&self) -> usize {
        self.marks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marks.is_empty()
    }

    pub fn last(&self) -> Option<f64> {
        self.marks.last().copied()
    }

    fn summary(&self) -> MarkResult {
        MarkResult {
            count: self.marks.len(),
            last: self.last(),
        }
    }
}
