//! # Video Marker Core
//!
//! Platform-independent logic for marking events in a locally played video.
//!
//! This crate contains pure state and formatting logic with **zero I/O
//! dependencies**: no sockets, no filesystem, no async runtime. Everything
//! that touches the outside world lives in `vidmark-server`.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  vidmark-core (no tokio, no filesystem)                     │
//! │  ├── timeline/   (debounced mark list, undo)                │
//! │  ├── range/      (Range header → byte span, 416 policy)     │
//! │  ├── media/      (content type per extension)               │
//! │  ├── export/     (session-stamped file names, CSV cells)    │
//! │  └── subtitles/  (SRT → cue table)                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              ▲
//!                 ┌────────────┴────────────┐
//!                 │  vidmark-server         │
//!                 │  (axum media server,    │
//!                 │   session controller)   │
//!                 └─────────────────────────┘
//! ```
//!
//! ## Example: Marking and Naming an Export
//!
//! ```rust
//! use std::path::Path;
//! use vidmark_core::{compute_output_path, MarkTimeline};
//!
//! let mut timeline = MarkTimeline::new();
//! timeline.append(1.0);
//! timeline.append(5.25);
//! timeline.append(5.3); // within 0.2s of 5.25, dropped
//! timeline.undo();
//! assert_eq!(timeline.list(), vec![1.0]);
//!
//! let out = compute_output_path(Path::new("marks.csv"), "20240115_1430", None, None);
//! assert_eq!(out, Path::new("20240115_1430_mark.csv"));
//! ```

pub mod error;
pub mod export;
pub mod media;
pub mod range;
pub mod subtitles;
pub mod timeline;

// Re-export commonly used types
pub use error::{ParseError, RangeError};
pub use export::{
    compute_output_path, format_offset, sanitize_last_name, sanitize_role, CSV_HEADER,
    DEFAULT_EXPORT_FILE_NAME, SESSION_TIMESTAMP_FORMAT,
};
pub use media::content_type_for;
pub use range::{resolve_range, unsatisfiable_content_range, ByteRange, RangeRequest};
pub use subtitles::{parse_subtitles, SubtitleCue};
pub use timeline::{MarkResult, MarkTimeline, UndoResult, DEBOUNCE_SECONDS};
