//! CSV output for mark exports and subtitle tables.
//!
//! Mark export format:
//!
//! ```text
//! timestamp_seconds
//! 1.000
//! 12.480
//! ```

use log::{debug, info};
use std::fs;
use std::io;
use std::path::Path;
use vidmark_core::{format_offset, SubtitleCue, CSV_HEADER};

use crate::error::SessionError;

fn csv_builder() -> csv::WriterBuilder {
    let mut builder = csv::WriterBuilder::new();
    builder.terminator(csv::Terminator::Any(b'\n'));
    builder
}

/// Write `marks` to `path`, creating parent directories as needed.
///
/// An empty slice produces a header-only file.
pub fn write_marks_csv(path: &Path, marks: &[f64]) -> Result<(), SessionError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
        debug!("Export directory: {}", parent.display());
    }

    let mut writer = csv_builder().from_path(path)?;
    writer.write_record([CSV_HEADER])?;
    for &mark in marks {
        writer.write_record([format_offset(mark)])?;
    }
    writer.flush()?;

    info!("Wrote {} marks to {}", marks.len(), path.display());
    Ok(())
}

/// Write subtitle cues as `n_sub,start_t,end_t,text`
pub fn write_subtitles_csv<W: io::Write>(out: W, cues: &[SubtitleCue]) -> Result<(), SessionError> {
    let mut writer = csv_builder().from_writer(out);
    writer.write_record(["n_sub", "start_t", "end_t", "text"])?;
    for cue in cues {
        writer.write_record([
            cue.index.to_string().as_str(),
            cue.start.as_str(),
            cue.end.as_str(),
            cue.text.as_str(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_marks() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("out.csv");

        write_marks_csv(&path, &[1.0, 5.25, 12.4801]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "timestamp_seconds\n1.000\n5.250\n12.480\n");
    }

    #[test]
    fn test_creates_parent_directories() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a").join("b").join("out.csv");

        write_marks_csv(&path, &[2.0]).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_empty_export_is_header_only() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("empty.csv");

        write_marks_csv(&path, &[]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "timestamp_seconds\n");
    }

    #[test]
    fn test_unwritable_path_is_error() {
        let temp = TempDir::new().unwrap();
        // A regular file cannot be used as a directory
        let blocker = temp.path().join("blocker");
        fs::write(&blocker, b"x").unwrap();

        let result = write_marks_csv(&blocker.join("out.csv"), &[1.0]);
        assert!(matches!(result, Err(SessionError::Io(_))));
    }

    #[test]
    fn test_write_subtitles() {
        let cues = vec![SubtitleCue {
            index: 1,
            start: "00:00:01".to_string(),
            end: "00:00:04".to_string(),
            text: "Suture, then close".to_string(),
        }];
        let mut out = Vec::new();
        write_subtitles_csv(&mut out, &cues).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "n_sub,start_t,end_t,text\n1,00:00:01,00:00:04,\"Suture, then close\"\n"
        );
    }
}
