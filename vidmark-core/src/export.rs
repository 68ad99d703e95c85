//! Export naming and CSV row format
//!
//! Every export is prefixed with the session start time, optionally followed
//! by the operator's role and last name.
//!
//! | Base name     | Role        | Last name | Output                                   |
//! |---------------|-------------|-----------|------------------------------------------|
//! | `marks.csv`   | -           | -         | `20240115_1430_mark.csv`                 |
//! | `marks.csv`   | `attending` | `Smith`   | `20240115_1430_mark_attending_smith.csv` |
//! | `case12.csv`  | `resident`  | -         | `20240115_1430_case12_resident.csv`      |

use std::path::{Path, PathBuf};

/// Base file name that triggers the synthesized `{timestamp}_mark` name
pub const DEFAULT_EXPORT_FILE_NAME: &str = "marks.csv";

/// Single CSV column header
pub const CSV_HEADER: &str = "timestamp_seconds";

/// `strftime` format of the session start timestamp (`YYYYMMDD_HHMM`)
pub const SESSION_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M";

/// Format a mark offset as a CSV cell, always with three decimals
pub fn format_offset(offset_seconds: f64) -> String {
    format!("{:.3}", offset_seconds)
}

/// Reduce an operator name to `[a-z0-9_]` for use in a file name.
///
/// Whitespace becomes `_`, other characters outside the set are dropped and
/// leading/trailing underscores are trimmed. Returns `None` if nothing is left.
pub fn sanitize_last_name(last_name: &str) -> Option<String> {
    sanitize_file_part(last_name)
}

/// Same reduction for the role suffix; path separators and dots never
/// survive, so the result is always a single file-name component
pub fn sanitize_role(role: &str) -> Option<String> {
    sanitize_file_part(role)
}

fn sanitize_file_part(value: &str) -> Option<String> {
    let sanitized: String = value
        .trim()
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some('_')
            } else if c.is_ascii_alphanumeric() || c == '_' {
                Some(c.to_ascii_lowercase())
            } else {
                None
            }
        })
        .collect();
    let sanitized = sanitized.trim_matches('_');

    (!sanitized.is_empty()).then(|| sanitized.to_string())
}

/// Compute the final export path for `base_path`.
///
/// The directory of `base_path` is kept; only the file name is rewritten.
pub fn compute_output_path(
    base_path: &Path,
    session_timestamp: &str,
    role_suffix: Option<&str>,
    last_name: Option<&str>,
) -> PathBuf {
    let role = role_suffix.and_then(sanitize_role);
    let name = last_name.and_then(sanitize_last_name);

    let (dir, file_name) = match base_path.file_name().and_then(|n| n.to_str()) {
        Some(file_name) => (base_path.parent().unwrap_or(Path::new("")), file_name),
        None => (base_path, DEFAULT_EXPORT_FILE_NAME),
    };

    let mut parts = vec![session_timestamp.to_string()];
    let extension = if file_name == DEFAULT_EXPORT_FILE_NAME {
        parts.push("mark".to_string());
        ".csv".to_string()
    } else {
        let stem_path = Path::new(file_name);
        let stem = stem_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file_name);
        parts.push(stem.to_string());
        stem_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e))
            .unwrap_or_default()
    };
    parts.extend(role);
    parts.extend(name);

    dir.join(format!("{}{}", parts.join("_"), extension))
}
