//! SRT subtitle parsing
//!
//! Stand-alone helper for turning an `.srt` transcript into a table of cues.
//! It is unrelated to the mark timeline and keeps no state.

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// One subtitle cue. Times are `HH:MM:SS`; the milliseconds are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleCue {
    pub index: u32,
    pub start: String,
    pub end: String,
    pub text: String,
}

/// Parse the full text of an SRT file.
///
/// Blocks are separated by blank lines. A block that does not have an index
/// line, a `start --> end` line and at least one text line fails the parse.
pub fn parse_subtitles(text: &str) -> Result<Vec<SubtitleCue>, ParseError> {
    let text = text.trim_start_matches('\u{feff}').replace("\r\n", "\n");

    let mut cues = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    let mut block_number = 0;
    for line in text.lines().chain(std::iter::once("")) {
        if line.trim().is_empty() {
            if !block.is_empty() {
                block_number += 1;
                cues.push(parse_block(block_number, &block)?);
                block.clear();
            }
        } else {
            block.push(line.trim());
        }
    }

    Ok(cues)
}

fn parse_block(block: usize, lines: &[&str]) -> Result<SubtitleCue, ParseError> {
    if lines.len() < 3 {
        return Err(ParseError::TooShort { block });
    }

    let index = lines[0]
        .parse::<u32>()
        .map_err(|_| ParseError::InvalidIndex {
            block,
            line: lines[0].to_string(),
        })?;

    let invalid_timing = || ParseError::InvalidTiming {
        block,
        line: lines[1].to_string(),
    };
    let (start, end) = lines[1].split_once("-->").ok_or_else(invalid_timing)?;
    let start = parse_timestamp(start.trim()).ok_or_else(invalid_timing)?;
    let end = parse_timestamp(end.trim()).ok_or_else(invalid_timing)?;

    Ok(SubtitleCue {
        index,
        start,
        end,
        text: lines[2..].join(" "),
    })
}

/// Accept `HH:MM:SS,mmm` and return the `HH:MM:SS` part
fn parse_timestamp(value: &str) -> Option<String> {
    let (clock, millis) = value.split_once(',')?;
    if millis.len() != 3 || !millis.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let fields: Vec<&str> = clock.split(':').collect();
    let valid = fields.len() == 3
        && fields
            .iter()
            .all(|f| f.len() == 2 && f.bytes().all(|b| b.is_ascii_digit()));

    valid.then(|| clock.to_string())
}
