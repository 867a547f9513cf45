//! Source text positions and ranges.
//!
//! Positions follow the protocol convention: zero-based lines, and
//! characters counted in code units of the line string.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A zero-based line/character position in source text.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Default, Serialize, Deserialize)]
pub struct Position {
    /// 0-indexed line number
    pub line: u32,
    /// 0-indexed character offset within the line
    pub character: u32,
}

impl Position {
    /// Create a new position.
    #[inline]
    pub const fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }

    /// Create from a 1-indexed line (as reported by the parser) and a
    /// 0-indexed character.
    #[inline]
    pub const fn from_parser_line(line: u32, character: u32) -> Self {
        Self {
            line: line.saturating_sub(1),
            character,
        }
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.character)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line + 1, self.character + 1)
    }
}

/// A range in source text. `end` is exclusive.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Default, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    #[inline]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// A range covering part of a single line.
    #[inline]
    pub const fn on_line(line: u32, start: u32, end: u32) -> Self {
        Self {
            start: Position::new(line, start),
            end: Position::new(line, end),
        }
    }

    /// Whether `other` lies entirely within this range.
    pub fn contains_range(&self, other: &Range) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Whether `pos` lies within this range (end inclusive, so a cursor
    /// placed right after the last character still counts).
    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos <= self.end
    }
}

impl fmt::Debug for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}-{:?}", self.start, self.end)
    }
}

/// A range inside a document identified by URI.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Location {
    pub uri: String,
    pub range: Range,
}

// ============================================================================
// LINE TEXT HELPERS
// ============================================================================

/// Split source text into lines on `\n`.
///
/// A trailing `\r` is kept on each line; the trimming helpers below treat it
/// as whitespace.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split('\n').map(str::to_owned).collect()
}

/// Number of characters before the first non-whitespace character.
///
/// A blank line yields its full length.
pub fn leading_whitespace_len(line: &str) -> u32 {
    let total = line.chars().count();
    let trimmed = line.trim_start().chars().count();
    (total - trimmed) as u32
}

/// Length of the line once trailing whitespace is stripped.
pub fn trimmed_end_len(line: &str) -> u32 {
    line.trim_end().chars().count() as u32
}

/// Length of a line in characters.
pub fn line_len(line: &str) -> u32 {
    line.chars().count() as u32
}

/// The range covering the non-whitespace content of `line`.
///
/// This is the squiggle range used for diagnostics: it starts at the first
/// non-whitespace character and ends after the last one.
pub fn trimmed_line_range(line_no: u32, line: &str) -> Range {
    let start = leading_whitespace_len(line);
    let end = trimmed_end_len(line).max(start);
    Range::on_line(line_no, start, end)
}
