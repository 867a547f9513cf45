//! Foundation types for the language server.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`Position`], [`Range`], [`Location`] - Protocol source positions
//! - line text helpers used for diagnostic and symbol ranges
//! - [`uri`] - Document URI ↔ internal path conversion
//!
//! This module has NO dependencies on other crate modules.

mod span;
pub mod uri;

pub use span::{
    Location, Position, Range, leading_whitespace_len, line_len, split_lines, trimmed_end_len,
    trimmed_line_range,
};
