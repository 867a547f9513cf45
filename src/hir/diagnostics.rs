//! Diagnostics: parse errors and warnings in protocol form.
//!
//! The parser reports 1-indexed lines and no spans; diagnostics cover the
//! non-whitespace content of the offending line instead.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::base::{Location, Range, trimmed_line_range};
use crate::syntax::{ParseError, Warning};

/// Value of the diagnostic `source` field.
pub const SOURCE: &str = "gdscript";

// ============================================================================
// DIAGNOSTIC TYPES
// ============================================================================

/// Severity level of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

impl Severity {
    /// Convert to LSP severity number.
    pub fn to_lsp(&self) -> u32 {
        match self {
            Severity::Error => 1,
            Severity::Warning => 2,
            Severity::Info => 3,
            Severity::Hint => 4,
        }
    }

    pub fn from_lsp(value: u32) -> Option<Self> {
        match value {
            1 => Some(Severity::Error),
            2 => Some(Severity::Warning),
            3 => Some(Severity::Info),
            4 => Some(Severity::Hint),
            _ => None,
        }
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.to_lsp())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u32::deserialize(deserializer)?;
        Severity::from_lsp(value)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid severity {}", value)))
    }
}

/// A diagnostic message with location.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub range: Range,
    pub severity: Severity,
    /// `-1` for parse errors, the warning category id otherwise.
    pub code: i32,
    pub source: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_information: Vec<RelatedInfo>,
}

/// Related information for a diagnostic.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedInfo {
    pub location: Location,
    pub message: String,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(range: Range, message: impl Into<String>) -> Self {
        Self {
            range,
            severity: Severity::Error,
            code: codes::PARSE_ERROR,
            source: SOURCE.to_string(),
            message: message.into(),
            related_information: Vec::new(),
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(range: Range, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(range, message)
        }
    }

    /// Set the code.
    pub fn with_code(mut self, code: i32) -> Self {
        self.code = code;
        self
    }

    /// Add related information.
    pub fn with_related(mut self, info: RelatedInfo) -> Self {
        self.related_information.push(info);
        self
    }
}

// ============================================================================
// DIAGNOSTIC CODES
// ============================================================================

/// Diagnostic codes not covered by warning categories.
pub mod codes {
    /// Fatal parse error.
    pub const PARSE_ERROR: i32 = -1;
}

// ============================================================================
// DIAGNOSTIC COLLECTOR
// ============================================================================

/// Collects the diagnostics of one document.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Add the error diagnostic for a failed parse.
    ///
    /// `line` is converted from the parser's 1-indexed line; a line past the
    /// end of the text yields an empty range at column 0.
    pub fn parse_error(&mut self, error: &ParseError, lines: &[String]) {
        let range = line_range(error.line, lines);
        self.add(Diagnostic::error(range, error.message.clone()));
    }

    /// Add a warning diagnostic carrying the warning category as its code.
    pub fn parser_warning(&mut self, warning: &Warning, lines: &[String]) {
        let range = line_range(warning.line, lines);
        self.add(Diagnostic::warning(range, warning.message.clone()).with_code(warning.code.id()));
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Error).count()
    }

    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.severity == Severity::Warning).count()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    /// Take all diagnostics, leaving the collector empty.
    pub fn take(&mut self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics)
    }
}

fn line_range(parser_line: u32, lines: &[String]) -> Range {
    let line = parser_line.saturating_sub(1);
    let text = lines.get(line as usize).map_or("", String::as_str);
    trimmed_line_range(line, text)
}
