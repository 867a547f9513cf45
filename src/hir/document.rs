//! Document parse record: everything derived from one parse of one file.

use smol_str::SmolStr;

use super::diagnostics::{Diagnostic, DiagnosticCollector};
use super::symbols::{Symbol, project};
use crate::base::split_lines;
use crate::syntax::{self, ParseError, SyntaxTree};

/// The result of parsing one version of a file.
///
/// Records are immutable once built; the workspace shares them between its
/// caches through `Arc`.
#[derive(Clone, Debug)]
pub struct DocumentRecord {
    pub path: String,
    pub source_text: String,
    pub lines: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
    /// Root class symbol. After a failed parse it covers the declarations
    /// before the error.
    pub symbols: Symbol,
    pub tree: SyntaxTree,
    pub parse_error: Option<ParseError>,
    /// `class_name` declared by the file.
    pub class_name: Option<SmolStr>,
    pub extends: Option<SmolStr>,
}

impl DocumentRecord {
    pub fn parse(path: &str, source: &str) -> Self {
        let output = syntax::parse(source);
        let lines = split_lines(source);

        let mut collector = DiagnosticCollector::new();
        match &output.error {
            Some(error) => collector.parse_error(error, &lines),
            None => {
                for warning in &output.warnings {
                    collector.parser_warning(warning, &lines);
                }
            }
        }

        let symbols = project(&output.tree, &lines, path);
        let class = &output.tree.class;
        let class_name = class.name.clone().filter(|_| class.is_global);
        let extends = class.extends.clone();

        tracing::debug!(
            path,
            ok = output.error.is_none(),
            diagnostics = collector.diagnostics().len(),
            "parsed document"
        );

        Self {
            path: path.to_string(),
            source_text: source.to_string(),
            lines,
            diagnostics: collector.take(),
            symbols,
            tree: output.tree,
            parse_error: output.error,
            class_name,
            extends,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.parse_error.is_none()
    }

    /// Symbol declared on a zero-based line; the root class for its own
    /// declaration line.
    pub fn symbol_defined_at_line(&self, line: u32) -> Option<&Symbol> {
        self.symbols.find_defined_at_line(line).or_else(|| {
            (line == self.symbols.range.start.line).then_some(&self.symbols)
        })
    }

    /// Top-level member by exact name.
    pub fn member(&self, name: &str) -> Option<&Symbol> {
        self.symbols.child(name)
    }

    pub fn line(&self, line: u32) -> Option<&str> {
        self.lines.get(line as usize).map(String::as_str)
    }
}
