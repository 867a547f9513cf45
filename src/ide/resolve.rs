//! Symbol resolution: identifier under the cursor to declaration.
//!
//! Resolution tries, in order: the global class table, the code oracle
//! queried at the end of the identifier, and finally the top-level members
//! of the current file.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use super::oracle::{CodeOracle, LookupResult, mark_cursor};
use crate::base::uri::{file_uri_to_path, path_to_file_uri};
use crate::base::{Location, Position};
use crate::hir::Symbol;
use crate::hir::symbols::for_each_member;
use crate::project::Workspace;

/// A position inside a document, as sent by the client.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPosition {
    pub uri: String,
    pub position: Position,
}

impl DocumentPosition {
    pub fn new(uri: impl Into<String>, position: Position) -> Self {
        Self {
            uri: uri.into(),
            position,
        }
    }
}

/// Resolve the identifier at `pos` (or `explicit_name`) to its symbol.
///
/// `require_function` restricts oracle lookups to callables.
pub fn resolve_symbol(
    ws: &mut Workspace,
    oracle: &dyn CodeOracle,
    pos: &DocumentPosition,
    explicit_name: Option<&str>,
    require_function: bool,
) -> Option<Symbol> {
    let path = file_uri_to_path(&pos.uri);
    let record = ws.get_parse_result(&path)?;
    let line = record.line(pos.position.line).unwrap_or_default();

    let mut lookup_at = pos.position;
    let mut name = match explicit_name {
        Some(name) => name.split('(').next().unwrap_or_default().to_string(),
        None => {
            let (name, _, end) = identifier_at(line, pos.position.character)?;
            lookup_at.character = end;
            name
        }
    };
    if name.is_empty() {
        return None;
    }

    if let Some(class_path) = ws.global_class_path(&name).map(str::to_string) {
        return ws.get_script_symbol(&class_path);
    }

    // `Type.new(` constructs through `_init`.
    if name == "new" && line.split_whitespace().collect::<String>().contains("new(") {
        name = String::from("_init");
    }

    let code = mark_cursor(&record.source_text, lookup_at);
    let result = oracle.lookup_code(ws, &code, &name, &path, require_function);
    tracing::debug!(symbol = %name, ?result, "oracle lookup");

    match result {
        LookupResult::ScriptLocation { path: target, line } => {
            let target = ws.get_parse_result(&target)?;
            target.symbol_defined_at_line(line).cloned()
        }
        LookupResult::NativeMember { class, member } => {
            let member = member.unwrap_or_else(|| {
                if name.as_str() != class.as_str() {
                    SmolStr::new(&name)
                } else {
                    SmolStr::default()
                }
            });
            ws.native().get_native_symbol(&class, &member).cloned()
        }
        LookupResult::NotFound => record.member(&name).cloned(),
    }
}

/// Every indexed member, script or built-in, whose unqualified name is the
/// identifier at `pos`.
pub fn resolve_related_symbols(ws: &mut Workspace, pos: &DocumentPosition) -> Vec<Arc<Symbol>> {
    let path = file_uri_to_path(&pos.uri);
    let Some(record) = ws.get_parse_result(&path) else {
        return Vec::new();
    };
    let Some((name, _, _)) = record
        .line(pos.position.line)
        .and_then(|line| identifier_at(line, pos.position.character))
    else {
        return Vec::new();
    };

    if ws.smart_resolve() {
        return ws
            .flat_index()
            .lookup_simple(&name)
            .map(|entry| Arc::clone(&entry.symbol))
            .collect();
    }

    // No index: the catalog first, then the scripts by path.
    let mut related: Vec<Arc<Symbol>> = ws
        .native()
        .flat_entries()
        .into_iter()
        .filter(|entry| entry.simple_name() == name)
        .map(|entry| entry.symbol)
        .collect();
    for (_, record) in ws.scripts() {
        for_each_member(&record.symbols, &mut |_, member| {
            if member.name == name {
                related.push(Arc::new(member.clone()));
            }
        });
    }
    related
}

/// Declaration site of the identifier at `pos`. Built-in symbols have none.
pub fn definition(ws: &mut Workspace, oracle: &dyn CodeOracle, pos: &DocumentPosition) -> Option<Location> {
    let symbol = resolve_symbol(ws, oracle, pos, None, false)?;
    let path = symbol.script_path.as_deref()?;
    Some(Location {
        uri: path_to_file_uri(path),
        range: symbol.selection_range,
    })
}

// ============================================================================
// TEXT SCANNING
// ============================================================================

fn is_identifier_char(c: char) -> bool {
    c == '_' || unicode_ident::is_xid_continue(c)
}

/// The identifier touching `character` on `line`, with its start and end
/// character offsets.
pub fn identifier_at(line: &str, character: u32) -> Option<(String, u32, u32)> {
    let chars: Vec<char> = line.chars().collect();
    let cursor = (character as usize).min(chars.len());

    let mut start = cursor;
    while start > 0 && is_identifier_char(chars[start - 1]) {
        start -= 1;
    }
    let mut end = cursor;
    while end < chars.len() && is_identifier_char(chars[end]) {
        end += 1;
    }
    if start == end || chars[start].is_ascii_digit() {
        return None;
    }
    Some((chars[start..end].iter().collect(), start as u32, end as u32))
}

/// The identifier ending exactly at `character`, with its start offset.
pub fn identifier_before(text: &str, character: u32) -> Option<(String, u32)> {
    let chars: Vec<char> = text.chars().collect();
    let end = (character as usize).min(chars.len());
    let mut start = end;
    while start > 0 && is_identifier_char(chars[start - 1]) {
        start -= 1;
    }
    if start == end || chars[start].is_ascii_digit() {
        return None;
    }
    Some((chars[start..end].iter().collect(), start as u32))
}

/// The call enclosing a position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallContext {
    pub callee: String,
    /// `Type` in `Type.callee(`.
    pub qualifier: Option<String>,
    /// Zero-based index of the argument under the cursor.
    pub active_parameter: usize,
}

/// How far back a call may start.
const MAX_CALL_LINES: usize = 32;

/// Find the call whose argument list contains `position` by scanning left
/// over balanced brackets. Strings and comments are skipped.
pub fn call_context_at(lines: &[String], position: Position) -> Option<CallContext> {
    let first = (position.line as usize).min(lines.len().checked_sub(1)?);
    let mut depth = 0usize;
    let mut commas = 0usize;

    for line_no in (first.saturating_sub(MAX_CALL_LINES)..=first).rev() {
        let line = &lines[line_no];
        let code: Vec<char> = code_part(line).chars().collect();
        let limit = if line_no == first {
            (position.character as usize).min(code.len())
        } else {
            code.len()
        };

        let mut quote: Option<char> = None;
        for i in (0..limit).rev() {
            let c = code[i];
            if let Some(q) = quote {
                if c == q {
                    quote = None;
                }
                continue;
            }
            match c {
                '"' | '\'' => quote = Some(c),
                ')' | ']' | '}' => depth += 1,
                '[' | '{' if depth > 0 => depth -= 1,
                '(' if depth > 0 => depth -= 1,
                '[' | '{' => commas = 0,
                '(' => {
                    let head: String = code[..i].iter().collect();
                    let head = head.trim_end();
                    let Some((callee, start)) = identifier_before(head, head.chars().count() as u32) else {
                        commas = 0;
                        continue;
                    };
                    let qualifier = head
                        .chars()
                        .take(start as usize)
                        .collect::<String>()
                        .strip_suffix('.')
                        .and_then(|rest| identifier_before(rest, rest.chars().count() as u32))
                        .map(|(q, _)| q);
                    return Some(CallContext {
                        callee,
                        qualifier,
                        active_parameter: commas,
                    });
                }
                ',' if depth == 0 => commas += 1,
                _ => {}
            }
        }
    }
    None
}

/// The line up to a `#` comment.
fn code_part(line: &str) -> &str {
    let mut quote: Option<char> = None;
    for (i, c) in line.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '#' => return &line[..i],
            None => {}
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::split_lines;
    use crate::hir::SymbolKind;
    use crate::hir::docs::{ApiDocs, ClassDoc, MethodDoc};
    use crate::ide::oracle::DocOracle;
    use crate::project::{QueueSink, WorkspaceConfig};
    use rstest::rstest;

    fn workspace() -> Workspace {
        let docs = ApiDocs {
            classes: vec![ClassDoc {
                name: "Node".into(),
                methods: vec![
                    MethodDoc {
                        name: "queue_free".into(),
                        ..MethodDoc::default()
                    },
                    MethodDoc {
                        name: "_ready".into(),
                        ..MethodDoc::default()
                    },
                ],
                ..ClassDoc::default()
            }],
        };
        let root = std::env::temp_dir().join("gdlsp-resolve-tests-nonexistent");
        let mut ws = Workspace::new(WorkspaceConfig::new(root), Box::new(QueueSink::new())).with_api_docs(docs);
        let _ = ws.initialize();
        ws
    }

    fn at(path: &str, line: u32, character: u32) -> DocumentPosition {
        DocumentPosition::new(path_to_file_uri(path), Position::new(line, character))
    }

    #[rstest]
    #[case("var speed = 1", 6, Some(("speed", 4, 9)))]
    #[case("var speed = 1", 4, Some(("speed", 4, 9)))]
    #[case("var speed = 1", 9, Some(("speed", 4, 9)))]
    #[case("a = 12", 5, None)]
    #[case("    ", 2, None)]
    #[case("héros.run()", 2, Some(("héros", 0, 5)))]
    fn test_identifier_at(#[case] line: &str, #[case] character: u32, #[case] expected: Option<(&str, u32, u32)>) {
        let found = identifier_at(line, character);
        assert_eq!(found.as_ref().map(|(n, s, e)| (n.as_str(), *s, *e)), expected);
    }

    #[rstest]
    #[case("\tfoo(a, b", 9, "foo", None, 1)]
    #[case("\tfoo(", 5, "foo", None, 0)]
    #[case("\tNode.add(x, bar(1, 2), ", 24, "add", Some("Node"), 2)]
    #[case("\tfoo(a, [1, 2", 13, "foo", None, 1)]
    #[case("\tfoo(\"a, b\", ", 13, "foo", None, 1)]
    #[case("\tfoo((1 + 2), ", 14, "foo", None, 1)]
    fn test_call_context(
        #[case] line: &str,
        #[case] character: u32,
        #[case] callee: &str,
        #[case] qualifier: Option<&str>,
        #[case] active: usize,
    ) {
        let lines = split_lines(line);
        let call = call_context_at(&lines, Position::new(0, character)).unwrap();
        assert_eq!(call.callee, callee);
        assert_eq!(call.qualifier.as_deref(), qualifier);
        assert_eq!(call.active_parameter, active);
    }

    #[test]
    fn test_call_context_spans_lines() {
        let lines = split_lines("func f():\n\tfoo(a, # note (x\n\t\tb, \n");
        let call = call_context_at(&lines, Position::new(2, 5)).unwrap();
        assert_eq!(call.callee, "foo");
        assert_eq!(call.active_parameter, 2);
    }

    #[test]
    fn test_call_context_outside_call() {
        let lines = split_lines("var a = (1 + 2)\n");
        assert!(call_context_at(&lines, Position::new(0, 15)).is_none());
        assert!(call_context_at(&[], Position::new(0, 0)).is_none());
    }

    #[test]
    fn test_resolve_local_member() {
        let mut ws = workspace();
        ws.parse_script("/p/a.gd", "var hp = 3\nfunc f():\n\treturn hp\n").unwrap();

        let symbol = resolve_symbol(&mut ws, &DocOracle, &at("/p/a.gd", 2, 9), None, false).unwrap();
        assert_eq!(symbol.name, "hp");
        assert_eq!(symbol.kind, SymbolKind::Variable);
    }

    #[test]
    fn test_resolve_global_class() {
        let mut ws = workspace();
        ws.parse_script("/p/hero.gd", "class_name Hero\nvar hp\n").unwrap();
        ws.parse_script("/p/a.gd", "var h = Hero\n").unwrap();

        let symbol = resolve_symbol(&mut ws, &DocOracle, &at("/p/a.gd", 0, 9), None, false).unwrap();
        assert_eq!(symbol.name, "Hero");
        assert_eq!(symbol.script_path.as_deref(), Some("/p/hero.gd"));
    }

    #[test]
    fn test_resolve_native_member_and_class() {
        let mut ws = workspace();
        ws.parse_script("/p/a.gd", "extends Node\nfunc f():\n\tqueue_free()\n").unwrap();

        let member = resolve_symbol(&mut ws, &DocOracle, &at("/p/a.gd", 2, 3), None, false).unwrap();
        assert_eq!(member.name, "queue_free");
        assert_eq!(member.native_class.as_deref(), Some("Node"));

        let class = resolve_symbol(&mut ws, &DocOracle, &at("/p/a.gd", 0, 9), None, false).unwrap();
        assert_eq!(class.name, "Node");
        assert_eq!(class.kind, SymbolKind::Class);
    }

    #[test]
    fn test_resolve_explicit_name() {
        let mut ws = workspace();
        ws.parse_script("/p/a.gd", "func walk(speed):\n\tpass\n").unwrap();

        let symbol = resolve_symbol(&mut ws, &DocOracle, &at("/p/a.gd", 1, 1), Some("walk(1)"), true).unwrap();
        assert_eq!(symbol.name, "walk");
        assert!(resolve_symbol(&mut ws, &DocOracle, &at("/p/a.gd", 1, 1), Some(""), false).is_none());
    }

    #[test]
    fn test_resolve_unknown_path() {
        let mut ws = workspace();
        assert!(resolve_symbol(&mut ws, &DocOracle, &at("/p/missing.gd", 0, 0), None, false).is_none());
    }

    #[test]
    fn test_definition_locations() {
        let mut ws = workspace();
        ws.parse_script("/p/a.gd", "extends Node\nvar hp = 3\nfunc f():\n\thp = 1\n\tqueue_free()\n")
            .unwrap();

        let location = definition(&mut ws, &DocOracle, &at("/p/a.gd", 3, 2)).unwrap();
        assert_eq!(location.uri, "file:///p/a.gd");
        assert_eq!(location.range.start, Position::new(1, 4));

        assert!(definition(&mut ws, &DocOracle, &at("/p/a.gd", 4, 3)).is_none());
    }

    #[test]
    fn test_related_symbols() {
        let mut ws = workspace();
        ws.parse_script("/p/a.gd", "func _ready():\n\tpass\n").unwrap();
        ws.parse_script("/p/b.gd", "func _ready():\n\tpass\n").unwrap();

        let related = resolve_related_symbols(&mut ws, &at("/p/a.gd", 0, 7));
        assert_eq!(related.len(), 3);
        assert_eq!(related.iter().filter(|s| s.native_class.is_some()).count(), 1);
    }

    #[test]
    fn test_related_symbols_without_index() {
        let docs = ApiDocs {
            classes: vec![ClassDoc {
                name: "Node".into(),
                methods: vec![MethodDoc {
                    name: "_ready".into(),
                    ..MethodDoc::default()
                }],
                ..ClassDoc::default()
            }],
        };
        let dir = tempfile::tempdir().unwrap();
        let mut config = WorkspaceConfig::new(dir.path());
        config.smart_resolve = false;
        let mut ws = Workspace::new(config, Box::new(QueueSink::new())).with_api_docs(docs);
        ws.initialize().unwrap();
        ws.parse_script("/p/a.gd", "func _ready():\n\tpass\n").unwrap();
        ws.parse_script("/p/b.gd", "func _ready():\n\tpass\nfunc other():\n\tpass\n").unwrap();

        assert!(ws.flat_index().is_empty());
        let related = resolve_related_symbols(&mut ws, &at("/p/a.gd", 0, 7));
        assert_eq!(related.len(), 3);
        assert_eq!(related[0].native_class.as_deref(), Some("Node"));
        assert_eq!(related[1].script_path.as_deref(), Some("/p/a.gd"));
        assert_eq!(related[2].script_path.as_deref(), Some("/p/b.gd"));
    }

    #[test]
    fn test_resolve_after_failed_reparse() {
        let mut ws = workspace();
        let good = "func walk():\n\tpass\nfunc _ready():\n\twalk()\n";
        ws.parse_script("/p/a.gd", good).unwrap();
        assert!(ws.parse_script("/p/a.gd", &format!("{}var broken = (\n", good)).is_err());

        // The failed attempt answers position queries; the last good tree
        // still backs the script symbol.
        let symbol = resolve_symbol(&mut ws, &DocOracle, &at("/p/a.gd", 3, 2), None, false).unwrap();
        assert_eq!(symbol.name, "walk");
        assert_eq!(symbol.range.start.line, 0);

        let script = ws.get_parse_successed_script("/p/a.gd").unwrap();
        assert!(script.parse_error.is_none());
        assert!(script.member("walk").is_some());
        assert!(ws.cached_parse_result("/p/a.gd").unwrap().parse_error.is_some());
    }
}
