//! Code oracle: the completion/lookup engine behind position queries.
//!
//! The oracle receives the whole file text with [`CURSOR_MARKER`] inserted
//! at the query position. The marker is the only channel for the cursor; it
//! is not escaped, so a source file that already contains U+FFFF confuses
//! the oracle.
//!
//! [`DocOracle`] answers from the parsed script text, the workspace's global
//! classes and the native catalog, without a running host.

use smol_str::SmolStr;

use super::resolve::{call_context_at, identifier_before};
use crate::base::{Position, split_lines};
use crate::hir::symbols::project;
use crate::hir::{Symbol, SymbolKind};
use crate::project::Workspace;
use crate::syntax;

/// Cursor sentinel inserted into the text handed to the oracle.
pub const CURSOR_MARKER: char = '\u{FFFF}';

/// Category of a completion candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CandidateKind {
    Class,
    Constant,
    Enum,
    NodePath,
    FilePath,
    Function,
    Member,
    Signal,
    Variable,
    Keyword,
    PlainText,
}

/// A raw completion proposal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompletionCandidate {
    pub display: String,
    pub insert_text: String,
    pub kind: CandidateKind,
}

impl CompletionCandidate {
    pub fn new(display: impl Into<String>, kind: CandidateKind) -> Self {
        let display = display.into();
        Self {
            insert_text: display.clone(),
            display,
            kind,
        }
    }
}

/// Where the oracle found a symbol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LookupResult {
    /// Declared in a script; `line` is zero-based.
    ScriptLocation { path: String, line: u32 },
    /// A built-in class, or one of its members.
    NativeMember {
        class: SmolStr,
        member: Option<SmolStr>,
    },
    NotFound,
}

pub trait CodeOracle {
    /// Completion proposals at the marked position.
    fn complete_code(&self, ws: &Workspace, code: &str, path: &str) -> Vec<CompletionCandidate>;

    /// Locate `symbol`, written at the marked position.
    fn lookup_code(
        &self,
        ws: &Workspace,
        code: &str,
        symbol: &str,
        path: &str,
        require_function: bool,
    ) -> LookupResult;

    /// Call hint for the call enclosing the marked position:
    /// `callee(a, \u{FFFF}b\u{FFFF}, c) -> ret`. Empty when not in a call.
    fn call_hint(&self, ws: &Workspace, code: &str, path: &str) -> String;
}

/// Insert [`CURSOR_MARKER`] at a zero-based position. Positions past the
/// end of a line or of the text are clamped.
pub fn mark_cursor(text: &str, position: Position) -> String {
    let mut out = String::with_capacity(text.len() + CURSOR_MARKER.len_utf8());
    let mut inserted = false;
    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            out.push('\n');
        }
        if index == position.line as usize {
            let split = line
                .char_indices()
                .nth(position.character as usize)
                .map_or(line.len(), |(i, _)| i);
            out.push_str(&line[..split]);
            out.push(CURSOR_MARKER);
            out.push_str(&line[split..]);
            inserted = true;
        } else {
            out.push_str(line);
        }
    }
    if !inserted {
        out.push(CURSOR_MARKER);
    }
    out
}

/// Remove the marker, returning the clean text and the marker position.
pub fn split_cursor(code: &str) -> (String, Position) {
    let mut position = Position::default();
    if let Some(offset) = code.find(CURSOR_MARKER) {
        let before = &code[..offset];
        position.line = before.matches('\n').count() as u32;
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        position.character = before[line_start..].chars().count() as u32;
    }
    (code.replace(CURSOR_MARKER, ""), position)
}

// ============================================================================
// OFFLINE ORACLE
// ============================================================================

const KEYWORDS: &[&str] = &[
    "and", "as", "assert", "break", "breakpoint", "class", "class_name", "const", "continue",
    "elif", "else", "enum", "export", "extends", "false", "for", "func", "if", "in", "is",
    "master", "match", "not", "null", "onready", "or", "pass", "preload", "puppet", "remote",
    "return", "self", "setget", "signal", "static", "sync", "tool", "true", "var", "while",
    "yield",
];

/// Oracle backed by script text and API documentation.
#[derive(Clone, Copy, Debug, Default)]
pub struct DocOracle;

/// The marked script, parsed.
struct MarkedScript {
    root: Symbol,
    lines: Vec<String>,
    cursor: Position,
    extends: Option<SmolStr>,
}

impl MarkedScript {
    fn new(code: &str, path: &str) -> Self {
        let (text, cursor) = split_cursor(code);
        let output = syntax::parse(&text);
        let lines = split_lines(&text);
        let root = project(&output.tree, &lines, path);
        Self {
            root,
            lines,
            cursor,
            extends: output.tree.class.extends,
        }
    }

    /// `Type` in `Type.name|` where the cursor follows `name`.
    fn qualifier(&self, name: &str) -> Option<String> {
        let line = self.lines.get(self.cursor.line as usize)?;
        let before: String = line.chars().take(self.cursor.character as usize).collect();
        let rest = before.strip_suffix(name)?.strip_suffix('.')?;
        let (qualifier, _) = identifier_before(rest, rest.chars().count() as u32)?;
        Some(qualifier)
    }
}

/// One step up an `extends` chain.
enum Base<'a> {
    Script(String),
    Native(&'a str),
}

impl DocOracle {
    pub fn new() -> Self {
        Self
    }

    /// Resolve an `extends` target to a script path or a native class.
    fn base_of<'a>(ws: &'a Workspace, extends: &'a str) -> Option<Base<'a>> {
        if let Some(path) = ws.global_class_path(extends) {
            return Some(Base::Script(path.to_string()));
        }
        if ws.native().is_native_class(extends) {
            return Some(Base::Native(extends));
        }
        None
    }

    /// Walk the script part of an `extends` chain, calling `visit` on each
    /// ancestor script's root symbol. Returns the native class the chain
    /// ends in, if any.
    fn walk_script_bases<'a>(
        ws: &'a Workspace,
        extends: Option<&'a str>,
        mut visit: impl FnMut(&str, &Symbol) -> bool,
    ) -> Option<&'a str> {
        let mut next = extends;
        let mut seen = Vec::new();
        while let Some(extends) = next {
            match Self::base_of(ws, extends)? {
                Base::Native(class) => return Some(class),
                Base::Script(path) => {
                    if seen.contains(&path) {
                        return None;
                    }
                    let record = ws.cached_script(&path)?;
                    if visit(&path, &record.symbols) {
                        return None;
                    }
                    next = record.extends.as_deref();
                    seen.push(path);
                }
            }
        }
        None
    }
}

fn candidate_kind(symbol: &Symbol) -> CandidateKind {
    match symbol.kind {
        SymbolKind::Class => CandidateKind::Class,
        SymbolKind::Constant => CandidateKind::Constant,
        SymbolKind::Enum => CandidateKind::Enum,
        SymbolKind::Method | SymbolKind::Function => CandidateKind::Function,
        SymbolKind::Event => CandidateKind::Signal,
        SymbolKind::Property | SymbolKind::Field => CandidateKind::Member,
        SymbolKind::Variable => CandidateKind::Variable,
        SymbolKind::File => CandidateKind::FilePath,
    }
}

fn accepts(symbol: &Symbol, require_function: bool) -> bool {
    !require_function || symbol.kind.is_callable()
}

impl CodeOracle for DocOracle {
    fn complete_code(&self, ws: &Workspace, code: &str, path: &str) -> Vec<CompletionCandidate> {
        let script = MarkedScript::new(code, path);
        let mut out: Vec<CompletionCandidate> = Vec::new();
        let mut push = |candidate: CompletionCandidate| {
            if !out.iter().any(|c| c.display == candidate.display) {
                out.push(candidate);
            }
        };

        // `Type.` completes the members of a built-in type only.
        let line = script.lines.get(script.cursor.line as usize).map_or("", String::as_str);
        let prefix_start = identifier_before(line, script.cursor.character)
            .map_or(script.cursor.character, |(_, start)| start);
        let before_word: String = line.chars().take(prefix_start as usize).collect();
        if let Some(rest) = before_word.strip_suffix('.') {
            let qualifier = identifier_before(rest, rest.chars().count() as u32)
                .map(|(word, _)| word)
                .filter(|word| ws.native().is_native_class(word));
            if let Some(qualifier) = qualifier {
                for (_, native) in ws.native().ancestors(&qualifier) {
                    for member in &native.symbol.children {
                        push(CompletionCandidate::new(&member.name, candidate_kind(member)));
                    }
                }
                return out;
            }
        }

        for member in &script.root.children {
            push(CompletionCandidate::new(&member.name, candidate_kind(member)));
        }
        let native_base = Self::walk_script_bases(ws, script.extends.as_deref(), |_, root| {
            for member in &root.children {
                push(CompletionCandidate::new(&member.name, candidate_kind(member)));
            }
            false
        });
        if let Some(class) = native_base {
            for (_, native) in ws.native().ancestors(class) {
                for member in &native.symbol.children {
                    push(CompletionCandidate::new(&member.name, candidate_kind(member)));
                }
            }
        }
        for name in ws.global_class_names() {
            push(CompletionCandidate::new(name.as_str(), CandidateKind::Class));
        }
        for name in ws.native().class_names() {
            push(CompletionCandidate::new(name.as_str(), CandidateKind::Class));
        }
        for keyword in KEYWORDS {
            push(CompletionCandidate::new(*keyword, CandidateKind::Keyword));
        }

        out
    }

    fn lookup_code(
        &self,
        ws: &Workspace,
        code: &str,
        symbol: &str,
        path: &str,
        require_function: bool,
    ) -> LookupResult {
        let script = MarkedScript::new(code, path);

        if let Some(qualifier) = script.qualifier(symbol) {
            if ws.native().is_native_class(&qualifier) {
                return match ws.native().get_native_symbol(&qualifier, symbol) {
                    Some(found) if accepts(found, require_function) => LookupResult::NativeMember {
                        class: SmolStr::new(&qualifier),
                        member: Some(SmolStr::new(symbol)),
                    },
                    _ => LookupResult::NotFound,
                };
            }
        }

        if let Some(member) = script.root.child(symbol).filter(|m| accepts(m, require_function)) {
            return LookupResult::ScriptLocation {
                path: path.to_string(),
                line: member.range.start.line,
            };
        }

        if !require_function && ws.native().is_native_class(symbol) {
            return LookupResult::NativeMember {
                class: SmolStr::new(symbol),
                member: None,
            };
        }

        let mut found = None;
        let native_base = Self::walk_script_bases(ws, script.extends.as_deref(), |base_path, root| {
            match root.child(symbol).filter(|m| accepts(m, require_function)) {
                Some(member) => {
                    found = Some(LookupResult::ScriptLocation {
                        path: base_path.to_string(),
                        line: member.range.start.line,
                    });
                    true
                }
                None => false,
            }
        });
        if let Some(found) = found {
            return found;
        }

        if let Some(class) = native_base {
            if let Some(member) = ws.native().get_native_symbol(class, symbol) {
                if accepts(member, require_function) {
                    let owner = member.native_class.clone().unwrap_or_else(|| SmolStr::new(class));
                    return LookupResult::NativeMember {
                        class: owner,
                        member: Some(SmolStr::new(symbol)),
                    };
                }
            }
        }

        LookupResult::NotFound
    }

    fn call_hint(&self, ws: &Workspace, code: &str, path: &str) -> String {
        let script = MarkedScript::new(code, path);
        let Some(call) = call_context_at(&script.lines, script.cursor) else {
            return String::new();
        };

        let mut declaration = None;
        if let Some(qualifier) = &call.qualifier {
            declaration = ws.native().get_native_symbol(qualifier, &call.callee).cloned();
        }
        if declaration.is_none() {
            declaration = script.root.child(&call.callee).filter(|s| s.kind.is_callable()).cloned();
        }
        if declaration.is_none() {
            let native_base = Self::walk_script_bases(ws, script.extends.as_deref(), |_, root| {
                declaration = root.child(&call.callee).filter(|s| s.kind.is_callable()).cloned();
                declaration.is_some()
            });
            if declaration.is_none() {
                if let Some(class) = native_base {
                    declaration = ws.native().get_native_symbol(class, &call.callee).cloned();
                }
            }
        }

        let Some(declaration) = declaration.filter(|s| s.kind.is_callable()) else {
            return String::new();
        };
        let Some(signature) = Signature::parse(&declaration.detail) else {
            return String::new();
        };
        signature.hint(call.active_parameter)
    }
}

/// A callable signature split out of a symbol detail string.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Signature {
    pub name: String,
    pub params: Vec<String>,
    pub return_type: Option<String>,
}

impl Signature {
    /// Parse `[static ][func ]name(a, b) [-> T]`.
    pub fn parse(detail: &str) -> Option<Self> {
        let detail = detail.strip_prefix("static ").unwrap_or(detail);
        let detail = detail.strip_prefix("func ").unwrap_or(detail);
        let open = detail.find('(')?;
        let close = matching_paren(detail, open)?;
        let params = split_params(&detail[open + 1..close]);
        let return_type = detail[close + 1..]
            .trim()
            .strip_prefix("->")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Some(Self {
            name: detail[..open].trim().to_string(),
            params,
            return_type,
        })
    }

    /// Render a call hint with the active parameter wrapped in markers.
    pub fn hint(&self, active: usize) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| {
                if i == active {
                    format!("{m}{p}{m}", m = CURSOR_MARKER)
                } else {
                    p.clone()
                }
            })
            .collect();
        let mut hint = format!("{}({})", self.name, params.join(", "));
        if let Some(ret) = &self.return_type {
            hint.push_str(" -> ");
            hint.push_str(ret);
        }
        hint
    }
}

/// Byte index of the `)` matching the `(` at `open`.
pub(crate) fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split a parameter list on commas outside brackets.
pub(crate) fn split_params(text: &str) -> Vec<String> {
    let mut params = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in text.chars() {
        match c {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                params.push(std::mem::take(&mut current).trim().to_string());
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    let last = current.trim();
    if !last.is_empty() || !params.is_empty() {
        params.push(last.to_string());
    }
    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::docs::{ApiDocs, ArgumentDoc, ClassDoc, MethodDoc};
    use crate::project::{QueueSink, WorkspaceConfig};

    fn workspace() -> Workspace {
        let mut node = ClassDoc {
            name: "Node".into(),
            inherits: Some("Object".into()),
            ..ClassDoc::default()
        };
        node.methods.push(MethodDoc {
            name: "add_child".into(),
            arguments: vec![
                ArgumentDoc {
                    name: "node".into(),
                    type_name: "Node".into(),
                    default_value: None,
                },
                ArgumentDoc {
                    name: "legible_unique_name".into(),
                    type_name: "bool".into(),
                    default_value: Some("false".into()),
                },
            ],
            ..MethodDoc::default()
        });
        let object = ClassDoc {
            name: "Object".into(),
            methods: vec![MethodDoc {
                name: "free".into(),
                ..MethodDoc::default()
            }],
            ..ClassDoc::default()
        };

        let dir = std::env::temp_dir().join("gdlsp-oracle-tests-nonexistent");
        let mut ws = Workspace::new(WorkspaceConfig::new(dir), Box::new(QueueSink::new()))
            .with_api_docs(ApiDocs {
                classes: vec![node, object],
            });
        // The root does not exist: the scan fails after the catalog is built.
        let _ = ws.initialize();
        ws
    }

    fn marked(text: &str, line: u32, character: u32) -> String {
        mark_cursor(text, Position::new(line, character))
    }

    #[test]
    fn test_mark_and_split_cursor() {
        let code = marked("ab\ncdé f", 1, 3);
        assert_eq!(code, "ab\ncdé\u{FFFF} f");
        let (clean, pos) = split_cursor(&code);
        assert_eq!(clean, "ab\ncdé f");
        assert_eq!(pos, Position::new(1, 3));
    }

    #[test]
    fn test_mark_cursor_clamps() {
        assert_eq!(marked("ab", 0, 10), "ab\u{FFFF}");
        assert_eq!(marked("ab", 4, 0), "ab\u{FFFF}");
    }

    #[test]
    fn test_lookup_script_member() {
        let ws = workspace();
        let text = "extends Node\nvar hp = 3\nfunc f():\n\treturn hp\n";
        let result = DocOracle.lookup_code(&ws, &marked(text, 3, 10), "hp", "/p/a.gd", false);
        assert_eq!(
            result,
            LookupResult::ScriptLocation {
                path: "/p/a.gd".into(),
                line: 1
            }
        );
    }

    #[test]
    fn test_lookup_inherited_native_member() {
        let ws = workspace();
        let text = "extends Node\nfunc f():\n\tfree()\n";
        let result = DocOracle.lookup_code(&ws, &marked(text, 2, 5), "free", "/p/a.gd", true);
        assert_eq!(
            result,
            LookupResult::NativeMember {
                class: "Object".into(),
                member: Some("free".into())
            }
        );
    }

    #[test]
    fn test_lookup_qualified_and_class() {
        let ws = workspace();
        let text = "func f():\n\tNode.add_child\n";
        let result = DocOracle.lookup_code(&ws, &marked(text, 1, 15), "add_child", "/p/a.gd", false);
        assert_eq!(
            result,
            LookupResult::NativeMember {
                class: "Node".into(),
                member: Some("add_child".into())
            }
        );

        let result = DocOracle.lookup_code(&ws, &marked(text, 1, 5), "Node", "/p/a.gd", false);
        assert_eq!(
            result,
            LookupResult::NativeMember {
                class: "Node".into(),
                member: None
            }
        );
        assert_eq!(
            DocOracle.lookup_code(&ws, &marked(text, 1, 5), "nothing", "/p/a.gd", false),
            LookupResult::NotFound
        );
    }

    #[test]
    fn test_call_hint_for_native_method() {
        let ws = workspace();
        let text = "extends Node\nfunc f():\n\tadd_child(x, \n";
        let hint = DocOracle.call_hint(&ws, &marked(text, 2, 14), "/p/a.gd");
        assert_eq!(
            hint,
            "add_child(node: Node, \u{FFFF}legible_unique_name: bool = false\u{FFFF}) -> void"
        );
    }

    #[test]
    fn test_call_hint_for_script_function() {
        let ws = workspace();
        let text = "func add(a, b):\n\treturn a + b\nfunc g():\n\tadd(\n";
        let hint = DocOracle.call_hint(&ws, &marked(text, 3, 5), "/p/a.gd");
        assert_eq!(hint, "add(\u{FFFF}a\u{FFFF}, b)");
    }

    #[test]
    fn test_call_hint_outside_call() {
        let ws = workspace();
        assert!(DocOracle.call_hint(&ws, &marked("var a = 1\n", 0, 4), "/p/a.gd").is_empty());
    }

    #[test]
    fn test_completion_candidates() {
        let ws = workspace();
        let text = "extends Node\nvar speed = 1\nfunc f():\n\tsp\n";
        let candidates = DocOracle.complete_code(&ws, &marked(text, 3, 3), "/p/a.gd");
        let find = |name: &str| candidates.iter().find(|c| c.display == name).map(|c| c.kind);
        assert_eq!(find("speed"), Some(CandidateKind::Variable));
        assert_eq!(find("f"), Some(CandidateKind::Function));
        assert_eq!(find("add_child"), Some(CandidateKind::Function));
        assert_eq!(find("free"), Some(CandidateKind::Function));
        assert_eq!(find("Node"), Some(CandidateKind::Class));
        assert_eq!(find("func"), Some(CandidateKind::Keyword));
    }

    #[test]
    fn test_completion_after_type_dot() {
        let ws = workspace();
        let text = "func f():\n\tNode.ad\n";
        let candidates = DocOracle.complete_code(&ws, &marked(text, 1, 8), "/p/a.gd");
        let names: Vec<_> = candidates.iter().map(|c| c.display.as_str()).collect();
        assert_eq!(names, vec!["add_child", "free"]);
    }

    #[test]
    fn test_signature_parse() {
        let sig = Signature::parse("static func make(a: int, b = f(1, 2)) -> Node").unwrap();
        assert_eq!(sig.name, "make");
        assert_eq!(sig.params, vec!["a: int", "b = f(1, 2)"]);
        assert_eq!(sig.return_type.as_deref(), Some("Node"));
        assert!(Signature::parse("var x").is_none());
        assert!(Signature::parse("ready()").unwrap().params.is_empty());
    }
}
