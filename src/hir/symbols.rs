//! Symbol projection: syntax tree to positional symbol tree.
//!
//! Every class (the file class and each inner class) becomes a
//! [`SymbolKind::Class`] symbol whose children are, in order: variables,
//! signals, constants, instance methods, static functions, then inner
//! classes. Ranges are zero-based protocol ranges computed from the parser's
//! 1-indexed lines and the source text.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smol_str::SmolStr;

use crate::base::{Location, Position, Range, leading_whitespace_len, line_len, uri};
use crate::syntax::{BlockNode, ClassNode, FunctionNode, Node, Param, SyntaxTree};

// ============================================================================
// SYMBOL TYPES
// ============================================================================

/// Symbol kinds, numbered as in the protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SymbolKind {
    File,
    Class,
    Method,
    Property,
    Field,
    Enum,
    Function,
    Variable,
    Constant,
    Event,
}

impl SymbolKind {
    /// Convert to LSP symbol kind number.
    pub fn to_lsp(&self) -> u32 {
        match self {
            SymbolKind::File => 1,
            SymbolKind::Class => 5,
            SymbolKind::Method => 6,
            SymbolKind::Property => 7,
            SymbolKind::Field => 8,
            SymbolKind::Enum => 10,
            SymbolKind::Function => 12,
            SymbolKind::Variable => 13,
            SymbolKind::Constant => 14,
            SymbolKind::Event => 24,
        }
    }

    pub fn from_lsp(value: u32) -> Option<Self> {
        Some(match value {
            1 => SymbolKind::File,
            5 => SymbolKind::Class,
            6 => SymbolKind::Method,
            7 => SymbolKind::Property,
            8 => SymbolKind::Field,
            10 => SymbolKind::Enum,
            12 => SymbolKind::Function,
            13 => SymbolKind::Variable,
            14 => SymbolKind::Constant,
            24 => SymbolKind::Event,
            _ => return None,
        })
    }

    /// Whether symbols of this kind can be called.
    pub fn is_callable(&self) -> bool {
        matches!(self, SymbolKind::Method | SymbolKind::Function)
    }
}

impl Serialize for SymbolKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.to_lsp())
    }
}

impl<'de> Deserialize<'de> for SymbolKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = u32::deserialize(deserializer)?;
        SymbolKind::from_lsp(value)
            .ok_or_else(|| serde::de::Error::custom(format!("unsupported symbol kind {}", value)))
    }
}

/// A hierarchical document symbol.
///
/// Serializes as a protocol `DocumentSymbol`. The origin fields are kept
/// off the wire.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    pub name: String,
    pub detail: String,
    pub kind: SymbolKind,
    pub deprecated: bool,
    pub range: Range,
    pub selection_range: Range,
    #[serde(skip)]
    pub documentation: String,
    pub children: Vec<Symbol>,
    /// Script file that declares the symbol.
    #[serde(skip)]
    pub script_path: Option<String>,
    /// Built-in class that declares the symbol.
    #[serde(skip)]
    pub native_class: Option<SmolStr>,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            detail: String::new(),
            kind,
            deprecated: false,
            range: Range::default(),
            selection_range: Range::default(),
            documentation: String::new(),
            children: Vec::new(),
            script_path: None,
            native_class: None,
        }
    }

    /// Direct child by exact name.
    pub fn child(&self, name: &str) -> Option<&Symbol> {
        self.children.iter().find(|c| c.name == name)
    }

    /// First symbol, depth-first and excluding `self`, whose range starts
    /// on `line`.
    pub fn find_defined_at_line(&self, line: u32) -> Option<&Symbol> {
        self.children.iter().find_map(|child| {
            if child.range.start.line == line {
                Some(child)
            } else {
                child.find_defined_at_line(line)
            }
        })
    }

    /// Parameter children of callables are not separate declarations.
    fn declares_members(&self) -> bool {
        !self.kind.is_callable()
    }
}

/// A flattened symbol, as returned for workspace and document symbol
/// queries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInformation {
    pub name: String,
    pub kind: SymbolKind,
    pub deprecated: bool,
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
}

/// Flatten a symbol tree, parents before children.
///
/// Parameters of functions are left out.
pub fn flatten(root: &Symbol, uri: &str) -> Vec<SymbolInformation> {
    fn walk(symbol: &Symbol, container: Option<&str>, uri: &str, out: &mut Vec<SymbolInformation>) {
        out.push(SymbolInformation {
            name: symbol.name.clone(),
            kind: symbol.kind,
            deprecated: symbol.deprecated,
            location: Location {
                uri: uri.to_string(),
                range: symbol.range,
            },
            container_name: container.map(str::to_string),
        });
        if symbol.declares_members() {
            for child in &symbol.children {
                walk(child, Some(&symbol.name), uri, out);
            }
        }
    }

    let mut out = Vec::new();
    walk(root, None, uri, &mut out);
    out
}

/// Visit `(owner, member)` pairs for every member declared in the tree.
///
/// Inner classes are visited both as members of their owner and as owners
/// of their own members.
pub fn for_each_member<'a>(root: &'a Symbol, f: &mut impl FnMut(&'a Symbol, &'a Symbol)) {
    for child in &root.children {
        f(root, child);
        if child.kind == SymbolKind::Class {
            for_each_member(child, f);
        }
    }
}

// ============================================================================
// PROJECTION
// ============================================================================

/// Build the symbol tree for a parsed file.
pub fn project(tree: &SyntaxTree, lines: &[String], path: &str) -> Symbol {
    let projector = Projector { lines, path };
    let end_line = tree.end_line.max(1) - 1;
    let range = Range::new(Position::new(0, 0), Position::new(end_line, projector.len_of(end_line)));
    let name = tree
        .class
        .name
        .as_ref()
        .map_or_else(|| uri::file_name(path).to_string(), |n| n.to_string());

    let mut symbol = projector.class_symbol(&tree.class, name, range, Range::default());
    symbol.documentation = tree.class.doc.clone().unwrap_or_default();
    symbol
}

struct Projector<'a> {
    lines: &'a [String],
    path: &'a str,
}

impl Projector<'_> {
    fn line(&self, line: u32) -> &str {
        self.lines.get(line as usize).map_or("", String::as_str)
    }

    fn len_of(&self, line: u32) -> u32 {
        line_len(self.line(line))
    }

    fn last_line(&self) -> u32 {
        self.lines.len().saturating_sub(1) as u32
    }

    /// The declaration line from its first non-whitespace character to its
    /// end.
    fn declaration_line(&self, line: u32) -> Range {
        let text = self.line(line);
        Range::on_line(line, leading_whitespace_len(text), line_len(text))
    }

    fn name_range(&self, line: u32, column: u32, name: &str) -> Range {
        let end = (column + name.chars().count() as u32).min(self.len_of(line).max(column));
        Range::on_line(line, column, end)
    }

    fn symbol(&self, name: &str, kind: SymbolKind, detail: String, doc: Option<&str>) -> Symbol {
        Symbol {
            detail,
            documentation: doc.unwrap_or_default().to_string(),
            script_path: Some(self.path.to_string()),
            ..Symbol::new(name, kind)
        }
    }

    fn class_symbol(&self, class: &ClassNode, name: String, range: Range, selection: Range) -> Symbol {
        let detail = match &class.extends {
            Some(base) => format!("class {} extends {}", name, base),
            None => format!("class {}", name),
        };
        let mut symbol = self.symbol(&name, SymbolKind::Class, detail, class.doc.as_deref());
        symbol.range = range;
        symbol.selection_range = selection;

        for (node, var) in class.variables() {
            let line = node.line.saturating_sub(1);
            let mut detail = format!("var {}", var.name);
            if let Some(ty) = &var.type_hint {
                detail.push_str(": ");
                detail.push_str(ty);
            }
            if let Some(default) = &var.default {
                detail.push_str(" = ");
                detail.push_str(default);
            }
            let mut child = self.symbol(&var.name, SymbolKind::Variable, detail, var.doc.as_deref());
            child.range = self.declaration_line(line);
            child.selection_range = self.name_range(line, var.name_column, &var.name);
            symbol.children.push(child);
        }

        for (node, signal) in class.signals() {
            let line = node.line.saturating_sub(1);
            let detail = format!("signal {}({})", signal.name, param_list(&signal.params));
            let mut child = self.symbol(&signal.name, SymbolKind::Event, detail, signal.doc.as_deref());
            child.range = self.declaration_line(line);
            child.selection_range = self.name_range(line, signal.name_column, &signal.name);
            symbol.children.push(child);
        }

        for (node, constant) in class.constants() {
            let line = node.line.saturating_sub(1);
            let detail = match &constant.type_hint {
                Some(ty) => format!("const {}: {} = {}", constant.name, ty, constant.value),
                None => format!("const {} = {}", constant.name, constant.value),
            };
            let mut child = self.symbol(&constant.name, SymbolKind::Constant, detail, constant.doc.as_deref());
            child.range = self.declaration_line(line);
            child.selection_range = self.name_range(line, constant.name_column, &constant.name);
            symbol.children.push(child);
        }

        for (node, function) in class.functions(false) {
            symbol.children.push(self.function_symbol(node, function, SymbolKind::Method));
        }
        for (node, function) in class.functions(true) {
            symbol.children.push(self.function_symbol(node, function, SymbolKind::Function));
        }

        for (node, inner) in class.subclasses() {
            let line = node.line.saturating_sub(1);
            let end_line = node.end_line.saturating_sub(1).max(line);
            let range = Range::new(Position::new(line, node.column), Position::new(end_line, self.len_of(end_line)));
            let inner_name = inner.name.as_ref().map_or_else(String::new, |n| n.to_string());
            let selection = self.name_range(line, inner.name_column, &inner_name);
            symbol.children.push(self.class_symbol(inner, inner_name, range, selection));
        }

        symbol
    }

    fn function_symbol(&self, node: &Node, function: &FunctionNode, kind: SymbolKind) -> Symbol {
        let line = node.line.saturating_sub(1);
        let end_line = function_end_line(function.body).min(self.last_line()).max(line);

        let mut detail = if function.is_static {
            String::from("static func ")
        } else {
            String::from("func ")
        };
        detail.push_str(&function.name);
        detail.push('(');
        detail.push_str(&param_list(&function.params));
        detail.push(')');
        if let Some(ret) = &function.return_type {
            detail.push_str(" -> ");
            detail.push_str(ret);
        }

        let mut symbol = self.symbol(&function.name, kind, detail, function.doc.as_deref());
        symbol.range = Range::new(Position::new(line, node.column), Position::new(end_line, self.len_of(end_line)));
        symbol.selection_range = self.name_range(line, function.name_column, &function.name);

        let header = self.declaration_line(line);
        for param in &function.params {
            let mut child = self.symbol(
                &param.name,
                SymbolKind::Variable,
                param.type_hint.as_ref().map_or_else(String::new, |t| t.to_string()),
                None,
            );
            child.range = header;
            child.selection_range = header;
            symbol.children.push(child);
        }

        symbol
    }
}

/// Last line of a callable: `max(end_line - 2, line)` on the parser's block
/// lines, read as a zero-based line.
pub fn function_end_line(body: BlockNode) -> u32 {
    body.end_line.saturating_sub(2).max(body.line)
}

fn param_list(params: &[Param]) -> String {
    params.iter().map(Param::signature).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::split_lines;
    use crate::syntax::parse;
    use rstest::rstest;

    fn project_source(source: &str) -> Symbol {
        let output = parse(source);
        project(&output.tree, &split_lines(source), "/game/player.gd")
    }

    #[test]
    fn test_anonymous_class_named_after_file() {
        let root = project_source("var a = 1\nfunc foo():\n\tpass");
        assert_eq!(root.name, "player.gd");
        assert_eq!(root.kind, SymbolKind::Class);
        assert_eq!(root.children.len(), 2);

        let a = &root.children[0];
        assert_eq!(a.kind, SymbolKind::Variable);
        assert_eq!(a.range, Range::on_line(0, 0, 9));

        let foo = &root.children[1];
        assert_eq!(foo.kind, SymbolKind::Method);
        assert_eq!(foo.range.start, Position::new(1, 0));
        assert_eq!(foo.range.end.line, 2);
        assert_eq!(foo.selection_range, Range::on_line(1, 5, 8));
    }

    #[rstest]
    #[case(BlockNode { line: 10, end_line: 14 }, 12)]
    #[case(BlockNode { line: 10, end_line: 11 }, 10)]
    #[case(BlockNode { line: 3, end_line: 3 }, 3)]
    fn test_function_end_line(#[case] body: BlockNode, #[case] expected: u32) {
        assert_eq!(function_end_line(body), expected);
    }

    #[test]
    fn test_child_order_by_category() {
        let source = "\
static func make():
\tpass
func run():
\tpass
const B = 2
signal hit
var speed: float = 1.0
const A = 1
class Inner:
\tvar x
";
        let root = project_source(source);
        let order: Vec<_> = root.children.iter().map(|c| (c.name.as_str(), c.kind)).collect();
        assert_eq!(
            order,
            vec![
                ("speed", SymbolKind::Variable),
                ("hit", SymbolKind::Event),
                ("B", SymbolKind::Constant),
                ("A", SymbolKind::Constant),
                ("run", SymbolKind::Method),
                ("make", SymbolKind::Function),
                ("Inner", SymbolKind::Class),
            ]
        );
        assert_eq!(root.children[0].detail, "var speed: float = 1.0");
        assert_eq!(root.children[2].detail, "const B = 2");
        assert_eq!(root.children[5].detail, "static func make()");
        assert_eq!(root.children[6].children[0].name, "x");
    }

    #[test]
    fn test_selection_within_range() {
        let root = project_source("extends Node\n  \nvar   hp := 3\nfunc f(a: int, b = 2) -> void:\n\treturn a + b\n");
        fn check(symbol: &Symbol) {
            assert!(
                symbol.range.contains_range(&symbol.selection_range),
                "{}: {:?} not in {:?}",
                symbol.name,
                symbol.selection_range,
                symbol.range
            );
            symbol.children.iter().for_each(check);
        }
        root.children.iter().for_each(check);
        let f = root.child("f").unwrap();
        assert_eq!(f.detail, "func f(a: int, b = 2) -> void");
        assert_eq!(f.children.len(), 2);
        assert_eq!(f.children[0].detail, "int");
    }

    #[test]
    fn test_documentation_from_comments() {
        let root = project_source("# How fast.\nvar speed = 3\n");
        assert_eq!(root.children[0].documentation, "How fast.");
    }

    #[test]
    fn test_named_class_and_extends() {
        let root = project_source("extends KinematicBody2D\nclass_name Hero\n");
        assert_eq!(root.name, "Hero");
        assert_eq!(root.detail, "class Hero extends KinematicBody2D");
    }

    #[test]
    fn test_flatten_skips_parameters() {
        let root = project_source("func foo(x):\n\treturn x\n");
        let flat = flatten(&root, "file:///game/player.gd");
        let names: Vec<_> = flat.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["player.gd", "foo"]);
        assert_eq!(flat[1].container_name.as_deref(), Some("player.gd"));
    }

    #[test]
    fn test_find_defined_at_line() {
        let root = project_source("var a\nclass Inner:\n\tvar b\n");
        assert_eq!(root.find_defined_at_line(2).map(|s| s.name.as_str()), Some("b"));
        assert_eq!(root.find_defined_at_line(1).map(|s| s.name.as_str()), Some("Inner"));
        assert!(root.find_defined_at_line(7).is_none());
    }

    #[test]
    fn test_inline_function_range_is_clamped() {
        let root = project_source("func f(): return 1");
        let f = root.child("f").unwrap();
        assert_eq!(f.range.end.line, 0);
    }
}
