//! Syntax tree for GDScript class files.
//!
//! The tree is a tagged-variant AST: every declaration is a [`Node`] whose
//! [`NodeKind`] carries the per-kind payload. Consumers walk it by pattern
//! matching instead of downcasting.
//!
//! Line numbers stored here are **1-indexed**, as reported by the parser;
//! columns are 0-indexed characters. Conversion to protocol positions happens
//! in the symbol projection.

use smol_str::SmolStr;

/// Root of a parsed file: the implicit file class.
///
/// The file class starts at line 1, column 0 and ends at `end_line`, the
/// last non-blank line of the file.
#[derive(Clone, Debug, Default)]
pub struct SyntaxTree {
    pub class: ClassNode,
    pub end_line: u32,
}

/// A positioned syntax node.
#[derive(Clone, Debug)]
pub struct Node {
    /// 1-indexed line of the first token of the declaration.
    pub line: u32,
    /// 0-indexed column of the first token of the declaration.
    pub column: u32,
    /// 1-indexed last line of the declaration.
    pub end_line: u32,
    pub kind: NodeKind,
}

impl Node {
    /// Declared name, for named nodes.
    pub fn name(&self) -> Option<&SmolStr> {
        match &self.kind {
            NodeKind::Class(c) => c.name.as_ref(),
            NodeKind::Variable(v) => Some(&v.name),
            NodeKind::Signal(s) => Some(&s.name),
            NodeKind::Constant(c) => Some(&c.name),
            NodeKind::Function(f) => Some(&f.name),
        }
    }

    /// Leading comment block attached to the declaration.
    pub fn doc(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Class(c) => c.doc.as_deref(),
            NodeKind::Variable(v) => v.doc.as_deref(),
            NodeKind::Signal(s) => s.doc.as_deref(),
            NodeKind::Constant(c) => c.doc.as_deref(),
            NodeKind::Function(f) => f.doc.as_deref(),
        }
    }
}

/// Declaration payloads.
#[derive(Clone, Debug)]
pub enum NodeKind {
    Class(ClassNode),
    Variable(VariableNode),
    Signal(SignalNode),
    Constant(ConstantNode),
    Function(FunctionNode),
}

/// A class body: the file class or an inner `class` declaration.
#[derive(Clone, Debug, Default)]
pub struct ClassNode {
    /// `class Name` or `class_name Name`; `None` for an anonymous file class.
    pub name: Option<SmolStr>,
    pub name_column: u32,
    /// `extends` target: a class name or a quoted script path.
    pub extends: Option<SmolStr>,
    /// Set when the file registers itself as a global class via `class_name`.
    pub is_global: bool,
    pub doc: Option<String>,
    /// Members in declaration order.
    pub members: Vec<Node>,
}

impl ClassNode {
    pub fn variables(&self) -> impl Iterator<Item = (&Node, &VariableNode)> {
        self.members.iter().filter_map(|n| match &n.kind {
            NodeKind::Variable(v) => Some((n, v)),
            _ => None,
        })
    }

    pub fn signals(&self) -> impl Iterator<Item = (&Node, &SignalNode)> {
        self.members.iter().filter_map(|n| match &n.kind {
            NodeKind::Signal(s) => Some((n, s)),
            _ => None,
        })
    }

    /// Constants in declaration order.
    pub fn constants(&self) -> impl Iterator<Item = (&Node, &ConstantNode)> {
        self.members.iter().filter_map(|n| match &n.kind {
            NodeKind::Constant(c) => Some((n, c)),
            _ => None,
        })
    }

    /// Instance methods (`is_static == false`) or static functions.
    pub fn functions(&self, is_static: bool) -> impl Iterator<Item = (&Node, &FunctionNode)> {
        self.members.iter().filter_map(move |n| match &n.kind {
            NodeKind::Function(f) if f.is_static == is_static => Some((n, f)),
            _ => None,
        })
    }

    pub fn subclasses(&self) -> impl Iterator<Item = (&Node, &ClassNode)> {
        self.members.iter().filter_map(|n| match &n.kind {
            NodeKind::Class(c) => Some((n, c)),
            _ => None,
        })
    }

    /// Find a member declared directly in this class.
    pub fn member(&self, name: &str) -> Option<&Node> {
        self.members
            .iter()
            .find(|n| n.name().is_some_and(|n| n.as_str() == name))
    }
}

#[derive(Clone, Debug)]
pub struct VariableNode {
    pub name: SmolStr,
    pub name_column: u32,
    pub type_hint: Option<SmolStr>,
    /// Source text of the initializer.
    pub default: Option<String>,
    pub exported: bool,
    pub onready: bool,
    pub doc: Option<String>,
}

#[derive(Clone, Debug)]
pub struct SignalNode {
    pub name: SmolStr,
    pub name_column: u32,
    pub params: Vec<Param>,
    pub doc: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ConstantNode {
    pub name: SmolStr,
    pub name_column: u32,
    pub type_hint: Option<SmolStr>,
    /// Source text of the value expression.
    pub value: String,
    pub doc: Option<String>,
}

#[derive(Clone, Debug)]
pub struct FunctionNode {
    pub name: SmolStr,
    pub name_column: u32,
    pub is_static: bool,
    pub params: Vec<Param>,
    pub return_type: Option<SmolStr>,
    pub body: BlockNode,
    pub doc: Option<String>,
}

/// A function parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Param {
    pub name: SmolStr,
    pub type_hint: Option<SmolStr>,
    pub default: Option<String>,
}

impl Param {
    /// `name: Type = default`
    pub fn signature(&self) -> String {
        let mut out = self.name.to_string();
        if let Some(ty) = &self.type_hint {
            out.push_str(": ");
            out.push_str(ty);
        }
        if let Some(default) = &self.default {
            out.push_str(" = ");
            out.push_str(default);
        }
        out
    }
}

/// A statement block.
///
/// `line` is the 1-indexed line on which the block opens (the header line
/// ending in `:`); `end_line` is the 1-indexed line *after* the last
/// statement of the block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockNode {
    pub line: u32,
    pub end_line: u32,
}

/// Warning categories reported by the parser. The discriminant is the
/// category id published as the diagnostic code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum WarningCode {
    UnusedVariable = 2,
    UnusedArgument = 5,
    UnreachableCode = 6,
}

impl WarningCode {
    pub fn id(self) -> i32 {
        self as i32
    }
}

/// A non-fatal parser finding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Warning {
    pub code: WarningCode,
    /// 1-indexed line.
    pub line: u32,
    pub message: String,
}

/// The first fatal error of a parse.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParseError {
    pub message: String,
    /// 1-indexed line.
    pub line: u32,
    pub column: u32,
}

impl ParseError {
    pub fn new(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            message: message.into(),
            line,
            column,
        }
    }
}

/// Everything the parser reports for one source text.
///
/// The tree is always present; after an error it holds the declarations
/// parsed before the error.
#[derive(Clone, Debug)]
pub struct ParseOutput {
    pub tree: SyntaxTree,
    pub error: Option<ParseError>,
    pub warnings: Vec<Warning>,
}

impl ParseOutput {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
