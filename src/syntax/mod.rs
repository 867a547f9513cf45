//! Script syntax: lexer, parser and the tagged-variant syntax tree.
//!
//! [`parse`] is the single entry point used by the rest of the crate. It
//! always returns a tree; a fatal error and any warnings travel alongside it
//! in [`ParseOutput`].

pub mod ast;
pub mod lexer;
mod parser;

pub use ast::{
    BlockNode, ClassNode, ConstantNode, FunctionNode, Node, NodeKind, Param, ParseError,
    ParseOutput, SignalNode, SyntaxTree, VariableNode, Warning, WarningCode,
};
pub use parser::parse;
