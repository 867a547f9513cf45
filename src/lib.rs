//! # gdlsp
//!
//! Language server for GDScript: a workspace session over parsed scripts,
//! a positional symbol model, identifier resolution and a JSON-RPC server.
//!
//! ## Module Structure (dependency order)
//!
//! ```text
//! server  → JSON-RPC dispatch, wire types, TCP / WebSocket transports
//!   ↓
//! ide     → document/workspace symbols, completion, resolution, signature help
//!   ↓
//! project → workspace session (parse caches, flat index), loaders
//!   ↓
//! hir     → document records, symbol projection, diagnostics, native catalog
//!   ↓
//! syntax  → lexer + indentation-aware parser, tagged-variant tree
//!   ↓
//! base    → positions, ranges, line helpers, URI ↔ path
//! ```

/// Foundation types: positions, ranges, URIs
pub mod base;

/// Script lexer and parser
pub mod syntax;

/// Symbols, diagnostics and the native catalog
pub mod hir;

/// Workspace session
pub mod project;

/// Request-level features
pub mod ide;

/// Protocol server and transports
pub mod server;

pub use base::{Location, Position, Range};
pub use hir::{Diagnostic, Symbol, SymbolKind};
pub use project::{Workspace, WorkspaceConfig};
