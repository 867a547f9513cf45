//! High-level IR: documents, symbols and indexes.
//!
//! This layer turns parser output into the positional symbol model the
//! protocol speaks:
//!
//! - [`DocumentRecord`] - one parse of one file (tree, lines, diagnostics, symbols)
//! - [`symbols`] - projection of syntax trees into [`Symbol`] trees, flattening
//! - [`NativeCatalog`] - built-in classes from API documentation
//! - [`FlatIndex`] - qualified-name index across scripts and built-ins

pub mod diagnostics;
pub mod docs;
mod document;
mod index;
mod native;
pub mod symbols;

pub use diagnostics::{Diagnostic, DiagnosticCollector, RelatedInfo, Severity};
pub use docs::ApiDocs;
pub use document::DocumentRecord;
pub use index::{FlatEntry, FlatIndex};
pub use native::{NativeCatalog, NativeClass, bbcode_to_markdown};
pub use symbols::{Symbol, SymbolInformation, SymbolKind, flatten};
