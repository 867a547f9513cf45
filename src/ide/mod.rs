//! IDE features: request-level APIs for the protocol handlers.
//!
//! Each function here answers one kind of request against a [`Workspace`].
//! Position queries go through a [`CodeOracle`]; [`DocOracle`] is the
//! offline implementation.
//!
//! ## Usage
//!
//! ```ignore
//! use gdlsp::ide::{DocOracle, DocumentPosition, resolve_symbol};
//!
//! let pos = DocumentPosition::new("file:///game/player.gd", Position::new(4, 8));
//! let symbol = resolve_symbol(&mut workspace, &DocOracle, &pos, None, false);
//! ```
//!
//! [`Workspace`]: crate::project::Workspace

mod completion;
pub mod oracle;
mod resolve;
mod signature_help;
mod symbols;

pub use completion::{CompletionItem, CompletionList, MAX_COMPLETION_ITEMS, completion, item_kind};
pub use oracle::{
    CURSOR_MARKER, CandidateKind, CodeOracle, CompletionCandidate, DocOracle, LookupResult, mark_cursor,
};
pub use resolve::{
    CallContext, DocumentPosition, call_context_at, definition, identifier_at, resolve_related_symbols,
    resolve_symbol,
};
pub use signature_help::{CallHint, ParameterInformation, SignatureHelp, SignatureInformation, signature_help};
pub use symbols::{document_symbols, is_subsequence, workspace_symbols};
