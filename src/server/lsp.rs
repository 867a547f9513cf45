//! Protocol request and notification payloads.
//!
//! Only the fields the server reads or writes are modelled; unknown fields
//! are ignored on input.

use serde::{Deserialize, Serialize};

use crate::base::Position;
use crate::hir::Diagnostic;
use crate::ide::DocumentPosition;

pub mod method {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "initialized";
    pub const SHUTDOWN: &str = "shutdown";
    pub const EXIT: &str = "exit";
    pub const DID_OPEN: &str = "textDocument/didOpen";
    pub const DID_CHANGE: &str = "textDocument/didChange";
    pub const DID_CLOSE: &str = "textDocument/didClose";
    pub const DOCUMENT_SYMBOL: &str = "textDocument/documentSymbol";
    pub const COMPLETION: &str = "textDocument/completion";
    pub const HOVER: &str = "textDocument/hover";
    pub const FOLDING_RANGE: &str = "textDocument/foldingRange";
    pub const CODE_LENS: &str = "textDocument/codeLens";
    pub const DOCUMENT_LINK: &str = "textDocument/documentLink";
    pub const COLOR_PRESENTATION: &str = "textDocument/colorPresentation";
    pub const DEFINITION: &str = "textDocument/definition";
    pub const SIGNATURE_HELP: &str = "textDocument/signatureHelp";
    pub const WORKSPACE_SYMBOL: &str = "workspace/symbol";
    pub const PUBLISH_DIAGNOSTICS: &str = "textDocument/publishDiagnostics";
    pub const SHOW_MESSAGE: &str = "window/showMessage";
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default)]
    pub root_uri: Option<String>,
    #[serde(default)]
    pub root_path: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct InitializeResult {
    pub capabilities: ServerCapabilities,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerCapabilities {
    pub text_document_sync: TextDocumentSyncOptions,
    pub hover_provider: bool,
    pub completion_provider: CompletionOptions,
    pub signature_help_provider: SignatureHelpOptions,
    pub definition_provider: bool,
    pub document_symbol_provider: bool,
    pub workspace_symbol_provider: bool,
    pub folding_range_provider: bool,
    pub code_lens_provider: CodeLensOptions,
    pub document_link_provider: DocumentLinkOptions,
    pub color_provider: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentSyncOptions {
    pub open_close: bool,
    /// 1 = full text on every change.
    pub change: u32,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOptions {
    pub resolve_provider: bool,
    pub trigger_characters: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureHelpOptions {
    pub trigger_characters: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeLensOptions {
    pub resolve_provider: bool,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentLinkOptions {
    pub resolve_provider: bool,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            text_document_sync: TextDocumentSyncOptions {
                open_close: true,
                change: 1,
            },
            hover_provider: false,
            completion_provider: CompletionOptions {
                resolve_provider: false,
                trigger_characters: vec![".".into(), "$".into(), "'".into(), "\"".into()],
            },
            signature_help_provider: SignatureHelpOptions {
                trigger_characters: vec!["(".into(), ",".into()],
            },
            definition_provider: true,
            document_symbol_provider: true,
            workspace_symbol_provider: true,
            folding_range_provider: false,
            code_lens_provider: CodeLensOptions {
                resolve_provider: false,
            },
            document_link_provider: DocumentLinkOptions {
                resolve_provider: false,
            },
            color_provider: false,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct TextDocumentIdentifier {
    pub uri: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentItem {
    pub uri: String,
    #[serde(default)]
    pub language_id: String,
    #[serde(default)]
    pub version: i64,
    pub text: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidOpenParams {
    pub text_document: TextDocumentItem,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ContentChange {
    pub text: String,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DidChangeParams {
    pub text_document: TextDocumentIdentifier,
    pub content_changes: Vec<ContentChange>,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentParams {
    pub text_document: TextDocumentIdentifier,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentPositionParams {
    pub text_document: TextDocumentIdentifier,
    pub position: Position,
}

impl TextDocumentPositionParams {
    pub fn document_position(&self) -> DocumentPosition {
        DocumentPosition::new(self.text_document.uri.clone(), self.position)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct WorkspaceSymbolParams {
    #[serde(default)]
    pub query: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct PublishDiagnosticsParams<'a> {
    pub uri: &'a str,
    pub diagnostics: &'a [Diagnostic],
}

/// `window/showMessage` type for informational messages.
pub const MESSAGE_TYPE_INFO: u32 = 3;

#[derive(Clone, Debug, Serialize)]
pub struct ShowMessageParams {
    #[serde(rename = "type")]
    pub kind: u32,
    pub message: String,
}
