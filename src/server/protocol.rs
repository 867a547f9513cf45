//! Request dispatch: one JSON-RPC payload in, the payloads to send back out.
//!
//! [`LanguageProtocol`] owns the [`Workspace`]. Every handler runs to
//! completion before the next message is read, so the session needs no
//! locking. Diagnostics published while a message is handled are sent as
//! `textDocument/publishDiagnostics` notifications ahead of the response.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::jsonrpc::{Message, ProtocolError};
use super::lsp::{
    DidChangeParams, DidOpenParams, InitializeParams, InitializeResult, MESSAGE_TYPE_INFO,
    PublishDiagnosticsParams, ServerCapabilities, ShowMessageParams, TextDocumentParams,
    TextDocumentPositionParams, WorkspaceSymbolParams, method,
};
use crate::base::uri::file_uri_to_path;
use crate::ide::{self, CodeOracle};
use crate::project::{QueueSink, Workspace, WorkspaceConfig};

pub const INITIALIZED_MESSAGE: &str = "GDScript language server initialized";

/// What to send back after one incoming payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reply {
    /// Serialized messages, in send order.
    pub messages: Vec<String>,
    /// The client asked to end its session.
    pub close: bool,
}

pub struct LanguageProtocol {
    workspace: Workspace,
    diagnostics: QueueSink,
    oracle: Box<dyn CodeOracle + Send>,
    outbox: Vec<Value>,
    shutdown_requested: bool,
    close_requested: bool,
}

impl std::fmt::Debug for LanguageProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LanguageProtocol")
            .field("workspace", &self.workspace)
            .field("shutdown_requested", &self.shutdown_requested)
            .finish()
    }
}

impl LanguageProtocol {
    pub fn new(config: WorkspaceConfig, oracle: Box<dyn CodeOracle + Send>) -> Self {
        let diagnostics = QueueSink::new();
        let workspace = Workspace::new(config, Box::new(diagnostics.clone()));
        Self::with_workspace(workspace, diagnostics, oracle)
    }

    /// Wrap an existing workspace. `diagnostics` must be the sink the
    /// workspace publishes to.
    pub fn with_workspace(workspace: Workspace, diagnostics: QueueSink, oracle: Box<dyn CodeOracle + Send>) -> Self {
        Self {
            workspace,
            diagnostics,
            oracle,
            outbox: Vec::new(),
            shutdown_requested: false,
            close_requested: false,
        }
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn workspace_mut(&mut self) -> &mut Workspace {
        &mut self.workspace
    }

    pub fn shutdown_requested(&self) -> bool {
        self.shutdown_requested
    }

    /// Handle one payload: a single message or a batch.
    pub fn process_message(&mut self, text: &str) -> Reply {
        let mut responses = Vec::new();
        match serde_json::from_str::<Value>(text) {
            Err(err) => {
                let err = ProtocolError::Parse(err);
                tracing::warn!(error = %err, "unreadable message");
                responses.push(Message::error(None, &err).to_json());
            }
            Ok(Value::Array(batch)) if batch.is_empty() => {
                let err = ProtocolError::InvalidRequest("empty batch".into());
                responses.push(Message::error(None, &err).to_json());
            }
            Ok(Value::Array(batch)) => {
                let answers: Vec<Value> = batch.into_iter().filter_map(|item| self.process_value(item)).collect();
                if !answers.is_empty() {
                    responses.push(Value::Array(answers));
                }
            }
            Ok(value) => responses.extend(self.process_value(value)),
        }

        let mut reply = Reply {
            messages: Vec::new(),
            close: std::mem::take(&mut self.close_requested),
        };
        for value in self.outbox.drain(..).chain(responses) {
            reply.messages.push(value.to_string());
        }
        reply
    }

    fn process_value(&mut self, value: Value) -> Option<Value> {
        if value.get("method").is_none() && (value.get("result").is_some() || value.get("error").is_some()) {
            tracing::debug!(id = %value["id"], "ignoring client response");
            return None;
        }
        let message: Message = match serde_json::from_value(value) {
            Ok(message) => message,
            Err(err) => {
                let err = ProtocolError::InvalidRequest(err.to_string());
                tracing::warn!(error = %err, "rejected message");
                return Some(Message::error(None, &err).to_json());
            }
        };
        let id = message.id;
        let Some(method) = message.method else {
            let err = ProtocolError::InvalidRequest("missing method".into());
            return Some(Message::error(id, &err).to_json());
        };

        tracing::debug!(method = %method, id = ?id, "handling message");
        let result = self.dispatch(&method, message.params.unwrap_or(Value::Null));
        self.flush_diagnostics();

        match (id, result) {
            (None, Ok(_)) => None,
            (None, Err(err)) => {
                tracing::warn!(error = %err, "notification failed");
                None
            }
            (Some(id), Ok(result)) => Some(Message::response(Some(id), result).to_json()),
            (Some(id), Err(err)) => {
                tracing::warn!(error = %err, "request failed");
                Some(Message::error(Some(id), &err).to_json())
            }
        }
    }

    fn dispatch(&mut self, name: &str, params: Value) -> Result<Value, ProtocolError> {
        match name {
            method::INITIALIZE => {
                let params = if params.is_null() {
                    InitializeParams::default()
                } else {
                    parse_params(name, params)?
                };
                self.initialize(params);
                to_value(InitializeResult {
                    capabilities: ServerCapabilities::default(),
                })
            }
            method::INITIALIZED => {
                let params = ShowMessageParams {
                    kind: MESSAGE_TYPE_INFO,
                    message: INITIALIZED_MESSAGE.to_string(),
                };
                self.notify(method::SHOW_MESSAGE, &params)?;
                Ok(Value::Null)
            }
            method::SHUTDOWN => {
                self.shutdown_requested = true;
                Ok(Value::Null)
            }
            method::EXIT => {
                self.close_requested = true;
                Ok(Value::Null)
            }
            method::DID_OPEN => {
                let params: DidOpenParams = parse_params(name, params)?;
                let doc = params.text_document;
                self.sync_script_content(&doc.uri, &doc.text);
                Ok(Value::Null)
            }
            method::DID_CHANGE => {
                let params: DidChangeParams = parse_params(name, params)?;
                if let Some(change) = params.content_changes.last() {
                    self.sync_script_content(&params.text_document.uri, &change.text);
                }
                Ok(Value::Null)
            }
            method::DID_CLOSE => {
                let _: TextDocumentParams = parse_params(name, params)?;
                Ok(Value::Null)
            }
            method::DOCUMENT_SYMBOL => {
                let params: TextDocumentParams = parse_params(name, params)?;
                to_value(ide::document_symbols(&mut self.workspace, &params.text_document.uri))
            }
            method::COMPLETION => {
                let params: TextDocumentPositionParams = parse_params(name, params)?;
                let pos = params.document_position();
                to_value(ide::completion(&mut self.workspace, self.oracle.as_ref(), &pos))
            }
            method::DEFINITION => {
                let params: TextDocumentPositionParams = parse_params(name, params)?;
                let pos = params.document_position();
                to_value(ide::definition(&mut self.workspace, self.oracle.as_ref(), &pos))
            }
            method::SIGNATURE_HELP => {
                let params: TextDocumentPositionParams = parse_params(name, params)?;
                let pos = params.document_position();
                to_value(ide::signature_help(&mut self.workspace, self.oracle.as_ref(), &pos))
            }
            method::WORKSPACE_SYMBOL => {
                let params: WorkspaceSymbolParams = parse_params(name, params)?;
                to_value(ide::workspace_symbols(&self.workspace, &params.query))
            }
            method::HOVER | method::DOCUMENT_LINK => Ok(Value::Null),
            method::FOLDING_RANGE | method::CODE_LENS | method::COLOR_PRESENTATION => Ok(Value::Array(Vec::new())),
            _ => Err(ProtocolError::MethodNotFound(name.to_string())),
        }
    }

    fn initialize(&mut self, params: InitializeParams) {
        let root = params
            .root_uri
            .as_deref()
            .map(file_uri_to_path)
            .or(params.root_path);
        if let Some(root) = root.filter(|r| !r.is_empty()) {
            self.workspace.set_root(root);
        }
        if let Err(err) = self.workspace.initialize() {
            tracing::warn!(error = %err, "workspace scan failed");
        }
    }

    fn sync_script_content(&mut self, uri: &str, text: &str) {
        let path = file_uri_to_path(uri);
        if let Err(err) = self.workspace.parse_script(&path, text) {
            tracing::debug!(error = %err, "document has errors");
        }
    }

    fn notify(&mut self, name: &str, params: &impl Serialize) -> Result<(), ProtocolError> {
        let params = to_value(params)?;
        self.outbox.push(Message::notification(name, params).to_json());
        Ok(())
    }

    fn flush_diagnostics(&mut self) {
        for published in self.diagnostics.drain() {
            let params = PublishDiagnosticsParams {
                uri: &published.uri,
                diagnostics: &published.diagnostics,
            };
            if let Err(err) = self.notify(method::PUBLISH_DIAGNOSTICS, &params) {
                tracing::warn!(error = %err, "dropping diagnostics");
            }
        }
    }
}

fn parse_params<T: DeserializeOwned>(method: &str, params: Value) -> Result<T, ProtocolError> {
    serde_json::from_value(params).map_err(|source| ProtocolError::InvalidParams {
        method: method.to_string(),
        source,
    })
}

fn to_value(value: impl Serialize) -> Result<Value, ProtocolError> {
    serde_json::to_value(value).map_err(|err| ProtocolError::Internal(err.to_string()))
}
