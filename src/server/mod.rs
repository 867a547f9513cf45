//! Protocol server: JSON-RPC dispatch and the network transports.
//!
//! - [`protocol`] - request handlers over one [`Workspace`](crate::project::Workspace)
//! - [`codec`] - `Content-Length` framing
//! - [`transport`] - TCP / WebSocket sessions feeding one dispatcher
//! - [`config`] - command-line options

pub mod codec;
pub mod config;
pub mod jsonrpc;
pub mod lsp;
pub mod protocol;
pub mod transport;

use tokio::sync::mpsc;

pub use config::{ServerConfig, Transport};
pub use jsonrpc::ProtocolError;
pub use protocol::{LanguageProtocol, Reply};
pub use transport::{ClientEvent, ClientRegistry, TransportError};

use crate::ide::DocOracle;

/// Listen and serve until accepting a connection fails.
pub async fn serve(config: ServerConfig) -> Result<(), TransportError> {
    let protocol = LanguageProtocol::new(config.workspace_config(), Box::new(DocOracle::new()));
    let registry = ClientRegistry::new();
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    // Runs until the last event sender is dropped.
    let _dispatcher = transport::spawn_dispatcher(protocol, events_rx, registry.clone());

    let addr = config.socket_addr();
    let listener = transport::bind(&addr).await?;
    tracing::info!(%addr, transport = ?config.transport, "language server listening");

    transport::accept_loop(listener, config.transport, events_tx, registry).await
}
