//! Network transports and the single dispatcher.
//!
//! Each connection runs a reader and a writer task. Readers push decoded
//! payloads into one channel; the dispatcher drains it on a blocking thread
//! and owns the [`LanguageProtocol`], so requests from all clients are
//! handled one at a time in arrival order. Replies travel back through the
//! client's outbox, looked up in the [`ClientRegistry`].

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::codec::Framed;

use super::codec::{self, LspCodec};
use super::config::Transport;
use super::protocol::LanguageProtocol;

pub type ClientId = u64;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("accept failed: {0}")]
    Accept(#[from] std::io::Error),
}

/// Events delivered to the dispatcher.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientEvent {
    Connected(ClientId),
    Message { client: ClientId, text: String },
    Disconnected(ClientId),
}

/// Queued for a connection's writer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outgoing {
    Payload(String),
    Close,
}

/// Outboxes of the connected clients.
#[derive(Clone, Debug, Default)]
pub struct ClientRegistry {
    clients: Arc<Mutex<FxHashMap<ClientId, mpsc::UnboundedSender<Outgoing>>>>,
    next_id: Arc<AtomicU64>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, outbox: mpsc::UnboundedSender<Outgoing>) -> ClientId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        self.clients.lock().insert(id, outbox);
        id
    }

    pub fn unregister(&self, id: ClientId) {
        self.clients.lock().remove(&id);
    }

    /// Queue a message for `id`. False when the client is gone.
    pub fn send(&self, id: ClientId, message: Outgoing) -> bool {
        match self.clients.lock().get(&id) {
            Some(outbox) => outbox.send(message).is_ok(),
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Run the dispatcher until every event sender is dropped.
pub fn spawn_dispatcher(
    mut protocol: LanguageProtocol,
    mut events: mpsc::UnboundedReceiver<ClientEvent>,
    registry: ClientRegistry,
) -> JoinHandle<LanguageProtocol> {
    tokio::task::spawn_blocking(move || {
        while let Some(event) = events.blocking_recv() {
            match event {
                ClientEvent::Connected(id) => tracing::info!(client = id, "client connected"),
                ClientEvent::Message { client, text } => {
                    let reply = protocol.process_message(&text);
                    for message in reply.messages {
                        if !registry.send(client, Outgoing::Payload(message)) {
                            tracing::debug!(client, "client gone, dropping reply");
                            break;
                        }
                    }
                    if reply.close {
                        registry.send(client, Outgoing::Close);
                    }
                }
                ClientEvent::Disconnected(id) => {
                    registry.unregister(id);
                    tracing::info!(client = id, "client disconnected");
                }
            }
        }
        protocol
    })
}

/// Bind `addr`.
pub async fn bind(addr: &str) -> Result<TcpListener, TransportError> {
    TcpListener::bind(addr).await.map_err(|source| TransportError::Bind {
        addr: addr.to_string(),
        source,
    })
}

/// Accept connections forever, one session task per client.
pub async fn accept_loop(
    listener: TcpListener,
    transport: Transport,
    events: mpsc::UnboundedSender<ClientEvent>,
    registry: ClientRegistry,
) -> Result<(), TransportError> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
        let id = registry.register(outbox_tx);
        tracing::debug!(client = id, %peer, ?transport, "accepted connection");

        let events = events.clone();
        match transport {
            Transport::Tcp => tokio::spawn(tcp_session(id, stream, outbox_rx, events)),
            Transport::Websocket => tokio::spawn(websocket_session(id, stream, outbox_rx, events)),
        };
    }
}

async fn tcp_session(
    id: ClientId,
    stream: TcpStream,
    mut outbox: mpsc::UnboundedReceiver<Outgoing>,
    events: mpsc::UnboundedSender<ClientEvent>,
) {
    let (mut sink, mut source) = Framed::new(stream, LspCodec::new()).split();
    let _ = events.send(ClientEvent::Connected(id));

    tokio::spawn(async move {
        while let Some(out) = outbox.recv().await {
            match out {
                Outgoing::Payload(text) => {
                    if let Err(err) = sink.send(text).await {
                        tracing::warn!(client = id, error = %err, "write failed");
                        break;
                    }
                }
                Outgoing::Close => break,
            }
        }
        let _ = sink.close().await;
    });

    while let Some(frame) = source.next().await {
        match frame {
            Ok(text) => {
                if events.send(ClientEvent::Message { client: id, text }).is_err() {
                    break;
                }
            }
            Err(err) => {
                tracing::warn!(client = id, error = %err, "bad frame, closing");
                break;
            }
        }
    }
    let _ = events.send(ClientEvent::Disconnected(id));
}

async fn websocket_session(
    id: ClientId,
    stream: TcpStream,
    mut outbox: mpsc::UnboundedReceiver<Outgoing>,
    events: mpsc::UnboundedSender<ClientEvent>,
) {
    let ws = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws) => ws,
        Err(err) => {
            tracing::warn!(client = id, error = %err, "websocket handshake failed");
            let _ = events.send(ClientEvent::Disconnected(id));
            return;
        }
    };
    let (mut sink, mut source) = ws.split();
    let _ = events.send(ClientEvent::Connected(id));

    tokio::spawn(async move {
        while let Some(out) = outbox.recv().await {
            let message = match out {
                Outgoing::Payload(text) => WsMessage::Text(codec::frame(&text)),
                Outgoing::Close => WsMessage::Close(None),
            };
            let closing = matches!(message, WsMessage::Close(_));
            if let Err(err) = sink.send(message).await {
                tracing::warn!(client = id, error = %err, "write failed");
                break;
            }
            if closing {
                break;
            }
        }
    });

    let forward = |text: &str| match codec::unframe(text) {
        Some(body) => events
            .send(ClientEvent::Message {
                client: id,
                text: body.to_string(),
            })
            .is_ok(),
        None => true,
    };

    while let Some(message) = source.next().await {
        let keep_going = match message {
            Ok(WsMessage::Text(text)) => forward(&text),
            Ok(WsMessage::Binary(bytes)) => match String::from_utf8(bytes) {
                Ok(text) => forward(&text),
                Err(_) => {
                    tracing::warn!(client = id, "ignoring non UTF-8 frame");
                    true
                }
            },
            Ok(WsMessage::Close(_)) => false,
            Ok(_) => true,
            Err(err) => {
                tracing::warn!(client = id, error = %err, "websocket error");
                false
            }
        };
        if !keep_going {
            break;
        }
    }
    let _ = events.send(ClientEvent::Disconnected(id));
}
