//! Transport client: one WebSocket connection to the relay plus a typed
//! publish/subscribe surface for inbound messages.

use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::util::emitter::{Emitter, Event, ListenerId};
use crate::ws::protocol::{ClientMsg, ProtocolError, ServerMsg};

/// Transport failures
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Client must be connected before sending")]
    NotConnected,

    #[error("Client is already connected")]
    AlreadyConnected,

    #[error("Connection failed: {0}")]
    Connect(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("Failed to encode message: {0}")]
    Encode(#[from] ProtocolError),

    #[error("Connection closed")]
    Closed,
}

struct Inner {
    events: Emitter<ServerMsg>,
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

/// Cloneable handle; clones share the connection and subscriptions
#[derive(Clone)]
pub struct TransportClient {
    inner: Arc<Inner>,
}

impl Default for TransportClient {
    fn default() -> Self {
        Self::new()
    }
}

impl TransportClient {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                events: Emitter::new(),
                outbound: Mutex::new(None),
                tasks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Open the connection. Resolves once the handshake completes; an error
    /// before that point fails the call and nothing is retried.
    pub async fn connect(&self, url: &str) -> Result<(), ClientError> {
        if self.is_connected() {
            return Err(ClientError::AlreadyConnected);
        }

        let (ws_stream, _) = tokio_tungstenite::connect_async(url).await?;
        let (mut ws_sink, mut ws_stream) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();

        // Writer task: send() -> WebSocket
        let writer = tokio::spawn(async move {
            while let Some(text) = outbound_rx.recv().await {
                if let Err(e) = ws_sink.send(Message::Text(text)).await {
                    error!(error = %e, "WebSocket send failed");
                    break;
                }
            }
        });

        // Reader task: WebSocket -> subscribers, in arrival order
        let inner = self.inner.clone();
        let reader = tokio::spawn(async move {
            while let Some(result) = ws_stream.next().await {
                match result {
                    Ok(Message::Text(text)) => match ServerMsg::decode(&text) {
                        Ok(msg) => {
                            debug!(message = msg.name(), "Received");
                            inner.events.emit(&msg);
                        }
                        Err(e) => warn!(error = %e, "Failed to parse server message"),
                    },
                    Ok(Message::Close(_)) => {
                        info!("Server closed the connection");
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        error!(error = %e, "WebSocket error");
                        break;
                    }
                }
            }
            inner.outbound.lock().take();
            // Pending waiters observe the closed connection through their
            // dropped senders.
            inner.events.clear();
        });

        *self.inner.outbound.lock() = Some(outbound_tx);
        self.inner.tasks.lock().extend([writer, reader]);
        info!(url = %url, "Connected to relay");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.inner.outbound.lock().is_some()
    }

    /// Encode and queue a message for sending
    pub fn send(&self, msg: &ClientMsg) -> Result<(), ClientError> {
        let outbound = self.inner.outbound.lock();
        let tx = outbound.as_ref().ok_or(ClientError::NotConnected)?;
        let text = msg.encode()?;
        tx.send(text).map_err(|_| ClientError::Closed)
    }

    /// Subscribe to every message named `name`
    pub fn on<F>(&self, name: &'static str, handler: F) -> ListenerId
    where
        F: FnMut(&ServerMsg) + Send + 'static,
    {
        self.inner.events.on(name, handler)
    }

    /// Subscribe to the next message named `name`
    pub fn once<F>(&self, name: &'static str, handler: F) -> ListenerId
    where
        F: FnOnce(&ServerMsg) + Send + 'static,
    {
        self.inner.events.once(name, handler)
    }

    /// Subscribe to every inbound message
    pub fn on_any<F>(&self, handler: F) -> ListenerId
    where
        F: FnMut(&ServerMsg) + Send + 'static,
    {
        self.inner.events.on_any(handler)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.events.off(id)
    }

    /// Resolve with the first inbound message whose name is in `names`.
    /// The receiver errors if the connection closes first.
    pub fn wait_for(&self, names: &'static [&'static str]) -> oneshot::Receiver<ServerMsg> {
        struct Waiter {
            tx: Option<oneshot::Sender<ServerMsg>>,
            id: Option<ListenerId>,
        }

        let (tx, rx) = oneshot::channel();
        let waiter = Arc::new(Mutex::new(Waiter {
            tx: Some(tx),
            id: None,
        }));

        let events = self.inner.events.clone();
        let w = waiter.clone();
        let id = self.inner.events.on_any(move |msg| {
            if !names.contains(&msg.name()) {
                return;
            }
            let mut waiter = w.lock();
            if let Some(tx) = waiter.tx.take() {
                let _ = tx.send(msg.clone());
            }
            if let Some(id) = waiter.id.take() {
                events.off(id);
            }
        });

        let mut waiter = waiter.lock();
        if waiter.tx.is_some() {
            waiter.id = Some(id);
        } else {
            self.inner.events.off(id);
        }
        rx
    }

    /// Close the connection and stop the background tasks
    pub fn close(&self) {
        self.inner.outbound.lock().take();
        for task in self.inner.tasks.lock().drain(..) {
            task.abort();
        }
        self.inner.events.clear();
    }
}
