//! DevTools websocket: request/response correlation and event fan-out.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use kiosk_common::BrowserError;

use super::protocol::{Event, Incoming, Request};

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, BrowserError>>>>>;

/// A live DevTools connection. Responses are matched to requests by id;
/// everything else is pushed to the event receiver returned by `connect`.
pub(crate) struct Connection {
    outgoing: mpsc::UnboundedSender<WsMessage>,
    pending: Pending,
    next_id: AtomicU64,
    closed: CancellationToken,
}

impl Connection {
    pub(crate) async fn connect(
        url: &str,
    ) -> Result<(Self, mpsc::UnboundedReceiver<Event>), BrowserError> {
        let (ws, _) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| BrowserError::Transport(e.to_string()))?;
        let (mut sink, mut stream) = ws.split();

        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<WsMessage>();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let closed = CancellationToken::new();

        // Writer: the only task touching the sink.
        tokio::spawn(async move {
            while let Some(msg) = outgoing_rx.recv().await {
                let is_close = matches!(msg, WsMessage::Close(_));
                if let Err(e) = sink.send(msg).await {
                    debug!(error = %e, "devtools write failed");
                    break;
                }
                if is_close {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        // Reader: routes frames until the socket goes away.
        let reader_pending = Arc::clone(&pending);
        let reader_closed = closed.clone();
        tokio::spawn(async move {
            while let Some(frame) = stream.next().await {
                match frame {
                    Ok(WsMessage::Text(text)) => route(&text, &reader_pending, &event_tx),
                    Ok(WsMessage::Close(_)) => break,
                    Err(e) => {
                        debug!(error = %e, "devtools websocket error");
                        break;
                    }
                    _ => {}
                }
            }
            reader_closed.cancel();
            fail_pending(&reader_pending);
            debug!("devtools connection closed");
        });

        Ok((
            Self {
                outgoing,
                pending,
                next_id: AtomicU64::new(1),
                closed,
            },
            event_rx,
        ))
    }

    /// Send `method` and wait for its response.
    pub(crate) async fn call(
        &self,
        session_id: Option<&str>,
        method: &str,
        params: Value,
    ) -> Result<Value, BrowserError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let text = serde_json::to_string(&Request {
            id,
            method,
            params,
            session_id,
        })
        .map_err(|e| BrowserError::Decode(e.to_string()))?;

        let (tx, rx) = oneshot::channel();
        if let Ok(mut pending) = self.pending.lock() {
            pending.insert(id, tx);
        }
        // The reader cancels before draining, so anything inserted before
        // this check is either drained or rejected here.
        if self.closed.is_cancelled() || self.outgoing.send(WsMessage::Text(text.into())).is_err() {
            self.forget(id);
            return Err(BrowserError::Closed);
        }
        trace!(id, method, "devtools request");

        rx.await.unwrap_or(Err(BrowserError::Closed))
    }

    /// Ask the writer to close the socket.
    pub(crate) fn close(&self) {
        let _ = self.outgoing.send(WsMessage::Close(None));
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    fn forget(&self, id: u64) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(&id);
        }
    }
}

fn route(text: &str, pending: &Pending, events: &mpsc::UnboundedSender<Event>) {
    let incoming: Incoming = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            warn!(error = %e, len = text.len(), "unrecognized devtools frame");
            return;
        }
    };

    if let Some(id) = incoming.id {
        let waiter = pending.lock().ok().and_then(|mut p| p.remove(&id));
        let Some(waiter) = waiter else {
            trace!(id, "response without a waiter");
            return;
        };
        let outcome = match incoming.error {
            Some(err) => Err(err.into()),
            None => Ok(incoming.result.unwrap_or(Value::Null)),
        };
        let _ = waiter.send(outcome);
    } else if let Some(method) = incoming.method {
        let _ = events.send(Event {
            method,
            params: incoming.params.unwrap_or(Value::Null),
            session_id: incoming.session_id,
        });
    }
}

fn fail_pending(pending: &Pending) {
    let waiters: Vec<_> = match pending.lock() {
        Ok(mut p) => p.drain().map(|(_, tx)| tx).collect(),
        Err(_) => return,
    };
    for waiter in waiters {
        let _ = waiter.send(Err(BrowserError::Closed));
    }
}
