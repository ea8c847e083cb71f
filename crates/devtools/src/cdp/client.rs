//! CDP Client - The Core Communication Layer
//!
//! Design decisions:
//! 1. One WebSocket per target, owned by exactly one command
//! 2. Request/response matching via ID, never via arrival order
//! 3. Every call is bounded by a timeout
//! 4. Fail fast - no retries, no queuing. Let the caller decide.

use dashmap::{DashMap, DashSet};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::ORIGIN;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use url::Url;

use super::protocol::*;
use crate::error::{CDPError, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Key: request_id, Value: oneshot sender for the routed reply
type PendingMap = Arc<DashMap<RequestId, oneshot::Sender<Result<CDPResponse>>>>;

/// CDP Client - manages a single WebSocket connection to one target
pub struct CDPClient {
    endpoint: String,

    /// Monotonic request ID counter
    next_id: AtomicU64,

    /// Requests waiting for their reply
    pending: PendingMap,

    /// Requests already answered with an error (timeout, stray or malformed
    /// frame); a late reply for these is dropped quietly
    abandoned: Arc<DashSet<RequestId>>,

    /// Set by the reader task once the socket is gone
    closed: Arc<AtomicBool>,

    /// WebSocket write half
    ws_sink: Mutex<WsSink>,

    call_timeout: Duration,

    reader: JoinHandle<()>,
}

impl CDPClient {
    /// Connect to a target's `webSocketDebuggerUrl`.
    ///
    /// `timeout` bounds the handshake and, later, every call.
    pub async fn connect(ws_url: &str, timeout: Duration) -> Result<Self> {
        let connection_error = |reason: String| CDPError::Connection {
            endpoint: ws_url.to_string(),
            reason,
        };

        let parsed = Url::parse(ws_url).map_err(|e| connection_error(e.to_string()))?;
        if !matches!(parsed.scheme(), "ws" | "wss") {
            return Err(connection_error(format!(
                "unsupported scheme `{}`",
                parsed.scheme()
            )));
        }

        let mut request = ws_url
            .into_client_request()
            .map_err(|e| connection_error(e.to_string()))?;
        // DevTools refuses handshakes from origins that are not allow-listed.
        request.headers_mut().remove(ORIGIN);

        let (ws_stream, _) = tokio::time::timeout(timeout, connect_async(request))
            .await
            .map_err(|_| CDPError::Timeout(timeout))?
            .map_err(|e| connection_error(e.to_string()))?;
        let (sink, stream) = ws_stream.split();

        let pending: PendingMap = Arc::new(DashMap::new());
        let abandoned = Arc::new(DashSet::new());
        let closed = Arc::new(AtomicBool::new(false));

        let reader = tokio::spawn(read_loop(
            stream,
            pending.clone(),
            abandoned.clone(),
            closed.clone(),
        ));

        tracing::info!("Connected to {}", ws_url);

        Ok(Self {
            endpoint: ws_url.to_string(),
            next_id: AtomicU64::new(1),
            pending,
            abandoned,
            closed,
            ws_sink: Mutex::new(sink),
            call_timeout: timeout,
            reader,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send CDP request and wait for the reply carrying the same id
    pub async fn send_request(
        &self,
        method: impl Into<String>,
        params: Option<Value>,
    ) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = CDPRequest {
            id,
            method: method.into(),
            params,
        };
        let json = serde_json::to_string(&request)?;

        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);
        if self.closed.load(Ordering::SeqCst) {
            self.pending.remove(&id);
            return Err(CDPError::Closed);
        }

        tracing::debug!("-> #{} {}", id, request.method);
        let sent = self.ws_sink.lock().await.send(Message::Text(json)).await;
        if let Err(e) = sent {
            self.pending.remove(&id);
            return Err(CDPError::Connection {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            });
        }

        let response = match tokio::time::timeout(self.call_timeout, rx).await {
            Ok(Ok(routed)) => routed?,
            Ok(Err(_)) => return Err(CDPError::Closed),
            Err(_) => {
                self.pending.remove(&id);
                self.abandoned.insert(id);
                tracing::warn!(
                    "#{} {} got no reply within {:?}",
                    id,
                    request.method,
                    self.call_timeout
                );
                return Err(CDPError::Timeout(self.call_timeout));
            }
        };

        tracing::debug!("<- #{}", response.id);

        if let Some(error) = response.error {
            return Err(CDPError::Protocol {
                code: error.code,
                message: error.message,
            });
        }

        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Close connection gracefully. Consumes the client, so it runs at most once.
    pub async fn close(self) -> Result<()> {
        let outcome = tokio::time::timeout(self.call_timeout, async {
            self.ws_sink.lock().await.close().await
        })
        .await;
        self.reader.abort();

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed)) => {}
            Ok(Err(e)) => {
                return Err(CDPError::Connection {
                    endpoint: self.endpoint.clone(),
                    reason: e.to_string(),
                })
            }
            Err(_) => return Err(CDPError::Timeout(self.call_timeout)),
        }

        tracing::info!("Disconnected from {}", self.endpoint);
        Ok(())
    }
}

impl Drop for CDPClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

async fn read_loop(
    mut stream: WsSource,
    pending: PendingMap,
    abandoned: Arc<DashSet<RequestId>>,
    closed: Arc<AtomicBool>,
) {
    while let Some(msg) = stream.next().await {
        match msg {
            Ok(Message::Text(text)) => route_frame(&text, &pending, &abandoned),
            Ok(Message::Binary(_)) => {
                tracing::warn!("Unexpected binary frame");
                fail_all(&pending, &abandoned, || {
                    CDPError::MalformedFrame("binary frame where JSON text was expected".into())
                });
            }
            Ok(Message::Close(_)) => {
                tracing::info!("WebSocket closed by peer");
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!("WebSocket error: {}", e);
                break;
            }
        }
    }

    closed.store(true, Ordering::SeqCst);
    // Dropping the senders wakes every waiter with `Closed`.
    pending.clear();
    abandoned.clear();
}

fn route_frame(text: &str, pending: &PendingMap, abandoned: &DashSet<RequestId>) {
    match serde_json::from_str::<CDPMessage>(text) {
        Ok(CDPMessage::Response(response)) => {
            let id = response.id;
            if let Some((_, tx)) = pending.remove(&id) {
                let _ = tx.send(Ok(response)); // receiver may have timed out
            } else if abandoned.remove(&id).is_some() {
                tracing::debug!("Discarding late reply for abandoned request {}", id);
            } else {
                tracing::warn!("Received response for unknown request: {}", id);
                fail_all(pending, abandoned, || CDPError::UnexpectedReply(id));
            }
        }
        Ok(CDPMessage::Event(event)) => {
            tracing::trace!("Ignoring event {}", event.method);
        }
        Err(e) => {
            tracing::warn!("Unparseable CDP frame: {}", e);
            fail_all(pending, abandoned, || CDPError::MalformedFrame(e.to_string()));
        }
    }
}

/// Fail every outstanding call. Their ids move to `abandoned` so the real
/// replies, if they still arrive, are not taken for strays.
fn fail_all(
    pending: &PendingMap,
    abandoned: &DashSet<RequestId>,
    make_error: impl Fn() -> CDPError,
) {
    let ids: Vec<RequestId> = pending.iter().map(|entry| *entry.key()).collect();
    for id in ids {
        if let Some((_, tx)) = pending.remove(&id) {
            abandoned.insert(id);
            let _ = tx.send(Err(make_error()));
        }
    }
}
