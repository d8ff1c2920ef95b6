//! JSON-RPC transports.
//!
//! The endpoint scheme selects the transport: `http`/`https` use one POST per
//! call, `ws`/`wss` keep a single WebSocket open and match responses to
//! requests by id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use reqwest::Client;
use serde_json::{Value, json};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::error::{PolarisError, Result};

/// Failure of a single JSON-RPC call
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

impl From<TransportError> for PolarisError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Rpc { code, message } => PolarisError::Rpc { code, message },
            other => PolarisError::Transport(other.to_string()),
        }
    }
}

/// Endpoint transport kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    WebSocket,
}

impl Scheme {
    /// Pick the transport for an endpoint URL
    pub fn of(url: &str) -> Result<Self> {
        let lower = url.trim().to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Ok(Scheme::Http)
        } else if lower.starts_with("ws://") || lower.starts_with("wss://") {
            Ok(Scheme::WebSocket)
        } else {
            Err(PolarisError::Config(format!("unsupported RPC endpoint scheme: {}", url)))
        }
    }
}

/// Sends JSON-RPC calls and returns the `result` member
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(&self, method: &str, params: Value) -> std::result::Result<Value, TransportError>;
}

/// Build a JSON-RPC 2.0 request body
pub fn request_body(id: u64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params,
    })
}

/// Extract the `result` of a JSON-RPC response, or its error object
pub fn parse_response(body: &Value) -> std::result::Result<Value, TransportError> {
    if let Some(error) = body.get("error").filter(|e| !e.is_null()) {
        let code = error["code"].as_i64().unwrap_or(0);
        let mut message = error["message"].as_str().unwrap_or("unknown RPC error").to_string();
        if let Some(data) = error.get("data").and_then(|d| d.as_str()) {
            message = format!("{} ({})", message, data);
        }
        return Err(TransportError::Rpc { code, message });
    }

    body.get("result")
        .cloned()
        .ok_or_else(|| TransportError::InvalidResponse(format!("missing result in {}", body)))
}

/// Request/response transport over HTTP(S)
pub struct HttpTransport {
    client: Client,
    url: String,
    timeout: Duration,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PolarisError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.to_string(),
            timeout,
            next_id: AtomicU64::new(1),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, method: &str, params: Value) -> std::result::Result<Value, TransportError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = request_body(id, method, params);

        let response = self.client.post(&self.url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(self.timeout)
            } else {
                TransportError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        // Nodes often return JSON-RPC errors with a non-2xx status
        match serde_json::from_str::<Value>(&text) {
            Ok(value) => parse_response(&value),
            Err(_) if !status.is_success() => Err(TransportError::Network(format!("HTTP {}: {}", status, text))),
            Err(e) => Err(TransportError::InvalidResponse(e.to_string())),
        }
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport").field("url", &self.url).finish()
    }
}

type Pending = Arc<Mutex<HashMap<u64, oneshot::Sender<std::result::Result<Value, TransportError>>>>>;

/// Persistent WebSocket transport
pub struct WsTransport {
    outgoing: mpsc::UnboundedSender<Message>,
    pending: Pending,
    closed: Arc<AtomicBool>,
    timeout: Duration,
    next_id: AtomicU64,
}

impl WsTransport {
    /// Open the connection and spawn its reader and writer tasks
    pub async fn connect(url: &str, timeout: Duration) -> Result<Self> {
        let (ws_stream, _) = tokio::time::timeout(timeout, connect_async(url))
            .await
            .map_err(|_| PolarisError::Transport(format!("timed out connecting to {}", url)))?
            .map_err(|e| PolarisError::Transport(format!("Failed to connect to {}: {}", url, e)))?;
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        log::info!("Connected to RPC websocket at {}", url);

        let pending: Pending = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<Message>();

        // Writer
        let writer_closed = closed.clone();
        tokio::spawn(async move {
            while let Some(msg) = outgoing_rx.recv().await {
                if let Err(e) = ws_sender.send(msg).await {
                    log::warn!("WebSocket send failed: {}", e);
                    break;
                }
            }
            writer_closed.store(true, Ordering::SeqCst);
        });

        // Reader
        let reader_pending = pending.clone();
        let reader_closed = closed.clone();
        tokio::spawn(async move {
            while let Some(msg) = ws_receiver.next().await {
                match msg {
                    Ok(Message::Text(text)) => dispatch_response(&reader_pending, &text),
                    Ok(Message::Binary(data)) => match std::str::from_utf8(&data) {
                        Ok(text) => dispatch_response(&reader_pending, text),
                        Err(_) => log::debug!("Ignoring non-UTF-8 binary frame"),
                    },
                    Ok(Message::Close(_)) => {
                        log::warn!("RPC websocket closed by peer");
                        break;
                    }
                    Err(e) => {
                        log::error!("WebSocket error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }

            reader_closed.store(true, Ordering::SeqCst);
            let drained: Vec<_> = reader_pending.lock().unwrap().drain().collect();
            for (_, tx) in drained {
                let _ = tx.send(Err(TransportError::Network("connection closed".to_string())));
            }
        });

        Ok(Self {
            outgoing,
            pending,
            closed,
            timeout,
            next_id: AtomicU64::new(1),
        })
    }
}

fn dispatch_response(pending: &Pending, text: &str) {
    let value: Value = match serde_json::from_str(text) {
        Ok(v) => v,
        Err(e) => {
            log::warn!("Unparseable websocket message: {}", e);
            return;
        }
    };

    // Subscription notifications carry no id
    let Some(id) = value.get("id").and_then(|id| id.as_u64()) else {
        return;
    };

    if let Some(tx) = pending.lock().unwrap().remove(&id) {
        let _ = tx.send(parse_response(&value));
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn request(&self, method: &str, params: Value) -> std::result::Result<Value, TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Network("connection closed".to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(id, tx);

        let body = request_body(id, method, params).to_string();
        if self.outgoing.send(Message::Text(body)).is_err() {
            self.pending.lock().unwrap().remove(&id);
            return Err(TransportError::Network("connection closed".to_string()));
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(TransportError::Network("connection closed".to_string())),
            Err(_) => {
                self.pending.lock().unwrap().remove(&id);
                Err(TransportError::Timeout(self.timeout))
            }
        }
    }
}

impl std::fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WsTransport")
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish()
    }
}
