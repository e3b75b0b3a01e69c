//! Streamable-HTTP transport: the `Engine` behind the `/mcp` route.
//!
//! # Design
//! The transport holds only a sender into the run-loop and the session id of
//! the single persistent connection, so one instance is shared by every
//! in-flight call. Each call reads its JSON-RPC body through
//! `Exchange::receive`, forwards the decoded message as an `Envelope`, and
//! writes the reply through `Exchange::send`: plain JSON by default, or one
//! SSE `message` event when the client only accepts `text/event-stream`.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::engine::Engine;
use crate::error::EngineError;
use crate::exchange::Exchange;
use crate::http::{HeaderPair, RequestScope};
use crate::jsonrpc::{
    JsonRpcError, JsonRpcId, JsonRpcMessage, JsonRpcResponse, INVALID_REQUEST, PARSE_ERROR,
};
use crate::message::SendMessage;
use crate::server::{Envelope, ServerStreams};
use crate::types::SUPPORTED_PROTOCOL_VERSIONS;

pub const SESSION_ID_HEADER: &str = "mcp-session-id";
pub const PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";

const CONTENT_TYPE_JSON: &str = "application/json";
const CONTENT_TYPE_SSE: &str = "text/event-stream";
const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone)]
pub struct StreamableHttpTransport {
    session_id: String,
    incoming: mpsc::Sender<Envelope>,
}

impl StreamableHttpTransport {
    /// Create the transport and the run-loop end of its channel.
    pub fn connect() -> (Self, ServerStreams) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let transport = Self {
            session_id: Uuid::new_v4().to_string(),
            incoming: tx,
        };
        (transport, ServerStreams { incoming: rx })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn handle_post(&self, scope: &RequestScope, exchange: &mut Exchange) -> Result<(), EngineError> {
        let accept = AcceptedTypes::parse(scope.header("accept"));
        if !accept.json && !accept.sse {
            return self.reject(
                exchange,
                406,
                JsonRpcError::new(
                    INVALID_REQUEST,
                    "Not Acceptable: client must accept application/json or text/event-stream",
                ),
            );
        }

        if !scope.header("content-type").is_some_and(|ct| media_type(ct) == CONTENT_TYPE_JSON) {
            return self.reject(
                exchange,
                415,
                JsonRpcError::new(INVALID_REQUEST, "Unsupported Media Type: expected application/json"),
            );
        }

        if let Some(sid) = scope.header(SESSION_ID_HEADER) {
            if sid != self.session_id {
                return self.reject(exchange, 404, JsonRpcError::new(INVALID_REQUEST, "Session not found"));
            }
        }

        if let Some(version) = scope.header(PROTOCOL_VERSION_HEADER) {
            if !SUPPORTED_PROTOCOL_VERSIONS.contains(&version) {
                return self.reject(
                    exchange,
                    400,
                    JsonRpcError::new(INVALID_REQUEST, format!("Unsupported protocol version: {version}")),
                );
            }
        }

        let received = exchange.receive();
        let value: serde_json::Value = match serde_json::from_slice(received.body()) {
            Ok(v) => v,
            Err(e) => {
                return self.reject(
                    exchange,
                    400,
                    JsonRpcError::new(PARSE_ERROR, "parse error").with_detail(e.to_string()),
                )
            }
        };
        if value.is_array() {
            return self.reject(exchange, 400, JsonRpcError::new(INVALID_REQUEST, "batching not supported"));
        }
        let message: JsonRpcMessage = match serde_json::from_value(value) {
            Ok(m) => m,
            Err(e) => {
                return self.reject(
                    exchange,
                    400,
                    JsonRpcError::new(INVALID_REQUEST, "invalid request").with_detail(e.to_string()),
                )
            }
        };

        if !message.is_request() {
            self.forward(message, None).await?;
            exchange.send(SendMessage::start(202, vec![self.session_header()]));
            return Ok(());
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.forward(message, Some(reply_tx)).await?;
        let response = reply_rx.await.map_err(|_| EngineError::Closed)?;
        let payload = serde_json::to_vec(&response)?;

        if accept.json {
            self.respond(exchange, 200, CONTENT_TYPE_JSON, vec![Bytes::from(payload)]);
        } else {
            self.respond(
                exchange,
                200,
                CONTENT_TYPE_SSE,
                vec![
                    Bytes::from_static(b"event: message\n"),
                    Bytes::from_static(b"data: "),
                    Bytes::from(payload),
                    Bytes::from_static(b"\n\n"),
                ],
            );
        }
        Ok(())
    }

    async fn forward(
        &self,
        message: JsonRpcMessage,
        reply: Option<oneshot::Sender<JsonRpcResponse>>,
    ) -> Result<(), EngineError> {
        self.incoming
            .send(Envelope { message, reply })
            .await
            .map_err(|_| EngineError::Closed)
    }

    fn session_header(&self) -> HeaderPair {
        (SESSION_ID_HEADER.as_bytes().to_vec(), self.session_id.as_bytes().to_vec())
    }

    fn respond(&self, exchange: &mut Exchange, status: u16, content_type: &str, fragments: Vec<Bytes>) {
        let mut headers = vec![(b"content-type".to_vec(), content_type.as_bytes().to_vec())];
        if content_type == CONTENT_TYPE_SSE {
            headers.push((b"cache-control".to_vec(), b"no-cache".to_vec()));
        }
        headers.push(self.session_header());
        exchange.send(SendMessage::start(status, headers));
        for fragment in fragments {
            exchange.send(SendMessage::body(fragment));
        }
    }

    fn reject(&self, exchange: &mut Exchange, status: u16, error: JsonRpcError) -> Result<(), EngineError> {
        tracing::debug!(status, message = %error.message, "rejecting call");
        let payload = serde_json::to_vec(&JsonRpcResponse::err(JsonRpcId::Null, error))?;
        self.respond(exchange, status, CONTENT_TYPE_JSON, vec![Bytes::from(payload)]);
        Ok(())
    }
}

#[async_trait]
impl Engine for StreamableHttpTransport {
    async fn call(&self, scope: &RequestScope, exchange: &mut Exchange) -> Result<(), EngineError> {
        match scope.method() {
            "POST" => self.handle_post(scope, exchange).await,
            method => {
                tracing::debug!(method, "method not allowed on streamable-HTTP endpoint");
                let payload = serde_json::to_vec(&JsonRpcResponse::err(
                    JsonRpcId::Null,
                    JsonRpcError::new(INVALID_REQUEST, "Method Not Allowed"),
                ))?;
                exchange.send(SendMessage::start(
                    405,
                    vec![
                        (b"content-type".to_vec(), CONTENT_TYPE_JSON.as_bytes().to_vec()),
                        (b"allow".to_vec(), b"POST".to_vec()),
                    ],
                ));
                exchange.send(SendMessage::body(payload));
                Ok(())
            }
        }
    }
}

/// Media types admitted by an `accept` header. A missing header admits both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AcceptedTypes {
    json: bool,
    sse: bool,
}

impl AcceptedTypes {
    fn parse(header: Option<&str>) -> Self {
        let Some(header) = header else {
            return Self { json: true, sse: true };
        };
        let mut accepted = Self { json: false, sse: false };
        for media in header.split(',').map(media_type) {
            match media.as_str() {
                "*/*" => {
                    accepted.json = true;
                    accepted.sse = true;
                }
                "application/json" | "application/*" => accepted.json = true,
                "text/event-stream" | "text/*" => accepted.sse = true,
                _ => {}
            }
        }
        accepted
    }
}

/// Lower-cased media type with any parameters stripped.
fn media_type(value: &str) -> String {
    value.split(';').next().unwrap_or("").trim().to_ascii_lowercase()
}
