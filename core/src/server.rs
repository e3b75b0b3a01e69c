//! The persistent MCP connection driven by the streamable-HTTP transport.
//!
//! # Design
//! Exactly one `McpServer` exists per process. The transport forwards every
//! decoded JSON-RPC message as an `Envelope`. Lifecycle messages
//! (initialize, initialized, ping) are handled inline, so the state needs no
//! locking. Tool requests only read the state at dispatch and then run as
//! tasks in a `JoinSet` owned by the loop, so a slow tool does not hold up
//! other callers. The loop ends when the cancellation token fires or every
//! transport handle is dropped; in-flight tool tasks are aborted then.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::ToolError;
use crate::jsonrpc::{
    JsonRpcError, JsonRpcId, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, JSONRPC_VERSION, METHOD_NOT_FOUND,
    NOT_INITIALIZED,
};
use crate::types::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, ListToolsParams,
    ListToolsResult, ServerInfo,
};

/// Source of the tools advertised by the server.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn list_tools(&self, params: ListToolsParams) -> Result<ListToolsResult, ToolError>;
    async fn call_tool(&self, params: CallToolParams) -> Result<CallToolResult, ToolError>;
}

/// A handler that offers no tools.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoTools;

#[async_trait]
impl ToolHandler for NoTools {
    async fn list_tools(&self, _params: ListToolsParams) -> Result<ListToolsResult, ToolError> {
        Ok(ListToolsResult::default())
    }

    async fn call_tool(&self, params: CallToolParams) -> Result<CallToolResult, ToolError> {
        Err(ToolError::UnknownTool(params.name))
    }
}

/// One message forwarded from the transport. Requests carry a reply slot.
#[derive(Debug)]
pub struct Envelope {
    pub message: JsonRpcMessage,
    pub reply: Option<oneshot::Sender<JsonRpcResponse>>,
}

/// The run-loop's end of the transport channel.
#[derive(Debug)]
pub struct ServerStreams {
    pub(crate) incoming: mpsc::Receiver<Envelope>,
}

type PendingResponse = Pin<Box<dyn Future<Output = JsonRpcResponse> + Send>>;

/// How a request is answered: now, or by a tool future run off the loop.
enum Dispatch {
    Done(JsonRpcResponse),
    Pending(PendingResponse),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ConnState {
    New,
    InitResponded,
    Ready,
}

pub struct McpServer {
    info: ServerInfo,
    handler: Arc<dyn ToolHandler>,
    state: ConnState,
    protocol_version: Option<String>,
}

impl McpServer {
    pub fn new(info: ServerInfo, handler: Arc<dyn ToolHandler>) -> Self {
        Self {
            info,
            handler,
            state: ConnState::New,
            protocol_version: None,
        }
    }

    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    /// Serve envelopes until `token` is cancelled or the transport closes.
    pub async fn run(mut self, mut streams: ServerStreams, token: CancellationToken) {
        tracing::info!(server = %self.info.implementation.name, "protocol run-loop started");
        let mut tools = JoinSet::new();
        loop {
            let envelope = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::info!("protocol run-loop cancelled");
                    break;
                }
                Some(joined) = tools.join_next(), if !tools.is_empty() => {
                    if let Err(e) = joined {
                        if e.is_panic() {
                            tracing::error!(error = %e, "tool task panicked");
                        }
                    }
                    continue;
                }
                envelope = streams.incoming.recv() => match envelope {
                    Some(envelope) => envelope,
                    None => {
                        tracing::info!("transport closed, stopping run-loop");
                        break;
                    }
                },
            };

            match envelope.message {
                JsonRpcMessage::Request(req) => match self.dispatch_request(req) {
                    Dispatch::Done(response) => {
                        if let Some(reply) = envelope.reply {
                            // The caller may have gone away; nothing to do then.
                            let _ = reply.send(response);
                        }
                    }
                    Dispatch::Pending(pending) => {
                        let reply = envelope.reply;
                        tools.spawn(async move {
                            let response = pending.await;
                            if let Some(reply) = reply {
                                let _ = reply.send(response);
                            }
                        });
                    }
                },
                message => {
                    self.handle_message(message).await;
                }
            }
        }
        tools.shutdown().await;
    }

    /// Returns `Some(response)` for requests, `None` otherwise.
    pub async fn handle_message(&mut self, message: JsonRpcMessage) -> Option<JsonRpcResponse> {
        match message {
            JsonRpcMessage::Request(req) => Some(match self.dispatch_request(req) {
                Dispatch::Done(response) => response,
                Dispatch::Pending(pending) => pending.await,
            }),
            JsonRpcMessage::Notification(note) => {
                self.handle_notification(note);
                None
            }
            JsonRpcMessage::Response(resp) => {
                tracing::debug!(id = ?resp.id, "ignoring client response");
                None
            }
        }
    }

    /// Lifecycle requests are answered here; tool requests are checked
    /// against the state now and returned as a future that owns its inputs.
    fn dispatch_request(&mut self, req: JsonRpcRequest) -> Dispatch {
        if req.jsonrpc != JSONRPC_VERSION {
            return Dispatch::Done(error_response(req.id, INVALID_REQUEST, "invalid jsonrpc version", None));
        }

        tracing::debug!(method = %req.method, "handling request");
        match req.method.as_str() {
            "initialize" => Dispatch::Done(self.handle_initialize(req)),
            "ping" => Dispatch::Done(JsonRpcResponse::ok(req.id, serde_json::json!({}))),
            "tools/list" => {
                if self.state != ConnState::Ready {
                    return Dispatch::Done(error_response(req.id, NOT_INITIALIZED, "not initialized", None));
                }
                let params = match req.params {
                    Some(v) => serde_json::from_value::<ListToolsParams>(v),
                    None => Ok(ListToolsParams::default()),
                };
                let params = match params {
                    Ok(p) => p,
                    Err(e) => return Dispatch::Done(invalid_params(req.id, e.to_string())),
                };
                let handler = Arc::clone(&self.handler);
                let id = req.id;
                Dispatch::Pending(Box::pin(async move {
                    match handler.list_tools(params).await {
                        Ok(result) => to_result(id, &result),
                        Err(e) => internal_error(id, e.to_string()),
                    }
                }))
            }
            "tools/call" => {
                if self.state != ConnState::Ready {
                    return Dispatch::Done(error_response(req.id, NOT_INITIALIZED, "not initialized", None));
                }
                let Some(v) = req.params else {
                    return Dispatch::Done(invalid_params(req.id, "missing params".to_string()));
                };
                let params = match serde_json::from_value::<CallToolParams>(v) {
                    Ok(p) => p,
                    Err(e) => return Dispatch::Done(invalid_params(req.id, e.to_string())),
                };
                let handler = Arc::clone(&self.handler);
                let id = req.id;
                Dispatch::Pending(Box::pin(async move {
                    match handler.call_tool(params).await {
                        Ok(result) => to_result(id, &result),
                        Err(ToolError::UnknownTool(name)) => {
                            invalid_params(id, format!("unknown tool: {name}"))
                        }
                        Err(e) => internal_error(id, e.to_string()),
                    }
                }))
            }
            _ => Dispatch::Done(error_response(req.id, METHOD_NOT_FOUND, "method not found", None)),
        }
    }

    fn handle_initialize(&mut self, req: JsonRpcRequest) -> JsonRpcResponse {
        let Some(params) = req.params else {
            return invalid_params(req.id, "missing params".to_string());
        };
        let init: InitializeParams = match serde_json::from_value(params) {
            Ok(p) => p,
            Err(e) => return invalid_params(req.id, e.to_string()),
        };

        if self.state != ConnState::New {
            tracing::info!(client = %init.client_info.name, "re-initializing connection");
        }
        let negotiated = self.info.negotiate_protocol(&init.protocol_version);
        self.protocol_version = Some(negotiated.clone());
        self.state = ConnState::InitResponded;

        let result = InitializeResult {
            protocol_version: negotiated,
            capabilities: self.info.capabilities.clone(),
            server_info: self.info.implementation.clone(),
            instructions: self.info.instructions.clone(),
        };
        to_result(req.id, &result)
    }

    fn handle_notification(&mut self, note: JsonRpcNotification) {
        if note.jsonrpc != JSONRPC_VERSION {
            return;
        }
        if note.method == "notifications/initialized" && self.state == ConnState::InitResponded {
            self.state = ConnState::Ready;
            tracing::info!(protocol = ?self.protocol_version, "connection ready");
        }
    }
}

fn error_response(id: JsonRpcId, code: i64, message: &str, detail: Option<String>) -> JsonRpcResponse {
    let error = JsonRpcError::new(code, message);
    let error = match detail {
        Some(detail) => error.with_detail(detail),
        None => error,
    };
    JsonRpcResponse::err(id, error)
}

fn invalid_params(id: JsonRpcId, detail: String) -> JsonRpcResponse {
    error_response(id, INVALID_PARAMS, "invalid params", Some(detail))
}

fn internal_error(id: JsonRpcId, detail: String) -> JsonRpcResponse {
    error_response(id, INTERNAL_ERROR, "internal error", Some(detail))
}

fn to_result<T: serde::Serialize>(id: JsonRpcId, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::ok(id, value),
        Err(e) => internal_error(id, e.to_string()),
    }
}
