//! Request-level failures on the `/mcp` route.
//!
//! # Design
//! Every variant becomes a 500 with a JSON `{"error": "<message>"}` body.
//! The partially filled accumulator is never sent; the reply is built from
//! the error alone. A panic below the handler is turned into the same reply
//! by `panic_response`.

use std::any::Any;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mcp_bridge_core::EngineError;
use serde::Serialize;
use thiserror::Error;

use crate::cors;

#[derive(Debug, Error)]
pub enum HandlerError {
    /// The request body could not be read.
    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),

    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The engine emitted a status code HTTP cannot carry.
    #[error("engine produced invalid status code {0}")]
    InvalidStatus(u16),

    /// The engine emitted a header name or value HTTP cannot carry.
    #[error("engine produced invalid header: {0}")]
    InvalidHeader(String),

    #[error("MCP endpoint panicked: {0}")]
    Panicked(String),
}

/// JSON body of every error reply.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

/// Panic handler for `CatchPanicLayer` on the `/mcp` route.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };
    let err = HandlerError::Panicked(message);
    tracing::error!(error = %err, "error in MCP endpoint");
    err.into_response()
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        let mut response = (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorBody::new(self.to_string())),
        )
            .into_response();
        cors::allow_origin(response.headers_mut());
        response
    }
}
