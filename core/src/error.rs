//! Error types for engine invocations.
//!
//! # Design
//! `Closed` gets a dedicated variant because the bridge must tell "the
//! persistent run-loop is gone" apart from a protocol failure inside a
//! single call. The server crate maps every variant to a 500 reply.

use thiserror::Error;

/// Errors returned by `Engine::call`.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The run-loop stopped or dropped the reply channel.
    #[error("protocol run-loop is not running")]
    Closed,

    /// The engine could not complete the call.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// A JSON-RPC payload could not be serialized.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors returned by a `ToolHandler`.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("tool failed: {0}")]
    Failed(String),
}
