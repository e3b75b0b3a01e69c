//! Protocol-side core of the MCP streamable-HTTP bridge.
//!
//! # Overview
//! Turns one buffered HTTP call into the scope/receive/send exchange a
//! protocol engine expects, and folds the engine's emitted messages back into
//! a single `HttpResponse`. Nothing here binds sockets; the server crate owns
//! the listener and the framework types.
//!
//! # Design
//! - `Exchange` is the per-call adapter: one request body in, an accumulator
//!   of `SendMessage`s out.
//! - `Engine` is the seam the HTTP handler calls through. It is shared by
//!   every in-flight call, so per-call state lives in the `Exchange`.
//! - `StreamableHttpTransport` is the shipped engine. It forwards JSON-RPC
//!   messages to a single persistent `McpServer` run-loop.

pub mod engine;
pub mod error;
pub mod exchange;
pub mod http;
pub mod jsonrpc;
pub mod message;
pub mod server;
pub mod transport;
pub mod types;

pub use engine::Engine;
pub use error::{EngineError, ToolError};
pub use exchange::{Exchange, ResponseAccumulator};
pub use http::{HeaderPair, HttpResponse, RequestScope};
pub use message::{ReceiveMessage, SendMessage};
pub use server::{McpServer, NoTools, ServerStreams, ToolHandler};
pub use transport::StreamableHttpTransport;
pub use types::ServerInfo;
