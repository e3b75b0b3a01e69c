//! HTTP front end for the MCP protocol engine.
//!
//! Routes:
//! - `GET /.well-known/mcp/server-card.json`: discovery document
//! - `GET|POST|OPTIONS /mcp`: streamable-HTTP endpoint

pub mod bootstrap;
pub mod config;
pub mod cors;
pub mod error;
pub mod logging;
pub mod mcp_endpoint;
pub mod server_card;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use axum::{routing::get, Router};
use mcp_bridge_core::{Engine, McpServer, NoTools, ServerInfo, StreamableHttpTransport};
use tokio::net::TcpListener;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::bootstrap::EngineTask;
use crate::config::ServerConfig;

pub const MCP_ROUTE: &str = "/mcp";
pub const SERVER_CARD_ROUTE: &str = "/.well-known/mcp/server-card.json";

/// Name advertised in the `initialize` reply.
pub const SERVER_NAME: &str = "mcp-server-perplexity";

/// Shared by every request: the single engine and where the card lives.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<dyn Engine>,
    pub server_card_path: PathBuf,
}

impl AppState {
    pub fn new(engine: Arc<dyn Engine>, server_card_path: impl Into<PathBuf>) -> Self {
        Self {
            engine,
            server_card_path: server_card_path.into(),
        }
    }
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route(SERVER_CARD_ROUTE, get(server_card::serve))
        .route(
            MCP_ROUTE,
            get(mcp_endpoint::handle)
                .post(mcp_endpoint::handle)
                .options(mcp_endpoint::preflight)
                .layer(CatchPanicLayer::custom(error::panic_response)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub fn server_info() -> ServerInfo {
    ServerInfo::new(SERVER_NAME, env!("CARGO_PKG_VERSION"))
}

/// Start the run-loop, serve `listener` until `shutdown` resolves, then stop
/// the run-loop. The run-loop is stopped even when serving fails.
pub async fn run<F>(listener: TcpListener, config: &ServerConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (transport, streams) = StreamableHttpTransport::connect();
    let engine_task = EngineTask::spawn(McpServer::new(server_info(), Arc::new(NoTools)), streams);

    let state = AppState::new(Arc::new(transport), config.server_card_path.clone());
    let served = axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown)
        .await;

    engine_task.shutdown().await?;
    served.context("HTTP server failed")?;
    tracing::info!("server stopped");
    Ok(())
}
