//! Lifetime of the persistent protocol run-loop.

use anyhow::Context as _;
use mcp_bridge_core::{McpServer, ServerStreams};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// The background run-loop task and the token that stops it.
pub struct EngineTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl EngineTask {
    pub fn spawn(server: McpServer, streams: ServerStreams) -> Self {
        let token = CancellationToken::new();
        let handle = tokio::spawn(server.run(streams, token.clone()));
        Self { token, handle }
    }

    /// Cancel the run-loop and wait for it to finish.
    ///
    /// A task that was itself cancelled counts as a clean stop; a panic is
    /// returned as an error.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.token.cancel();
        match self.handle.await {
            Ok(()) => Ok(()),
            Err(e) if e.is_cancelled() => Ok(()),
            Err(e) => Err(e).context("protocol run-loop failed"),
        }
    }
}

/// Resolves on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use mcp_bridge_core::{NoTools, ServerInfo, StreamableHttpTransport};

    #[tokio::test]
    async fn shutdown_stops_a_running_loop() {
        let (transport, streams) = StreamableHttpTransport::connect();
        let task = EngineTask::spawn(
            McpServer::new(ServerInfo::new("t", "0"), Arc::new(NoTools)),
            streams,
        );
        task.shutdown().await.unwrap();
        drop(transport);
    }

    #[tokio::test]
    async fn shutdown_after_transport_dropped() {
        let (transport, streams) = StreamableHttpTransport::connect();
        let task = EngineTask::spawn(
            McpServer::new(ServerInfo::new("t", "0"), Arc::new(NoTools)),
            streams,
        );
        drop(transport);
        task.shutdown().await.unwrap();
    }
}
