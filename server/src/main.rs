use anyhow::Context as _;
use clap::Parser;
use mcp_bridge_server::bootstrap::shutdown_signal;
use mcp_bridge_server::config::ServerConfig;
use tokio::net::TcpListener;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();
    mcp_bridge_server::logging::init(config.debug_logs);

    let (host, port) = config.bind_addr();
    tracing::info!("starting HTTP MCP server on {host}:{port}");
    let listener = TcpListener::bind((host, port))
        .await
        .with_context(|| format!("bind {host}:{port}"))?;
    mcp_bridge_server::run(listener, &config, shutdown_signal()).await
}
