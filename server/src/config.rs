//! Process configuration from flags and the environment.

use std::convert::Infallible;
use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// Discovery document location, relative to the deployment root.
pub const DEFAULT_SERVER_CARD_PATH: &str = ".well-known/mcp/server-card.json";

#[derive(Debug, Clone, Parser)]
#[command(
    name = "mcp-bridge-server",
    version,
    about = "Serve the MCP protocol engine over streamable HTTP"
)]
pub struct ServerConfig {
    /// Address to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Emit informational logs when set to `true` (any case). Every other
    /// value keeps the process quiet.
    #[arg(
        long,
        env = "DEBUG_LOGS",
        default_value_t = false,
        action = ArgAction::Set,
        value_parser = parse_debug_logs
    )]
    pub debug_logs: bool,

    /// Path of the discovery document served under `/.well-known/mcp/`.
    #[arg(long, env = "SERVER_CARD_PATH", default_value = DEFAULT_SERVER_CARD_PATH)]
    pub server_card_path: PathBuf,
}

/// Only `true` enables logging; unrecognised values are not an error.
fn parse_debug_logs(raw: &str) -> Result<bool, Infallible> {
    Ok(raw.eq_ignore_ascii_case("true"))
}

impl ServerConfig {
    pub fn bind_addr(&self) -> (&str, u16) {
        (self.host.as_str(), self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_everything() {
        let config = ServerConfig::try_parse_from([
            "mcp-bridge-server",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--debug-logs",
            "true",
            "--server-card-path",
            "/srv/card.json",
        ])
        .unwrap();
        assert_eq!(config.bind_addr(), ("127.0.0.1", 9000));
        assert!(config.debug_logs);
        assert_eq!(config.server_card_path, PathBuf::from("/srv/card.json"));
    }

    #[test]
    fn debug_logs_is_on_only_for_true() {
        for (raw, expected) in [
            ("true", true),
            ("TRUE", true),
            ("True", true),
            ("false", false),
            ("1", false),
            ("yes", false),
            ("on", false),
            ("verbose", false),
        ] {
            let config =
                ServerConfig::try_parse_from(["mcp-bridge-server", "--debug-logs", raw]).unwrap();
            assert_eq!(config.debug_logs, expected, "{raw}");
        }
    }

    #[test]
    fn debug_logs_defaults_off() {
        let config = ServerConfig::try_parse_from(["mcp-bridge-server"]).unwrap();
        assert!(!config.debug_logs);
    }

    #[test]
    fn rejects_out_of_range_port() {
        assert!(ServerConfig::try_parse_from(["mcp-bridge-server", "--port", "70000"]).is_err());
    }
}
