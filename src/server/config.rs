//! Command-line and environment configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::project::WorkspaceConfig;

pub const DEFAULT_PORT: u16 = 6008;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    /// Raw TCP with `Content-Length` framing.
    #[default]
    Tcp,
    /// WebSocket text frames.
    Websocket,
}

/// GDScript language server.
#[derive(Clone, Debug, Parser)]
#[command(name = "gdscript-lsp", version, about)]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(long, env = "GDLSP_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to bind.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    #[arg(long, value_enum, default_value_t = Transport::Tcp)]
    pub transport: Transport,

    /// Poll connections on a worker thread pool.
    #[arg(long)]
    pub use_thread: bool,

    /// Project root; defaults to the current directory.
    #[arg(long, env = "GDLSP_ROOT")]
    pub root: Option<PathBuf>,

    /// JSON API documentation for built-in classes.
    #[arg(long, env = "GDLSP_API_DOCS")]
    pub api_docs: Option<PathBuf>,

    /// Skip the flat symbol index used for related-symbol queries.
    #[arg(long)]
    pub no_smart_resolve: bool,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The listen address, when `host` is an IP literal.
    pub fn parsed_addr(&self) -> Option<SocketAddr> {
        self.socket_addr().parse().ok()
    }

    pub fn workspace_config(&self) -> WorkspaceConfig {
        let root = self
            .root
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        WorkspaceConfig {
            root,
            api_docs: self.api_docs.clone(),
            smart_resolve: !self.no_smart_resolve,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::try_parse_from(["gdscript-lsp", "--root", "/game"]).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.transport, Transport::Tcp);
        assert!(!config.use_thread);
        assert_eq!(config.parsed_addr().unwrap().to_string(), "127.0.0.1:6008");

        let ws = config.workspace_config();
        assert_eq!(ws.root, PathBuf::from("/game"));
        assert!(ws.smart_resolve);
        assert!(ws.api_docs.is_none());
    }

    #[test]
    fn test_flags() {
        let config = ServerConfig::try_parse_from([
            "gdscript-lsp",
            "--port",
            "7000",
            "--transport",
            "websocket",
            "--use-thread",
            "--no-smart-resolve",
            "--api-docs",
            "api.json",
        ])
        .unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.transport, Transport::Websocket);
        assert!(config.use_thread);

        let ws = config.workspace_config();
        assert!(!ws.smart_resolve);
        assert_eq!(ws.api_docs, Some(PathBuf::from("api.json")));
    }

    #[test]
    fn test_rejects_unknown_transport() {
        assert!(ServerConfig::try_parse_from(["gdscript-lsp", "--transport", "pipe"]).is_err());
    }
}
