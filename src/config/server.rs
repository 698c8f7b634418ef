//! Server configuration types.
//!
//! Default values are sourced from `crate::constants`.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::constants::DEFAULT_BIND_ADDRESS;

fn default_bind() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

/// HTTP listener configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on (host:port)
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl ServerConfig {
    /// Parse `bind` as a socket address
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        self.bind
            .parse()
            .map_err(|e| format!("Invalid server.bind '{}': {}", self.bind, e))
    }
}
