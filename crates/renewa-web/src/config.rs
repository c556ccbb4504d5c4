use std::net::{SocketAddr, ToSocketAddrs};

use anyhow::Context;

pub const DEFAULT_TITLE: &str = "Renewable Energy Classifier";
pub const DEFAULT_DESCRIPTION: &str = "Upload a renewable energy photo to see what the model predicts.";

/// Web shell settings.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub host: String,
    pub port: u16,
    /// Number of ranked labels to show; 0 shows all of them.
    pub top_k: usize,
    pub title: String,
    pub description: String,
    pub max_upload_bytes: usize,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7860,
            top_k: 3,
            title: DEFAULT_TITLE.to_string(),
            description: DEFAULT_DESCRIPTION.to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
        }
    }
}

impl ServeConfig {
    /// Resolve `host` (an IP literal or a name such as `localhost`) to the
    /// first matching listen address.
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        let host = self.host.trim_start_matches('[').trim_end_matches(']');
        (host, self.port)
            .to_socket_addrs()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))?
            .next()
            .with_context(|| format!("{} resolved to no addresses", self.host))
    }
}
