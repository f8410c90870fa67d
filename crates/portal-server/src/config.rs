use std::net::SocketAddr;

use anyhow::Context;

/// Listener settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Env: `PORTAL_HOST`, default `0.0.0.0`
    pub host: String,
    /// Env: `PORTAL_PORT`, default `3000`
    pub port: u16,
}

impl ServerConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let host = lookup("PORTAL_HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = match lookup("PORTAL_PORT") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("PORTAL_PORT must be a port number, got '{raw}'"))?,
            None => 3000,
        };
        Ok(Self { host, port })
    }

    pub fn addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }
}
