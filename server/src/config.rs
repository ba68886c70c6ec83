//! Server settings shared by the binary and by tests

use shared::DEFAULT_PORT;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// How long a ready player may wait for an opponent. `None` waits forever.
    pub opponent_timeout: Option<Duration>,
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            opponent_timeout: None,
        }
    }
}
