//! Browser Session Management
//!
//! The high-level entry point: discover targets on a debug port, attach to
//! one, run calls, close. One session per command, never shared.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::cdp::{CDPClient, CDPSession};
use crate::discovery::{select_target, Target, TargetDirectory};
use crate::error::{CDPError, Result};

/// Session configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub host: String,
    pub port: u16,
    /// Bounds discovery, the handshake and each call.
    pub timeout: Duration,
    /// Target id to attach to; `None` means the first usable target.
    pub target: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9222,
            timeout: Duration::from_secs(5),
            target: None,
        }
    }
}

impl SessionConfig {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    pub fn directory(&self) -> Result<TargetDirectory> {
        TargetDirectory::for_port(&self.host, self.port, self.timeout)
    }
}

/// List the debug port's targets.
pub async fn list_targets(config: &SessionConfig) -> Result<Vec<Target>> {
    config.directory()?.list_targets().await
}

/// Browser Session - one CDP connection bound to one target
pub struct BrowserSession {
    target: Target,
    client: CDPClient,
}

impl BrowserSession {
    /// Discover targets, pick one, connect to it.
    pub async fn open(config: &SessionConfig) -> Result<Self> {
        let targets = list_targets(config).await?;
        let target = select_target(&targets, config.target.as_deref())?.clone();
        Self::attach(target, config.timeout).await
    }

    /// Connect to an already discovered target.
    pub async fn attach(target: Target, timeout: Duration) -> Result<Self> {
        let ws_url = target.web_socket_debugger_url.as_deref().ok_or_else(|| {
            CDPError::TargetNotFound(format!("target {} has no webSocketDebuggerUrl", target.id))
        })?;

        tracing::info!("Attaching to target {} ({})", target.id, target.url);
        let client = CDPClient::connect(ws_url, timeout).await?;

        Ok(Self { target, client })
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    /// Release the connection.
    pub async fn close(self) -> Result<()> {
        tracing::debug!("Closing session on target {}", self.target.id);
        self.client.close().await
    }
}

#[async_trait]
impl CDPSession for BrowserSession {
    async fn call(&self, method: &str, params: Option<Value>) -> Result<Value> {
        self.client.send_request(method, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = SessionConfig::new(9333);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 9333);
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert!(config.target.is_none());
        assert_eq!(
            config.directory().unwrap().endpoint().as_str(),
            "http://localhost:9333/json"
        );
    }

    #[tokio::test]
    async fn test_attach_requires_websocket_url() {
        let target: Target = serde_json::from_value(json!({
            "id": "W1", "title": "worker", "url": "https://example.com/w.js", "type": "worker"
        }))
        .unwrap();

        let err = BrowserSession::attach(target, Duration::from_secs(1))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, CDPError::TargetNotFound(_)), "{err:?}");
    }

    #[tokio::test]
    async fn test_open_without_browser_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = SessionConfig {
            host: "127.0.0.1".to_string(),
            ..SessionConfig::new(port)
        };
        let err = BrowserSession::open(&config).await.err().unwrap();
        assert!(matches!(err, CDPError::Network { .. }), "{err:?}");
    }
}
