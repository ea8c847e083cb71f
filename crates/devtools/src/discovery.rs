//! Target discovery over the debug port's HTTP endpoint.
//!
//! `GET http://<host>:<port>/json` returns every debuggable surface
//! (pages, workers, extensions) with its own WebSocket endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::error::Error as _;
use std::time::Duration;
use url::Url;

use crate::error::{CDPError, Result};

/// One entry of the `/json` listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub url: String,
    /// Absent when another client is already attached to this target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web_socket_debugger_url: Option<String>,
    /// `type`, `description`, `devtoolsFrontendUrl`, ... kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Target {
    pub fn is_debuggable(&self) -> bool {
        self.web_socket_debugger_url.is_some()
    }
}

/// HTTP client for one debug port's target listing.
pub struct TargetDirectory {
    http: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
}

impl TargetDirectory {
    /// `base_url` is the debug port root, e.g. `http://localhost:9222`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let network_error = |reason: String| CDPError::Network {
            endpoint: base_url.to_string(),
            reason,
        };

        let endpoint = Url::parse(base_url)
            .and_then(|base| base.join("json"))
            .map_err(|e| network_error(e.to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| network_error(e.to_string()))?;

        Ok(Self {
            http,
            endpoint,
            timeout,
        })
    }

    pub fn for_port(host: &str, port: u16, timeout: Duration) -> Result<Self> {
        Self::new(&format!("http://{}:{}/", host, port), timeout)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// List targets in the order the browser reports them. No retries.
    pub async fn list_targets(&self) -> Result<Vec<Target>> {
        tracing::debug!("GET {}", self.endpoint);

        let response = self
            .http
            .get(self.endpoint.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| self.request_error(e))?;

        let targets: Vec<Target> = response.json().await.map_err(|e| self.request_error(e))?;

        tracing::debug!("Discovered {} targets", targets.len());
        Ok(targets)
    }

    fn request_error(&self, e: reqwest::Error) -> CDPError {
        if e.is_timeout() {
            return CDPError::Timeout(self.timeout);
        }
        CDPError::Network {
            endpoint: self.endpoint.to_string(),
            reason: describe(&e),
        }
    }
}

/// reqwest's Display stops at the outermost error; walk the chain.
fn describe(e: &reqwest::Error) -> String {
    let mut text = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        text.push_str(": ");
        text.push_str(&cause.to_string());
        source = cause.source();
    }
    text
}

/// Pick the target a session should attach to.
///
/// With `wanted`, that exact id; otherwise the first debuggable one.
pub fn select_target<'a>(targets: &'a [Target], wanted: Option<&str>) -> Result<&'a Target> {
    let target = match wanted {
        Some(id) => targets
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| CDPError::TargetNotFound(format!("no target with id {id}")))?,
        None => targets
            .iter()
            .find(|t| t.is_debuggable())
            .ok_or_else(|| {
                CDPError::TargetNotFound(format!(
                    "none of the {} listed targets exposes a webSocketDebuggerUrl",
                    targets.len()
                ))
            })?,
    };

    if !target.is_debuggable() {
        return Err(CDPError::TargetNotFound(format!(
            "target {} has no webSocketDebuggerUrl (is DevTools already attached?)",
            target.id
        )));
    }

    if wanted.is_none() && targets.len() > 1 {
        tracing::warn!(
            "{} targets listed; defaulting to the first usable one: {} ({}). Use --target to choose.",
            targets.len(),
            target.id,
            target.url
        );
    }

    Ok(target)
}
