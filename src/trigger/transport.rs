use super::{CallOutcome, TriggerSettings};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Longest response body kept in an attempt record.
const MAX_BODY_CHARS: usize = 256;

/// Body sent to the relay activation endpoint.
///
/// `device_id` is accepted as an alias so sensor firmware posting
/// `{device_id, reason}` is understood by our own relay endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayRequest {
    #[serde(alias = "device_id")]
    pub sensor_device_id: String,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub camera_device_id: Option<String>,
}

/// Outbound side of the orchestrator.
///
/// Implementations report every result as a `CallOutcome` and never return
/// errors; the orchestrator bounds each call with its own timeout as well.
#[async_trait]
pub trait ActivationTransport: Send + Sync {
    /// Ask the camera at `address` to capture.
    async fn activate_camera(&self, address: &str, reason: &str) -> CallOutcome;

    /// Ask the relay service to activate a camera for us.
    async fn relay_activation(&self, request: &RelayRequest) -> CallOutcome;
}

/// reqwest-backed transport.
pub struct HttpActivationClient {
    http_client: Client,
    activation_path: String,
    relay_url: Option<String>,
}

impl HttpActivationClient {
    pub fn new(settings: &TriggerSettings) -> Result<Self> {
        let http_client = Client::builder()
            .user_agent("firewatch/0.1")
            .timeout(settings.call_timeout())
            .build()
            .context("Failed to build HTTP client")?;

        let path = settings.activation_path.trim();
        let activation_path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{}", path)
        };

        Ok(Self {
            http_client,
            activation_path,
            relay_url: settings.relay_url.clone(),
        })
    }

    /// Activation URL for a registered address.
    ///
    /// Bare `host[:port]` addresses are assumed to speak plain HTTP, as the
    /// camera boards announce their station IP only.
    pub fn camera_url(&self, address: &str) -> String {
        let base = address.trim_end_matches('/');
        if base.starts_with("http://") || base.starts_with("https://") {
            format!("{}{}", base, self.activation_path)
        } else {
            format!("http://{}{}", base, self.activation_path)
        }
    }
}

#[async_trait]
impl ActivationTransport for HttpActivationClient {
    async fn activate_camera(&self, address: &str, _reason: &str) -> CallOutcome {
        let url = self.camera_url(address);
        match self.http_client.get(&url).send().await {
            Ok(response) => into_outcome(response).await,
            Err(e) => CallOutcome::Failed(describe_error(&e)),
        }
    }

    async fn relay_activation(&self, request: &RelayRequest) -> CallOutcome {
        let Some(relay_url) = &self.relay_url else {
            return CallOutcome::Unavailable("relay URL not configured".to_string());
        };
        match self.http_client.post(relay_url).json(request).send().await {
            Ok(response) => into_outcome(response).await,
            Err(e) => CallOutcome::Failed(describe_error(&e)),
        }
    }
}

/// Discriminate on status only; the body is kept for diagnosis.
async fn into_outcome(response: reqwest::Response) -> CallOutcome {
    let status = response.status();
    let body = truncate(response.text().await.unwrap_or_default());
    if status.is_success() {
        CallOutcome::Accepted {
            status: status.as_u16(),
            body,
        }
    } else {
        CallOutcome::Rejected {
            status: status.as_u16(),
            body,
        }
    }
}

fn describe_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("timed out: {}", e)
    } else if e.is_connect() {
        format!("connection failed: {}", e)
    } else {
        format!("request failed: {}", e)
    }
}

fn truncate(body: String) -> String {
    let mut body = body.trim().to_string();
    if let Some((idx, _)) = body.char_indices().nth(MAX_BODY_CHARS) {
        body.truncate(idx);
        body.push_str("...");
    }
    body
}
