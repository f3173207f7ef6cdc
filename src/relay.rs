//! Forwards on/off commands to the metering device's `/relay` endpoint.

use std::{fmt, str::FromStr, time::Duration};

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use utoipa::ToSchema;

/// Upper bound on a single forward, connect included.
pub const RELAY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RelayState {
    On,
    Off,
}

impl FromStr for RelayState {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            _ => Err(RelayError::InvalidState),
        }
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RelayState::On => "on",
            RelayState::Off => "off",
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("ESP_IP is not configured")]
    NotConfigured,
    #[error("state must be 'on' or 'off'")]
    InvalidState,
    /// Timeout, refused connection, DNS failure or a body that could not be read.
    #[error("{0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Serialize)]
struct RelayCommand {
    state: RelayState,
}

/// What the device answered, passed back to the caller untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayReply {
    pub status: u16,
    pub body: String,
}

#[derive(Debug, Clone)]
pub struct RelayClient {
    http: Client,
    endpoint: String,
}

impl RelayClient {
    /// `base_url` is the device address without the `/relay` suffix.
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, RELAY_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build relay HTTP client")?;

        Ok(Self {
            http,
            endpoint: format!("{}/relay", base_url.trim_end_matches('/')),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Sends one `POST {base}/relay` with `{"state": ...}`. Never retries.
    pub async fn send(&self, state: RelayState) -> Result<RelayReply, RelayError> {
        debug!(endpoint = %self.endpoint, state = %state, "Forwarding relay command");

        let result = async {
            let resp = self
                .http
                .post(&self.endpoint)
                .json(&RelayCommand { state })
                .send()
                .await?;
            let status = resp.status().as_u16();
            let body = resp.text().await?;
            Ok::<_, reqwest::Error>(RelayReply { status, body })
        }
        .await;

        match result {
            Ok(reply) => {
                info!(state = %state, esp_status = reply.status, "Relay command delivered");
                Ok(reply)
            }
            Err(e) => {
                warn!(endpoint = %self.endpoint, state = %state, error = %e, "Relay command failed");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_only_lowercase_on_off() {
        assert_eq!("on".parse::<RelayState>().unwrap(), RelayState::On);
        assert_eq!("off".parse::<RelayState>().unwrap(), RelayState::Off);
        assert!(matches!("ON".parse::<RelayState>(), Err(RelayError::InvalidState)));
        assert!(matches!("sideways".parse::<RelayState>(), Err(RelayError::InvalidState)));
        assert!(matches!("".parse::<RelayState>(), Err(RelayError::InvalidState)));
    }

    #[test]
    fn command_serialises_as_state_object() {
        let body = serde_json::to_value(RelayCommand { state: RelayState::Off }).unwrap();
        assert_eq!(body, serde_json::json!({ "state": "off" }));
    }

    #[test]
    fn endpoint_appends_relay_path() {
        let client = RelayClient::new("http://192.168.1.50").unwrap();
        assert_eq!(client.endpoint(), "http://192.168.1.50/relay");

        let client = RelayClient::new("http://192.168.1.50/").unwrap();
        assert_eq!(client.endpoint(), "http://192.168.1.50/relay");
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = RelayClient::new(&format!("http://{addr}")).unwrap();
        let err = client.send(RelayState::On).await.unwrap_err();
        assert!(matches!(err, RelayError::Transport(_)));
        assert!(!err.to_string().is_empty());
    }
}
