use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub server_host: String,
    pub server_port: u16,
    /// Base URL of the metering device, e.g. `http://192.168.1.50`.
    /// `None` disables the relay proxy.
    pub esp_base_url: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            database_url: required("DATABASE_URL")?,
            server_host: optional("SERVER_HOST", "0.0.0.0"),
            server_port: optional("SERVER_PORT", "8080")
                .parse()
                .context("SERVER_PORT must be a valid port number")?,
            esp_base_url: device_base_url(std::env::var("ESP_IP").ok()),
        })
    }
}

/// Normalise the configured device address. Blank values count as unset and a
/// trailing `/` is dropped so `{base}/relay` never doubles the separator.
fn device_base_url(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().trim_end_matches('/').to_owned())
        .filter(|s| !s.is_empty())
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required env var: {key}"))
}

fn optional(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}
