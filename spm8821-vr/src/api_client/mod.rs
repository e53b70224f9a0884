//! API client library.
//!
//! Provides a Rust client for the daemon's HTTP API, used by `vrctl`.

pub mod types;

use anyhow::{Context, Result, bail};
use reqwest::{Client as HttpClient, Response};
use serde::{Serialize, de::DeserializeOwned};

use types::{
    DriverInfo, ErrorBody, RailState, RailVoltage, RegisterValue, SetVoltageRequest,
    SetVoltageResponse, WriteRegisterRequest,
};

/// Default API base URL.
///
/// Port 8821 follows the chip's part number.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8821";

/// HTTP client for the voltage-control API.
pub struct Client {
    http: HttpClient,
    base_url: String,
}

impl Client {
    /// Create a client connecting to the default local address.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL.to_string())
    }

    /// Create a client connecting to a specific base URL.
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            http: HttpClient::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v0/{}", self.base_url, path)
    }

    pub async fn health(&self) -> Result<()> {
        let response = self
            .http
            .get(self.url("health"))
            .send()
            .await
            .context("failed to connect to voltage-control API")?;
        check(response).await?;
        Ok(())
    }

    pub async fn info(&self) -> Result<DriverInfo> {
        self.get("info").await
    }

    /// Read one rail's voltage.
    pub async fn get_voltage(&self, rail: &str) -> Result<RailVoltage> {
        self.get(&format!("rails/{}", rail)).await
    }

    /// Set one rail's voltage, returning the value read back afterwards.
    pub async fn set_voltage(&self, rail: &str, microvolts: u32) -> Result<SetVoltageResponse> {
        self.put(
            &format!("rails/{}", rail),
            &SetVoltageRequest { microvolts },
        )
        .await
    }

    pub async fn list_rails(&self) -> Result<Vec<RailState>> {
        self.get("rails").await
    }

    pub async fn read_register(&self, address: u8) -> Result<RegisterValue> {
        self.get(&format!("registers/{}", address)).await
    }

    /// Write a raw register, returning the value read back afterwards.
    pub async fn write_register(&self, address: u8, value: u8) -> Result<RegisterValue> {
        self.put(
            &format!("registers/{}", address),
            &WriteRegisterRequest { value },
        )
        .await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(self.url(path))
            .send()
            .await
            .context("failed to connect to voltage-control API")?;
        check(response)
            .await?
            .json()
            .await
            .with_context(|| format!("failed to parse response from {}", path))
    }

    async fn put<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .http
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .context("failed to connect to voltage-control API")?;
        check(response)
            .await?
            .json()
            .await
            .with_context(|| format!("failed to parse response from {}", path))
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn a non-2xx response into an error carrying the server's message.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    match response.json::<ErrorBody>().await {
        Ok(body) => bail!("{} ({})", body.message, body.error),
        Err(_) => bail!("API request failed: {}", status),
    }
}
