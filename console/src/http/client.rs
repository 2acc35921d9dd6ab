//! HTTP client implementation

use std::time::Duration;

use plant_api::ErrorBody;
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};
use url::Url;

use crate::errors::{ConsoleError, ServerDetail};

/// HTTP client for the plant controller backend
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConsoleError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ConsoleError::ConfigError(format!("Invalid backend URL {base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConsoleError::ConfigError(format!(
                "Unsupported backend URL scheme: {}",
                parsed.scheme()
            )));
        }

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ConsoleError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        Self::decode("GET", response).await
    }

    /// Make a POST request
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ConsoleError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);

        let response = self.client.post(&url).json(body).send().await?;
        Self::decode("POST", response).await
    }

    async fn decode<T: DeserializeOwned>(
        method: &str,
        response: Response,
    ) -> Result<T, ConsoleError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!("HTTP {} failed: {} - {}", method, status, body);
            let detail = serde_json::from_str::<ErrorBody>(&body)
                .map(|body| ServerDetail::from_value(body.detail))
                .unwrap_or_default();
            return Err(ConsoleError::Rejected { status, detail });
        }

        let body = response.json().await?;
        Ok(body)
    }
}
