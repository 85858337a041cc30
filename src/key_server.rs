//! Fetching the API key from the local key server.

use std::time::Duration;

use reqwest::Client as ReqwestClient;
use reqwest::header::{self, HeaderValue};
use serde::Deserialize;
use url::Url;

use crate::client::DEFAULT_TIMEOUT;
use crate::error::{Error, Result};
use crate::types::Credential;

/// Default key endpoint.
pub const DEFAULT_KEY_URL: &str = "http://localhost:3001/get-api-key";

/// A single-shot source of credentials.  Retrying is the caller's business.
#[async_trait::async_trait]
pub trait KeySource: Send + Sync {
    /// Where the key comes from, for diagnostics.
    fn describe(&self) -> String;

    /// Make one attempt at fetching a credential.
    async fn fetch(&self) -> Result<Credential>;
}

/// HTTP client for the local key server.
///
/// Expects `GET <url>` to answer `{"apiKey": "<token>"}`.
#[derive(Debug, Clone)]
pub struct KeyServer {
    client: ReqwestClient,
    url: Url,
    timeout: Duration,
}

#[derive(Deserialize)]
struct KeyResponse {
    #[serde(rename = "apiKey")]
    api_key: Option<String>,
}

impl KeyServer {
    /// Create a client for the default key endpoint.
    pub fn new() -> Result<Self> {
        Self::with_options(None, None)
    }

    /// Create a client for a custom endpoint and timeout.
    pub fn with_options(url: Option<&str>, timeout: Option<Duration>) -> Result<Self> {
        let url = Url::parse(url.unwrap_or(DEFAULT_KEY_URL))?;
        let timeout = timeout.unwrap_or(DEFAULT_TIMEOUT);
        let client = ReqwestClient::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::http_client(
                    format!("Failed to build HTTP client: {}", e),
                    Some(Box::new(e)),
                )
            })?;
        Ok(Self {
            client,
            url,
            timeout,
        })
    }

    /// The key endpoint.
    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait::async_trait]
impl KeySource for KeyServer {
    fn describe(&self) -> String {
        self.url.to_string()
    }

    async fn fetch(&self) -> Result<Credential> {
        let response = self
            .client
            .get(self.url.clone())
            .header(header::ACCEPT, HeaderValue::from_static("application/json"))
            .send()
            .await
            .map_err(|e| Error::from_send(e, self.timeout))?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("unexpected status");
            return Err(Error::key_server(status.as_u16(), reason));
        }

        let body = response.text().await.map_err(|e| {
            Error::http_client(
                format!("Failed to read key server response: {e}"),
                Some(Box::new(e)),
            )
        })?;
        parse_key_response(&body)
    }
}

fn parse_key_response(body: &str) -> Result<Credential> {
    let parsed: KeyResponse = serde_json::from_str(body)?;
    parsed
        .api_key
        .and_then(Credential::new)
        .ok_or_else(|| {
            Error::malformed_response("key server response has no usable apiKey")
        })
}
