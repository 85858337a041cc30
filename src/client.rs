use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client as ReqwestClient, Response, header};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};
use crate::observability::{COMPLETION_DURATION, COMPLETION_ERRORS, COMPLETION_REQUESTS};
use crate::types::{ChatCompletion, ChatCompletionParams, Credential};

/// Default chat completions endpoint.
pub const DEFAULT_API_URL: &str = "https://api.deepseek.com/v1/chat/completions";

/// Default request timeout for both HTTP clients.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Something that can turn a completion request into a completion.
///
/// [`DeepSeek`] is the HTTP implementation; tests substitute scripted ones.
#[async_trait::async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Send `params`, authenticated with `credential`, and return the parsed completion.
    async fn complete(
        &self,
        credential: &Credential,
        params: &ChatCompletionParams,
    ) -> Result<ChatCompletion>;
}

/// Client for the DeepSeek chat completions API.
#[derive(Debug, Clone)]
pub struct DeepSeek {
    client: ReqwestClient,
    api_url: Url,
    timeout: Duration,
}

impl DeepSeek {
    /// Create a client for the default endpoint.
    pub fn new() -> Result<Self> {
        Self::with_options(None, None)
    }

    /// Create a new client with custom settings.
    pub fn with_options(api_url: Option<&str>, timeout: Option<Duration>) -> Result<Self> {
        let api_url = Url::parse(api_url.unwrap_or(DEFAULT_API_URL))?;
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
            api_url,
            timeout,
        })
    }

    /// The endpoint requests are posted to.
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    /// Create and return the headers for a completion request.
    fn headers(credential: &Credential) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", credential.expose()))
            .map_err(|e| {
                Error::http_client(
                    "credential is not a valid header value",
                    Some(Box::new(e)),
                )
            })?;
        bearer.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, bearer);
        Ok(headers)
    }

    /// Process API response errors and convert to our Error type
    async fn process_error_response(response: Response) -> Error {
        let status_code = response.status().as_u16();

        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|val| val.to_str().ok())
            .map(String::from);

        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|val| val.to_str().ok())
            .and_then(|val| val.parse::<u64>().ok());

        #[derive(Deserialize)]
        struct ErrorResponse {
            error: Option<ErrorDetail>,
        }

        #[derive(Deserialize)]
        struct ErrorDetail {
            #[serde(rename = "type")]
            error_type: Option<String>,
            message: Option<String>,
        }

        let error_body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return Error::http_client(
                    format!("Failed to read error response (HTTP {status_code}): {e}"),
                    Some(Box::new(e)),
                );
            }
        };

        let detail = serde_json::from_str::<ErrorResponse>(&error_body)
            .ok()
            .and_then(|e| e.error);
        let error_type = detail.as_ref().and_then(|e| e.error_type.clone());
        let error_message = detail
            .and_then(|e| e.message)
            .unwrap_or_else(|| format!("HTTP status {status_code}: {error_body}"));

        match status_code {
            401 => Error::authentication(error_message, request_id),
            _ => Error::status(
                status_code,
                error_type,
                error_message,
                request_id,
                retry_after,
            ),
        }
    }

    async fn send(
        &self,
        credential: &Credential,
        params: &ChatCompletionParams,
    ) -> Result<ChatCompletion> {
        let response = self
            .client
            .post(self.api_url.clone())
            .headers(Self::headers(credential)?)
            .json(params)
            .send()
            .await
            .map_err(|e| Error::from_send(e, self.timeout))?;

        if !response.status().is_success() {
            return Err(Self::process_error_response(response).await);
        }

        response
            .json::<ChatCompletion>()
            .await
            .map_err(|e| Error::malformed_caused_by(format!("Failed to parse response: {e}"), e))
    }
}

#[async_trait::async_trait]
impl CompletionBackend for DeepSeek {
    async fn complete(
        &self,
        credential: &Credential,
        params: &ChatCompletionParams,
    ) -> Result<ChatCompletion> {
        COMPLETION_REQUESTS.click();
        let start = Instant::now();
        let result = self.send(credential, params).await;
        COMPLETION_DURATION.add(start.elapsed().as_secs_f64());
        if result.is_err() {
            COMPLETION_ERRORS.click();
        }
        result
    }
}
