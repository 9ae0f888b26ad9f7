use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::time::Duration;
use thiserror::Error;

/// Stream type for HTTP response bodies
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

/// Transport-level failures, mapped to `ProviderError` by the provider client
#[derive(Debug, Clone, Error)]
pub enum HttpError {
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl HttpError {
    /// Whether an idempotent request may be retried after this error
    pub fn is_retryable(&self) -> bool {
        match self {
            HttpError::Status { status, .. } => matches!(status, 429 | 500 | 502 | 503 | 504),
            HttpError::Timeout(_) | HttpError::Transport(_) => true,
            HttpError::Decode(_) => false,
        }
    }

    fn from_reqwest(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            HttpError::Timeout(timeout)
        } else if error.is_decode() {
            HttpError::Decode(error.to_string())
        } else {
            HttpError::Transport(error.to_string())
        }
    }
}

/// Trait for HTTP client operations (for mocking)
#[async_trait]
pub trait HttpClientTrait: Send + Sync + std::fmt::Debug {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value, HttpError>;

    /// POST and hand back the body as a byte stream once the headers are in.
    /// `timeout` bounds the wait for headers only; body reads are bounded by
    /// the SSE decoder.
    async fn post_json_stream(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<ByteStream, HttpError>;

    async fn get_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        timeout: Duration,
    ) -> Result<serde_json::Value, HttpError>;
}

/// Real HTTP client using reqwest
#[derive(Debug, Clone, Default)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn apply_headers(
        mut request: reqwest::RequestBuilder,
        headers: Vec<(&str, &str)>,
    ) -> reqwest::RequestBuilder {
        for (key, value) in headers {
            request = request.header(key, value);
        }
        request
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, HttpError> {
        let status = response.status();

        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(HttpError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }
}

#[async_trait]
impl HttpClientTrait for HttpClient {
    async fn post_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<serde_json::Value, HttpError> {
        let request = Self::apply_headers(self.client.post(url), headers)
            .timeout(timeout)
            .json(body);

        let response = request
            .send()
            .await
            .map_err(|e| HttpError::from_reqwest(e, timeout))?;

        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| HttpError::from_reqwest(e, timeout))
    }

    async fn post_json_stream(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        body: &serde_json::Value,
        timeout: Duration,
    ) -> Result<ByteStream, HttpError> {
        let request = Self::apply_headers(self.client.post(url), headers).json(body);

        let response = tokio::time::timeout(timeout, request.send())
            .await
            .map_err(|_| HttpError::Timeout(timeout))?
            .map_err(|e| HttpError::from_reqwest(e, timeout))?;

        let response = Self::check_status(response).await?;

        let stream = response
            .bytes_stream()
            .map(|result| result.map_err(|e| HttpError::Transport(e.to_string())));

        Ok(Box::pin(stream))
    }

    async fn get_json(
        &self,
        url: &str,
        headers: Vec<(&str, &str)>,
        timeout: Duration,
    ) -> Result<serde_json::Value, HttpError> {
        let response = Self::apply_headers(self.client.get(url), headers)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| HttpError::from_reqwest(e, timeout))?;

        Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(|e| HttpError::from_reqwest(e, timeout))
    }
}
