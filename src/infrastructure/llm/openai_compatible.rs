use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::{Instrument, Span, debug, warn};

use super::http_client::{HttpClientTrait, HttpError};
use super::retry::RetryPolicy;
use super::sse::{DEFAULT_FLUSH_THRESHOLD, decode_sse};
use crate::domain::llm::{
    ChunkStream, GenerationRequest, ModelInfo, ProviderClient, ProviderError, ProviderPresets,
    Target,
};

pub const DEFAULT_REFERER: &str = "http://localhost";
pub const DEFAULT_TITLE: &str = "PMP Codegen";

/// Attribution headers sent with every request
#[derive(Debug, Clone)]
pub struct Attribution {
    pub referer: String,
    pub title: String,
}

impl Default for Attribution {
    fn default() -> Self {
        Self {
            referer: DEFAULT_REFERER.to_string(),
            title: DEFAULT_TITLE.to_string(),
        }
    }
}

/// Client for OpenAI-compatible chat-completion APIs (OpenRouter, OpenAI,
/// Groq, Mistral, local servers).
///
/// POST requests are sent once; only model listing is retried.
#[derive(Debug)]
pub struct OpenAiCompatibleClient<C: HttpClientTrait> {
    client: C,
    presets: ProviderPresets,
    retry: RetryPolicy,
    flush_threshold: usize,
    attribution: Attribution,
    span: Span,
}

impl<C: HttpClientTrait> OpenAiCompatibleClient<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            presets: ProviderPresets::builtin(),
            retry: RetryPolicy::default(),
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            attribution: Attribution::default(),
            span: tracing::info_span!("provider_client"),
        }
    }

    pub fn with_presets(mut self, presets: ProviderPresets) -> Self {
        self.presets = presets;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_flush_threshold(mut self, threshold: usize) -> Self {
        self.flush_threshold = threshold.max(1);
        self
    }

    pub fn with_attribution(mut self, attribution: Attribution) -> Self {
        self.attribution = attribution;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn presets(&self) -> &ProviderPresets {
        &self.presets
    }

    /// Look up one model in the target provider's listing
    pub async fn find_model(&self, target: &Target, model_id: &str) -> Option<ModelInfo> {
        self.list_models(target)
            .await
            .into_iter()
            .find(|model| model.id == model_id)
    }

    /// True when the provider answers the model listing with at least one model
    pub async fn validate_credentials(&self, target: &Target) -> bool {
        !self.list_models(target).await.is_empty()
    }

    fn base_url(&self, target: &Target) -> Result<String, ProviderError> {
        target
            .base_url()
            .or_else(|| self.presets.base_url_for(target.provider_id()))
            .map(|url| url.trim_end_matches('/').to_string())
            .ok_or_else(|| {
                ProviderError::configuration(
                    target.id(),
                    format!(
                        "No base URL configured for provider '{}'",
                        target.provider_id()
                    ),
                )
            })
    }

    fn build_request(&self, target: &Target, request: &GenerationRequest, stream: bool) -> serde_json::Value {
        serde_json::json!({
            "model": target.model(),
            "messages": request.messages(),
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
            "stream": stream,
        })
    }

    fn auth_header(target: &Target) -> String {
        format!("Bearer {}", target.api_key().expose_secret())
    }

    fn headers<'a>(&'a self, auth: &'a str) -> Vec<(&'a str, &'a str)> {
        vec![
            ("Authorization", auth),
            ("Content-Type", "application/json"),
            ("HTTP-Referer", self.attribution.referer.as_str()),
            ("X-Title", self.attribution.title.as_str()),
        ]
    }

    fn parse_response(target_id: &str, json: serde_json::Value) -> Result<String, ProviderError> {
        let response: ChatResponse = serde_json::from_value(json).map_err(|e| {
            ProviderError::malformed(target_id, format!("Failed to parse response: {}", e))
        })?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::malformed(target_id, "No choices in response"))?;

        Ok(choice.message.content.unwrap_or_default())
    }

    async fn send_completion(
        &self,
        target: &Target,
        request: &GenerationRequest,
    ) -> Result<String, ProviderError> {
        let target_id = target.id();
        let url = format!("{}/chat/completions", self.base_url(target)?);
        let body = self.build_request(target, request, false);
        let auth = Self::auth_header(target);

        debug!(target_id = %target_id, "Sending completion request");

        let response = self
            .client
            .post_json(&url, self.headers(&auth), &body, target.timeout())
            .await
            .map_err(|e| map_http_error(&target_id, e))?;

        Self::parse_response(&target_id, response)
    }

    async fn open_stream(
        &self,
        target: &Target,
        request: &GenerationRequest,
    ) -> Result<ChunkStream, ProviderError> {
        let target_id = target.id();
        let url = format!("{}/chat/completions", self.base_url(target)?);
        let body = self.build_request(target, request, true);
        let auth = Self::auth_header(target);

        debug!(target_id = %target_id, "Opening completion stream");

        let bytes = self
            .client
            .post_json_stream(&url, self.headers(&auth), &body, target.timeout())
            .await
            .map_err(|e| map_http_error(&target_id, e))?;

        Ok(decode_sse(
            target_id,
            bytes,
            self.flush_threshold,
            target.timeout(),
        ))
    }

    async fn fetch_models(&self, target: &Target) -> Result<Vec<ModelInfo>, ProviderError> {
        let target_id = target.id();
        let url = format!("{}/models", self.base_url(target)?);
        let auth = Self::auth_header(target);

        let (url, auth) = (url.as_str(), auth.as_str());

        let json = self
            .retry
            .run("list_models", move || {
                self.client.get_json(url, self.headers(auth), target.timeout())
            })
            .await
            .map_err(|e| map_http_error(&target_id, e))?;

        let response: ModelsResponse = serde_json::from_value(json).map_err(|e| {
            ProviderError::malformed(&target_id, format!("Failed to parse model list: {}", e))
        })?;

        Ok(response
            .data
            .into_iter()
            .filter_map(|entry| serde_json::from_value(entry).ok())
            .collect())
    }
}

fn map_http_error(target_id: &str, error: HttpError) -> ProviderError {
    match error {
        HttpError::Status { status, body } => ProviderError::http(target_id, status, body),
        HttpError::Timeout(timeout) => ProviderError::timeout(target_id, timeout.as_millis() as u64),
        HttpError::Transport(message) => ProviderError::transport(target_id, message),
        HttpError::Decode(message) => ProviderError::malformed(target_id, message),
    }
}

#[async_trait]
impl<C: HttpClientTrait> ProviderClient for OpenAiCompatibleClient<C> {
    async fn generate(
        &self,
        target: &Target,
        request: &GenerationRequest,
    ) -> Result<String, ProviderError> {
        self.send_completion(target, request)
            .instrument(self.span.clone())
            .await
    }

    async fn generate_stream(
        &self,
        target: &Target,
        request: &GenerationRequest,
    ) -> Result<ChunkStream, ProviderError> {
        self.open_stream(target, request)
            .instrument(self.span.clone())
            .await
    }

    async fn list_models(&self, target: &Target) -> Vec<ModelInfo> {
        match self.fetch_models(target).instrument(self.span.clone()).await {
            Ok(models) => models,
            Err(e) => {
                warn!(target_id = %target.id(), error = %e, "Failed to list models");
                Vec::new()
            }
        }
    }
}

// Wire types

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<serde_json::Value>,
}
