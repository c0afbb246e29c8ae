pub(crate) mod input;
pub(crate) mod output;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::{Client, header::AUTHORIZATION};
use secrecy::{ExposeSecret, SecretString};

use self::{
    input::OpenAiRequest,
    output::{OpenAiResponse, OpenAiStreamChunk},
};

use crate::{
    error::LlmError,
    messages::unified::{UnifiedChunk, UnifiedRequest, UnifiedResponse},
    provider::{ChatCompletionStream, Provider, error_body, http_client::default_http_client_builder, status_error},
    registry::ModelFamily,
};

/// Provider for every family speaking the OpenAI chat-completions wire
/// shape; the family supplies the base URL and the display name.
pub(crate) struct OpenAiCompatibleProvider {
    client: Client,
    base_url: String,
    name: &'static str,
    api_key: SecretString,
}

impl OpenAiCompatibleProvider {
    pub fn new(family: ModelFamily, api_key: SecretString, base_url: Option<String>) -> crate::Result<Self> {
        let client = default_http_client_builder(Default::default()).build().map_err(|e| {
            log::error!("Failed to create HTTP client for {} provider: {e}", family.name());
            LlmError::Unexpected(format!("failed to create HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            base_url: base_url.unwrap_or_else(|| family.default_base_url().to_string()),
            name: family.name(),
            api_key,
        })
    }

    fn request_builder(&self, body: &[u8]) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/chat/completions", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key.expose_secret()))
            .header("Content-Type", "application/json")
            .body(body.to_vec())
    }
}

#[async_trait]
impl Provider for OpenAiCompatibleProvider {
    async fn chat_completion(&self, request: UnifiedRequest) -> crate::Result<UnifiedResponse> {
        let wire_request = OpenAiRequest::from(request);

        let body = sonic_rs::to_vec(&wire_request).map_err(|e| {
            log::error!("Failed to serialize {} request: {e}", self.name);
            LlmError::Unexpected(format!("failed to serialize request: {e}"))
        })?;

        let response = self
            .request_builder(&body)
            .send()
            .await
            .map_err(|e| LlmError::Connection(format!("Failed to send request to {}: {e}", self.name)))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = error_body(response).await;
            log::error!("{} API error ({status}): {error_text}", self.name);

            return Err(status_error(status, error_text));
        }

        let response_text = response.text().await.map_err(|e| {
            log::error!("Failed to read {} response body: {e}", self.name);
            LlmError::Unexpected(format!("failed to read response body: {e}"))
        })?;

        let wire_response: OpenAiResponse = sonic_rs::from_str(&response_text).map_err(|e| {
            log::error!("Failed to parse {} chat completion response: {e}", self.name);
            log::debug!("Response parsing failed, length: {} bytes", response_text.len());

            LlmError::Unexpected(format!("failed to parse response: {e}"))
        })?;

        Ok(UnifiedResponse::from(wire_response))
    }

    async fn chat_completion_stream(&self, request: UnifiedRequest) -> crate::Result<ChatCompletionStream> {
        let mut wire_request = OpenAiRequest::from(request);
        wire_request.stream = true;

        let body = sonic_rs::to_vec(&wire_request).map_err(|e| {
            log::error!("Failed to serialize {} streaming request: {e}", self.name);
            LlmError::Unexpected(format!("failed to serialize request: {e}"))
        })?;

        let response = self
            .request_builder(&body)
            .send()
            .await
            .map_err(|e| LlmError::Connection(format!("Failed to send streaming request to {}: {e}", self.name)))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = error_body(response).await;
            log::error!("{} streaming API error ({status}): {error_text}", self.name);

            return Err(status_error(status, error_text));
        }

        let provider_name = self.name;

        // Chunks pass through element for element; arrival order is the one
        // invariant this translation protects.
        let chunk_stream = response.bytes_stream().eventsource().filter_map(move |event| async move {
            let Ok(event) = event else {
                log::warn!("SSE parsing error in {provider_name} stream");
                return None;
            };

            if event.data == "[DONE]" {
                return None;
            }

            let Ok(chunk) = sonic_rs::from_str::<OpenAiStreamChunk>(&event.data) else {
                log::warn!("Failed to parse {provider_name} streaming chunk");
                return None;
            };

            Some(Ok(UnifiedChunk::from(chunk)))
        });

        Ok(Box::pin(chunk_stream))
    }

    fn name(&self) -> &str {
        self.name
    }
}
