pub(crate) mod input;
pub(crate) mod output;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::{
    Client,
    header::{CONTENT_TYPE, HeaderMap},
};
use secrecy::{ExposeSecret, SecretString};

use self::{
    input::AnthropicRequest,
    output::{AnthropicResponse, AnthropicStreamEvent, AnthropicStreamProcessor},
};

use crate::{
    error::LlmError,
    messages::unified::{UnifiedRequest, UnifiedResponse},
    provider::{ChatCompletionStream, Provider, error_body, http_client::default_http_client_builder, status_error},
    registry::ModelFamily,
};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub(crate) struct AnthropicProvider {
    client: Client,
    base_url: String,
    name: &'static str,
    api_key: SecretString,
}

impl AnthropicProvider {
    pub fn new(api_key: SecretString, base_url: Option<String>) -> crate::Result<Self> {
        let mut headers = HeaderMap::new();

        headers.insert(
            "anthropic-version",
            ANTHROPIC_VERSION.parse().map_err(|e| {
                log::error!("Failed to parse Anthropic version header: {e}");
                LlmError::Unexpected(format!("failed to parse default header: {e}"))
            })?,
        );

        let client = default_http_client_builder(headers).build().map_err(|e| {
            log::error!("Failed to create HTTP client for Anthropic provider: {e}");
            LlmError::Unexpected(format!("failed to create HTTP client: {e}"))
        })?;

        Ok(Self {
            client,
            base_url: base_url.unwrap_or_else(|| ModelFamily::Anthropic.default_base_url().to_string()),
            name: ModelFamily::Anthropic.name(),
            api_key,
        })
    }

    fn request_builder(&self, body: Vec<u8>) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
    }
}

#[async_trait]
impl Provider for AnthropicProvider {
    async fn chat_completion(&self, request: UnifiedRequest) -> crate::Result<UnifiedResponse> {
        let wire_request = AnthropicRequest::from(request);

        let body = sonic_rs::to_vec(&wire_request).map_err(|e| {
            log::error!("Failed to serialize Anthropic request: {e}");
            LlmError::Unexpected(format!("failed to serialize request: {e}"))
        })?;

        let response = self
            .request_builder(body)
            .send()
            .await
            .map_err(|e| LlmError::Connection(format!("Failed to send request to Anthropic: {e}")))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = error_body(response).await;
            log::error!("Anthropic API error ({status}): {error_text}");

            return Err(status_error(status, error_text));
        }

        let response_text = response.text().await.map_err(|e| {
            log::error!("Failed to read Anthropic response body: {e}");
            LlmError::Unexpected(format!("failed to read response body: {e}"))
        })?;

        let wire_response: AnthropicResponse = sonic_rs::from_str(&response_text).map_err(|e| {
            log::error!("Failed to parse Anthropic chat completion response: {e}");
            log::debug!("Response parsing failed, length: {} bytes", response_text.len());

            LlmError::Unexpected(format!("failed to parse response: {e}"))
        })?;

        Ok(UnifiedResponse::from(wire_response))
    }

    async fn chat_completion_stream(&self, request: UnifiedRequest) -> crate::Result<ChatCompletionStream> {
        let mut wire_request = AnthropicRequest::from(request);
        wire_request.stream = true;

        let body = sonic_rs::to_vec(&wire_request).map_err(|e| {
            log::error!("Failed to serialize Anthropic streaming request: {e}");
            LlmError::Unexpected(format!("failed to serialize request: {e}"))
        })?;

        let response = self
            .request_builder(body)
            .send()
            .await
            .map_err(|e| LlmError::Connection(format!("Failed to send streaming request to Anthropic: {e}")))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = error_body(response).await;
            log::error!("Anthropic streaming API error ({status}): {error_text}");

            return Err(status_error(status, error_text));
        }

        let event_stream = response.bytes_stream().eventsource();
        let processor = AnthropicStreamProcessor::new(self.name.to_string());

        // The processor is a state machine over typed events; unfold carries
        // it across polls. A protocol violation is yielded once, after which
        // the sequence ends.
        let chunk_stream = futures::stream::unfold(
            (Box::pin(event_stream), processor, false),
            |(mut stream, mut processor, failed)| async move {
                if failed {
                    return None;
                }

                loop {
                    let event = stream.next().await?;

                    let Ok(event) = event else {
                        log::warn!("SSE parsing error in Anthropic stream");
                        continue;
                    };

                    let anthropic_event = match sonic_rs::from_str::<AnthropicStreamEvent>(&event.data) {
                        Ok(event) => event,
                        Err(_) => {
                            log::warn!("Failed to parse Anthropic streaming event");
                            continue;
                        }
                    };

                    match processor.process_event(anthropic_event) {
                        Ok(Some(chunk)) => return Some((Ok(chunk), (stream, processor, false))),
                        Ok(None) => continue,
                        Err(e) => return Some((Err(e), (stream, processor, true))),
                    }
                }
            },
        );

        Ok(Box::pin(chunk_stream))
    }

    fn name(&self) -> &str {
        self.name
    }
}
