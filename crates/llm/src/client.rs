use secrecy::SecretString;

use crate::{
    messages::unified::{UnifiedRequest, UnifiedResponse},
    provider::{
        ChatCompletionStream, Provider, anthropic::AnthropicProvider, mistral::MistralProvider,
        openai::OpenAiCompatibleProvider,
    },
    registry::{self, WireProtocol},
};

/// The dispatch core.
///
/// Holds a credential and routes each call to the vendor family serving the
/// requested model: registry lookup, temperature clamping, vendor-mandatory
/// field injection, provider construction, transport invocation. The client
/// keeps no per-conversation state; every call is a pure function of the
/// request it is handed.
pub struct Client {
    api_key: SecretString,
    base_url: Option<String>,
}

impl Client {
    pub fn new(api_key: impl Into<SecretString>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: None,
        }
    }

    /// Override the vendor base URL. Meant for self-hosted gateways and
    /// tests; the default is the family's public endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Complete a turn without streaming.
    pub async fn completions(&self, request: UnifiedRequest) -> crate::Result<UnifiedResponse> {
        let (provider, request) = self.prepare(request)?;

        log::debug!("Dispatching completion for {} to {}", request.model, provider.name());

        provider.chat_completion(request).await
    }

    /// Complete a turn as a lazy chunk stream. The stream is single-pass and
    /// ends at the chunk carrying `finish_reason`; dropping it cancels the
    /// turn.
    pub async fn completions_stream(&self, request: UnifiedRequest) -> crate::Result<ChatCompletionStream> {
        let (provider, request) = self.prepare(request)?;

        log::debug!("Dispatching streaming completion for {} to {}", request.model, provider.name());

        provider.chat_completion_stream(request).await
    }

    fn prepare(&self, mut request: UnifiedRequest) -> crate::Result<(Box<dyn Provider>, UnifiedRequest)> {
        let family = registry::resolve_family(&request.model)?;

        // Out-of-range temperatures are clamped, not rejected.
        request.temperature = request.temperature.min(family.max_temperature());

        // max_tokens is mandatory on the Anthropic wire; the registry value
        // fills it unless the caller chose a tighter one.
        if family.wire_protocol() == WireProtocol::Anthropic && request.max_tokens.is_none() {
            request.max_tokens = registry::max_output_tokens(&request.model);
        }

        let api_key = self.api_key.clone();
        let base_url = self.base_url.clone();

        let provider: Box<dyn Provider> = match family.wire_protocol() {
            WireProtocol::OpenAiCompatible => Box::new(OpenAiCompatibleProvider::new(family, api_key, base_url)?),
            WireProtocol::Anthropic => Box::new(AnthropicProvider::new(api_key, base_url)?),
            WireProtocol::Mistral => Box::new(MistralProvider::new(api_key, base_url)?),
        };

        Ok((provider, request))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        LlmError, StreamAccumulator,
        messages::unified::{FinishReason, UnifiedMessage},
    };
    use axum::{
        Json, Router,
        extract::State,
        http::{HeaderMap, StatusCode, header},
        response::IntoResponse,
        routing::post,
    };
    use futures::StreamExt;
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};
    use tokio::net::TcpListener;

    #[derive(Clone, Default)]
    struct CaptureState {
        captured: Arc<Mutex<Option<(HeaderMap, Value)>>>,
    }

    async fn spawn_app(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{address}")
    }

    fn request(model: &str) -> UnifiedRequest {
        UnifiedRequest::new(model, vec![UnifiedMessage::user("2+3?")])
    }

    #[tokio::test]
    async fn unsupported_model_fails_before_any_transport() {
        let client = Client::new("test-key".to_string());

        let err = client.completions(request("gpt-neo-x")).await.unwrap_err();

        assert!(matches!(err, LlmError::UnsupportedModel(model) if model == "gpt-neo-x"));
    }

    #[tokio::test]
    async fn temperature_above_the_anthropic_ceiling_is_clamped_on_the_wire() {
        let state = CaptureState::default();

        async fn handle(State(state): State<CaptureState>, headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
            *state.captured.lock().unwrap() = Some((headers, body));

            Json(json!({
                "id": "msg_1",
                "type": "message",
                "role": "assistant",
                "model": "claude-3-5-sonnet-latest",
                "content": [{ "type": "text", "text": "5" }],
                "stop_reason": "end_turn",
                "usage": { "input_tokens": 1, "output_tokens": 1 }
            }))
        }

        let app = Router::new().route("/messages", post(handle)).with_state(state.clone());
        let base_url = spawn_app(app).await;

        let client = Client::new("test-key".to_string()).with_base_url(base_url);

        let mut req = request("claude-3-5-sonnet-latest");
        req.temperature = 1.8;

        client.completions(req).await.unwrap();

        let (headers, body) = state.captured.lock().unwrap().clone().expect("captured request");

        assert_eq!(body["temperature"], json!(1.0));
        // The registry fills the mandatory output ceiling for this family.
        assert_eq!(body["max_tokens"], json!(8192));
        assert_eq!(headers.get("x-api-key").unwrap(), "test-key");
        assert_eq!(headers.get("anthropic-version").unwrap(), "2023-06-01");
    }

    #[tokio::test]
    async fn openai_temperature_below_ceiling_is_untouched() {
        let state = CaptureState::default();

        async fn handle(State(state): State<CaptureState>, headers: HeaderMap, Json(body): Json<Value>) -> impl IntoResponse {
            *state.captured.lock().unwrap() = Some((headers, body));

            Json(json!({
                "id": "chatcmpl-1",
                "model": "gpt-4o-mini",
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": "5" },
                    "finish_reason": "stop"
                }]
            }))
        }

        let app = Router::new()
            .route("/chat/completions", post(handle))
            .with_state(state.clone());
        let base_url = spawn_app(app).await;

        let client = Client::new("test-key".to_string()).with_base_url(base_url);

        let mut req = request("gpt-4o-mini");
        req.temperature = 1.8;

        let response = client.completions(req).await.unwrap();

        assert_eq!(response.message().unwrap().content, "5");

        let (headers, body) = state.captured.lock().unwrap().clone().expect("captured request");

        assert_eq!(body["temperature"], json!(1.8));
        assert!(body.get("max_tokens").is_none());
        assert_eq!(headers.get("authorization").unwrap(), "Bearer test-key");
    }

    #[tokio::test]
    async fn rate_limit_response_maps_to_rate_limited() {
        async fn handle() -> impl IntoResponse {
            (StatusCode::TOO_MANY_REQUESTS, "slow down")
        }

        let app = Router::new().route("/chat/completions", post(handle));
        let base_url = spawn_app(app).await;

        let client = Client::new("test-key".to_string()).with_base_url(base_url);

        let err = client.completions(request("gpt-4o-mini")).await.unwrap_err();

        assert!(matches!(err, LlmError::RateLimited { message } if message == "slow down"));
    }

    #[tokio::test]
    async fn other_rejections_keep_the_vendor_status() {
        async fn handle() -> impl IntoResponse {
            (StatusCode::BAD_REQUEST, "bad tool schema")
        }

        let app = Router::new().route("/chat/completions", post(handle));
        let base_url = spawn_app(app).await;

        let client = Client::new("test-key".to_string()).with_base_url(base_url);

        let err = client.completions(request("grok-3-latest")).await.unwrap_err();

        assert!(matches!(
            err,
            LlmError::ApiStatus { status: 400, message } if message == "bad tool schema"
        ));
    }

    #[tokio::test]
    async fn unreachable_vendor_maps_to_connection_error() {
        // Nothing listens on port 1.
        let client = Client::new("test-key".to_string()).with_base_url("http://127.0.0.1:1");

        let err = client.completions(request("mistral-large-latest")).await.unwrap_err();

        assert!(matches!(err, LlmError::Connection(_)));
    }

    #[tokio::test]
    async fn openai_stream_passes_chunks_through_in_order() {
        async fn handle() -> impl IntoResponse {
            let body = concat!(
                "data: {\"id\":\"chatcmpl-2\",\"model\":\"gpt-4o-mini\",\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n\n",
                "data: {\"id\":\"chatcmpl-2\",\"model\":\"gpt-4o-mini\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"The \"}}]}\n\n",
                "data: {\"id\":\"chatcmpl-2\",\"model\":\"gpt-4o-mini\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"answer \"}}]}\n\n",
                "data: {\"id\":\"chatcmpl-2\",\"model\":\"gpt-4o-mini\",\"choices\":[{\"index\":0,\"delta\":{\"content\":\"is 5.\"}}]}\n\n",
                "data: {\"id\":\"chatcmpl-2\",\"model\":\"gpt-4o-mini\",\"choices\":[{\"index\":0,\"delta\":{},\"finish_reason\":\"stop\"}]}\n\n",
                "data: [DONE]\n\n",
            );

            ([(header::CONTENT_TYPE, "text/event-stream")], body)
        }

        let app = Router::new().route("/chat/completions", post(handle));
        let base_url = spawn_app(app).await;

        let client = Client::new("test-key".to_string()).with_base_url(base_url);

        let mut stream = client.completions_stream(request("gpt-4o-mini")).await.unwrap();

        let mut contents = Vec::new();
        let mut finish_reasons = Vec::new();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.unwrap();

            if let Some(content) = &chunk.choices[0].delta.content {
                contents.push(content.clone());
            }
            if let Some(reason) = &chunk.choices[0].finish_reason {
                finish_reasons.push(reason.clone());
            }
        }

        assert_eq!(contents, ["", "The ", "answer ", "is 5."]);
        // The terminal chunk is last and never duplicated.
        assert_eq!(finish_reasons, [FinishReason::Stop]);
    }

    #[tokio::test]
    async fn anthropic_stream_accumulates_into_a_complete_turn() {
        async fn handle() -> impl IntoResponse {
            let body = concat!(
                "event: message_start\n",
                "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_6\",\"model\":\"claude-3-5-sonnet-latest\",\"role\":\"assistant\",\"content\":[],\"usage\":{\"input_tokens\":9,\"output_tokens\":0}}}\n\n",
                "event: content_block_start\n",
                "data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"tool_use\",\"id\":\"toolu_5\",\"name\":\"calculator\"}}\n\n",
                "event: content_block_delta\n",
                "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"input_json_delta\",\"partial_json\":\"{\\\"operation\\\":\\\"add\\\",\"}}\n\n",
                "event: content_block_delta\n",
                "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"input_json_delta\",\"partial_json\":\"\\\"operand1\\\":2,\\\"operand2\\\":3}\"}}\n\n",
                "event: content_block_stop\n",
                "data: {\"type\":\"content_block_stop\",\"index\":0}\n\n",
                "event: message_delta\n",
                "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"tool_use\"},\"usage\":{\"output_tokens\":18}}\n\n",
                "event: message_stop\n",
                "data: {\"type\":\"message_stop\"}\n\n",
            );

            ([(header::CONTENT_TYPE, "text/event-stream")], body)
        }

        let app = Router::new().route("/messages", post(handle));
        let base_url = spawn_app(app).await;

        let client = Client::new("test-key".to_string()).with_base_url(base_url);

        let mut stream = client
            .completions_stream(request("claude-3-5-sonnet-latest"))
            .await
            .unwrap();

        let mut accumulator = StreamAccumulator::new();
        let mut finished = None;

        while let Some(chunk) = stream.next().await {
            if let Some(message) = accumulator.push(&chunk.unwrap()).unwrap() {
                finished = Some(message);
            }
        }

        let message = finished.expect("turn should finish");
        let calls = message.tool_calls.as_ref().unwrap();

        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].function.name, "calculator");
        assert_eq!(
            calls[0].function.arguments,
            r#"{"operation":"add","operand1":2,"operand2":3}"#
        );
    }
}
