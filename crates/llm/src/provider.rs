//! Vendor providers.
//!
//! One provider per wire protocol. Each is a typed adapter around a
//! transport client: the `input` module holds the vendor-native request
//! structs and the conversion from the unified request, the `output` module
//! holds the vendor-native response/stream-event structs and the conversion
//! back. Parsing happens exactly once, at the transport boundary; nothing
//! downstream performs presence checks on vendor objects.

pub(crate) mod anthropic;
mod http_client;
pub(crate) mod mistral;
pub(crate) mod openai;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use crate::{
    error::LlmError,
    messages::unified::{UnifiedChunk, UnifiedRequest, UnifiedResponse},
};

/// Lazy, finite, single-pass sequence of unified chunks. Exhaustion is
/// terminal; the stream is not restartable.
pub type ChatCompletionStream = Pin<Box<dyn Stream<Item = crate::Result<UnifiedChunk>> + Send>>;

/// One vendor family's transport and translation surface.
#[async_trait]
pub(crate) trait Provider: Send + Sync {
    async fn chat_completion(&self, request: UnifiedRequest) -> crate::Result<UnifiedResponse>;

    async fn chat_completion_stream(&self, request: UnifiedRequest) -> crate::Result<ChatCompletionStream>;

    fn name(&self) -> &str;
}

/// Map a non-success vendor status to the adapter taxonomy.
///
/// Rate limiting keeps its own variant so callers can back off; everything
/// else surfaces as a status error with the vendor's code and message
/// preserved.
pub(crate) fn status_error(status: reqwest::StatusCode, message: String) -> LlmError {
    match status.as_u16() {
        429 => LlmError::RateLimited { message },
        status => LlmError::ApiStatus { status, message },
    }
}

/// Read the body of a failed vendor response for error reporting.
pub(crate) async fn error_body(response: reqwest::Response) -> String {
    response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string())
}
