use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::LlmError,
    messages::unified::{
        ChatRole, FinishReason, FunctionCall, FunctionDelta, FunctionStart, StreamingToolCall, ToolCall, ToolCallType,
        UnifiedChoice, UnifiedChoiceDelta, UnifiedChunk, UnifiedMessage, UnifiedMessageDelta, UnifiedResponse, Usage,
    },
};

/// Content block type in an Anthropic response.
#[derive(Debug, Deserialize, PartialEq)]
pub(crate) enum ContentType {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "tool_use")]
    ToolUse,
    /// Any other content type not yet known, kept for forward compatibility.
    #[serde(untagged)]
    Other(String),
}

/// Why the model stopped generating.
#[derive(Debug, Deserialize, PartialEq)]
pub(crate) enum StopReason {
    #[serde(rename = "end_turn")]
    EndTurn,
    #[serde(rename = "max_tokens")]
    MaxTokens,
    #[serde(rename = "stop_sequence")]
    StopSequence,
    #[serde(rename = "tool_use")]
    ToolUse,
    #[serde(rename = "refusal")]
    Refusal,
    #[serde(untagged)]
    Other(String),
}

impl From<StopReason> for FinishReason {
    fn from(reason: StopReason) -> Self {
        match reason {
            StopReason::EndTurn | StopReason::StopSequence => FinishReason::Stop,
            StopReason::MaxTokens => FinishReason::Length,
            StopReason::ToolUse => FinishReason::ToolCalls,
            StopReason::Refusal => FinishReason::ContentFilter,
            StopReason::Other(reason) => {
                log::warn!("Unknown stop reason from Anthropic: {reason}");
                FinishReason::Other(reason)
            }
        }
    }
}

/// Non-streaming response from the Anthropic `/messages` endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct AnthropicResponse {
    pub id: String,
    pub model: String,
    pub content: Vec<AnthropicContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<StopReason>,
    pub usage: AnthropicUsage,
}

/// One content block. Text and tool-use blocks populate different fields;
/// unknown types deserialize without failing the whole response.
#[derive(Debug, Deserialize)]
pub(crate) struct AnthropicContentBlock {
    #[serde(rename = "type")]
    pub kind: ContentType,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub input: Option<Value>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub(crate) struct AnthropicUsage {
    /// Omitted in streaming message_delta events.
    #[serde(default)]
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl From<AnthropicUsage> for Usage {
    fn from(usage: AnthropicUsage) -> Self {
        Self {
            prompt_tokens: usage.input_tokens,
            completion_tokens: usage.output_tokens,
            total_tokens: usage.input_tokens + usage.output_tokens,
        }
    }
}

impl From<AnthropicResponse> for UnifiedResponse {
    fn from(response: AnthropicResponse) -> Self {
        // Flatten the block list: text blocks concatenate into content,
        // tool-use blocks become tool calls in encountered order.
        let mut content = String::new();
        let mut tool_calls = Vec::new();

        for block in response.content {
            match block.kind {
                ContentType::Text => content.push_str(block.text.as_deref().unwrap_or_default()),
                ContentType::ToolUse => tool_calls.push(ToolCall {
                    id: block
                        .id
                        .unwrap_or_else(|| format!("toolu_{}", uuid::Uuid::new_v4())),
                    kind: ToolCallType::Function,
                    function: FunctionCall {
                        name: block.name.unwrap_or_default(),
                        arguments: block
                            .input
                            .as_ref()
                            .map(|input| sonic_rs::to_string(input).unwrap_or_else(|_| "{}".to_string()))
                            .unwrap_or_else(|| "{}".to_string()),
                    },
                }),
                ContentType::Other(ref kind) => {
                    log::warn!("Ignoring unsupported Anthropic content block type: {kind}");
                }
            }
        }

        let message = UnifiedMessage {
            role: ChatRole::Assistant,
            content,
            reasoning_content: None,
            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
            tool_call_id: None,
        };

        Self {
            id: response.id,
            model: response.model,
            choices: vec![UnifiedChoice {
                index: 0,
                message,
                finish_reason: response.stop_reason.map(Into::into),
            }],
            usage: Some(response.usage.into()),
        }
    }
}

// Streaming types for Anthropic SSE responses.

/// Anthropic streaming event.
///
/// Event flow for a typical response:
/// 1. `message_start` — message metadata, empty content
/// 2. `content_block_start` — a text or tool-use block begins
/// 3. `content_block_delta` — incremental text or argument JSON (repeated)
/// 4. `content_block_stop` — the current block ends
/// 5. `message_delta` — stop reason and final usage
/// 6. `message_stop` — end of stream
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum AnthropicStreamEvent {
    MessageStart {
        message: AnthropicMessageStart,
    },
    ContentBlockStart {
        index: u32,
        content_block: AnthropicStreamBlock,
    },
    ContentBlockDelta {
        index: u32,
        delta: AnthropicBlockDelta,
    },
    ContentBlockStop {
        index: u32,
    },
    MessageDelta {
        delta: AnthropicMessageDeltaData,
        #[serde(default)]
        usage: Option<AnthropicUsage>,
    },
    MessageStop,
    Ping,
    Error {
        error: AnthropicStreamError,
    },
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnthropicMessageStart {
    pub id: String,
    pub model: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum AnthropicStreamBlock {
    Text {
        #[serde(default)]
        #[allow(dead_code)]
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
    },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum AnthropicBlockDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnthropicMessageDeltaData {
    #[serde(default)]
    pub stop_reason: Option<StopReason>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnthropicStreamError {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

/// The tool block currently receiving argument fragments.
#[derive(Debug, Clone, Copy)]
struct OpenToolBlock {
    /// Content-block index on the Anthropic wire.
    block_index: u32,
    /// Position of the call in the unified tool_calls sequence.
    position: usize,
}

/// State machine translating Anthropic stream events into unified chunks.
///
/// Each event maps to zero or one chunk. The machine threads the identity of
/// the currently open tool block so argument fragments append to the right
/// call: a tool-use block start always repoints it, and a fragment arriving
/// with no block open is a protocol violation.
pub(crate) struct AnthropicStreamProcessor {
    provider_name: String,
    message_id: String,
    model: String,
    open_tool_block: Option<OpenToolBlock>,
    tool_calls_started: usize,
    finished: bool,
}

impl AnthropicStreamProcessor {
    pub fn new(provider_name: String) -> Self {
        Self {
            provider_name,
            message_id: String::new(),
            model: String::new(),
            open_tool_block: None,
            tool_calls_started: 0,
            finished: false,
        }
    }

    fn chunk(&self, delta: UnifiedMessageDelta, finish_reason: Option<FinishReason>) -> UnifiedChunk {
        UnifiedChunk {
            id: self.message_id.clone(),
            model: self.model.clone(),
            choices: vec![UnifiedChoiceDelta {
                index: 0,
                delta,
                finish_reason,
            }],
            usage: None,
        }
    }

    /// Translate one event. `Ok(None)` means the event produces no unified
    /// chunk; an error is fatal to the turn.
    pub fn process_event(&mut self, event: AnthropicStreamEvent) -> crate::Result<Option<UnifiedChunk>> {
        // The chunk carrying finish_reason is terminal; whatever the vendor
        // sends after it is not translated.
        if self.finished {
            return Ok(None);
        }

        match event {
            AnthropicStreamEvent::MessageStart { message } => {
                self.message_id = message.id;
                self.model = message.model;

                let delta = UnifiedMessageDelta {
                    role: Some(ChatRole::Assistant),
                    ..Default::default()
                };

                Ok(Some(self.chunk(delta, None)))
            }

            AnthropicStreamEvent::ContentBlockStart { index, content_block } => match content_block {
                AnthropicStreamBlock::ToolUse { id, name } => {
                    let position = self.tool_calls_started;
                    self.tool_calls_started += 1;
                    self.open_tool_block = Some(OpenToolBlock {
                        block_index: index,
                        position,
                    });

                    let delta = UnifiedMessageDelta {
                        tool_calls: Some(vec![StreamingToolCall::Start {
                            index: position,
                            id,
                            kind: ToolCallType::Function,
                            function: FunctionStart {
                                name,
                                arguments: String::new(),
                            },
                        }]),
                        ..Default::default()
                    };

                    Ok(Some(self.chunk(delta, None)))
                }
                AnthropicStreamBlock::Text { .. } => Ok(None),
            },

            AnthropicStreamEvent::ContentBlockDelta { index, delta } => match delta {
                AnthropicBlockDelta::TextDelta { text } => {
                    let delta = UnifiedMessageDelta {
                        content: Some(text),
                        ..Default::default()
                    };

                    Ok(Some(self.chunk(delta, None)))
                }
                AnthropicBlockDelta::InputJsonDelta { partial_json } => {
                    let Some(open) = self.open_tool_block.filter(|open| open.block_index == index) else {
                        return Err(LlmError::StreamProtocol(format!(
                            "tool argument fragment for content block {index} arrived with no open tool call"
                        )));
                    };

                    let delta = UnifiedMessageDelta {
                        tool_calls: Some(vec![StreamingToolCall::Delta {
                            index: open.position,
                            function: FunctionDelta {
                                arguments: partial_json,
                            },
                        }]),
                        ..Default::default()
                    };

                    Ok(Some(self.chunk(delta, None)))
                }
            },

            AnthropicStreamEvent::ContentBlockStop { index } => {
                if let Some(open) = self.open_tool_block
                    && open.block_index == index
                {
                    self.open_tool_block = None;
                }

                Ok(None)
            }

            AnthropicStreamEvent::MessageDelta { delta, usage } => {
                let finish_reason = delta.stop_reason.map(FinishReason::from);
                self.finished = finish_reason.is_some();

                let mut chunk = self.chunk(UnifiedMessageDelta::default(), finish_reason);
                chunk.usage = usage.map(Into::into);

                Ok(Some(chunk))
            }

            AnthropicStreamEvent::MessageStop | AnthropicStreamEvent::Ping => Ok(None),

            AnthropicStreamEvent::Error { error } => {
                log::error!(
                    "{} stream error event: {} - {}",
                    self.provider_name,
                    error.error_type,
                    error.message
                );

                Err(LlmError::Unexpected(format!(
                    "{}: {}",
                    error.error_type, error.message
                )))
            }
        }
    }
}
