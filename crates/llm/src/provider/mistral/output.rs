use serde::Deserialize;
use serde_json::Value;

use crate::messages::unified::{
    ChatRole, FinishReason, FunctionCall, FunctionDelta, FunctionStart, StreamingToolCall, ToolCall, ToolCallType,
    UnifiedChoice, UnifiedChoiceDelta, UnifiedChunk, UnifiedMessage, UnifiedMessageDelta, UnifiedResponse, Usage,
};

/// Non-streaming response from the Mistral chat endpoint.
///
/// Two divergences from the unified shape get normalized here: assistant
/// content may arrive as an array of content parts instead of a flat string,
/// and tool-call arguments may arrive as a JSON object instead of a string.
#[derive(Debug, Deserialize)]
pub(crate) struct MistralResponse {
    pub id: String,
    pub model: String,
    pub choices: Vec<MistralChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MistralChoice {
    pub index: u32,
    pub message: MistralResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MistralResponseMessage {
    #[serde(default)]
    pub content: Option<MistralContent>,
    #[serde(default)]
    pub tool_calls: Option<Vec<MistralToolCall>>,
}

/// Content, flat or chunked.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum MistralContent {
    Text(String),
    Parts(Vec<MistralContentPart>),
}

impl MistralContent {
    /// Flatten content parts into one string; non-text parts contribute
    /// nothing.
    fn into_text(self) -> String {
        match self {
            MistralContent::Text(text) => text,
            MistralContent::Parts(parts) => parts
                .into_iter()
                .filter_map(|part| (part.kind == "text").then_some(part.text).flatten())
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct MistralContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MistralToolCall {
    #[serde(default)]
    pub id: Option<String>,
    pub function: MistralFunctionCall,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MistralFunctionCall {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<MistralArguments>,
}

/// Tool arguments, already-encoded or structured.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum MistralArguments {
    Text(String),
    Json(Value),
}

impl MistralArguments {
    /// Normalize to the unified JSON-string form.
    fn into_text(self) -> String {
        match self {
            MistralArguments::Text(text) => text,
            MistralArguments::Json(value) => sonic_rs::to_string(&value).unwrap_or_else(|_| "{}".to_string()),
        }
    }
}

impl From<MistralResponse> for UnifiedResponse {
    fn from(response: MistralResponse) -> Self {
        Self {
            id: response.id,
            model: response.model,
            choices: response.choices.into_iter().map(UnifiedChoice::from).collect(),
            usage: response.usage,
        }
    }
}

impl From<MistralChoice> for UnifiedChoice {
    fn from(choice: MistralChoice) -> Self {
        let tool_calls = choice
            .message
            .tool_calls
            .map(|calls| calls.into_iter().map(ToolCall::from).collect::<Vec<_>>())
            .filter(|calls: &Vec<_>| !calls.is_empty());

        Self {
            index: choice.index,
            message: UnifiedMessage {
                role: ChatRole::Assistant,
                content: choice.message.content.map(MistralContent::into_text).unwrap_or_default(),
                reasoning_content: None,
                tool_calls,
                tool_call_id: None,
            },
            finish_reason: choice.finish_reason,
        }
    }
}

impl From<MistralToolCall> for ToolCall {
    fn from(call: MistralToolCall) -> Self {
        Self {
            id: call
                .id
                .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4())),
            kind: ToolCallType::Function,
            function: FunctionCall {
                name: call.function.name.unwrap_or_default(),
                arguments: call
                    .function
                    .arguments
                    .map(MistralArguments::into_text)
                    .unwrap_or_else(|| "{}".to_string()),
            },
        }
    }
}

/// One streaming chunk from the Mistral chat endpoint; normalized the same
/// way as the non-streaming response, one chunk per vendor chunk, order
/// preserved.
#[derive(Debug, Deserialize)]
pub(crate) struct MistralStreamChunk {
    pub id: String,
    pub model: String,
    pub choices: Vec<MistralChoiceDelta>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MistralChoiceDelta {
    pub index: u32,
    pub delta: MistralMessageDelta,
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MistralMessageDelta {
    #[serde(default)]
    pub role: Option<ChatRole>,
    #[serde(default)]
    pub content: Option<MistralContent>,
    #[serde(default)]
    pub tool_calls: Option<Vec<MistralStreamingToolCall>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MistralStreamingToolCall {
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<MistralFunctionCall>,
}

impl From<MistralStreamChunk> for UnifiedChunk {
    fn from(chunk: MistralStreamChunk) -> Self {
        Self {
            id: chunk.id,
            model: chunk.model,
            choices: chunk.choices.into_iter().map(UnifiedChoiceDelta::from).collect(),
            usage: chunk.usage,
        }
    }
}

impl From<MistralChoiceDelta> for UnifiedChoiceDelta {
    fn from(choice: MistralChoiceDelta) -> Self {
        let tool_calls = choice.delta.tool_calls.map(|calls| {
            calls
                .into_iter()
                .enumerate()
                .map(|(position, call)| streaming_tool_call(position, call))
                .collect()
        });

        Self {
            index: choice.index,
            delta: UnifiedMessageDelta {
                role: choice.delta.role,
                content: choice.delta.content.map(MistralContent::into_text),
                reasoning_content: None,
                tool_calls,
            },
            finish_reason: choice.finish_reason,
        }
    }
}

fn streaming_tool_call(position: usize, call: MistralStreamingToolCall) -> StreamingToolCall {
    let index = call.index.unwrap_or(position);
    let (name, arguments) = call
        .function
        .map(|function| (function.name, function.arguments.map(MistralArguments::into_text)))
        .unwrap_or((None, None));

    match call.id {
        Some(id) => StreamingToolCall::Start {
            index,
            id,
            kind: ToolCallType::Function,
            function: FunctionStart {
                name: name.unwrap_or_default(),
                arguments: arguments.unwrap_or_default(),
            },
        },
        None => StreamingToolCall::Delta {
            index,
            function: FunctionDelta {
                arguments: arguments.unwrap_or_default(),
            },
        },
    }
}
