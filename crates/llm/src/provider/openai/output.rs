use serde::Deserialize;

use crate::messages::unified::{
    ChatRole, FinishReason, FunctionCall, FunctionDelta, FunctionStart, StreamingToolCall, ToolCall, ToolCallType,
    UnifiedChoice, UnifiedChoiceDelta, UnifiedChunk, UnifiedMessage, UnifiedMessageDelta, UnifiedResponse, Usage,
};

/// Non-streaming response from an OpenAI-compatible endpoint.
///
/// This wire shape already matches the unified schema; the conversion below
/// is a field-for-field pass-through.
#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiResponse {
    pub id: String,
    pub model: String,
    pub choices: Vec<OpenAiChoice>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiChoice {
    pub index: u32,
    pub message: OpenAiResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<OpenAiToolCall>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiToolCall {
    #[serde(default)]
    pub id: Option<String>,
    pub function: OpenAiFunctionCall,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiFunctionCall {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

impl From<OpenAiResponse> for UnifiedResponse {
    fn from(response: OpenAiResponse) -> Self {
        Self {
            id: response.id,
            model: response.model,
            choices: response.choices.into_iter().map(UnifiedChoice::from).collect(),
            usage: response.usage,
        }
    }
}

impl From<OpenAiChoice> for UnifiedChoice {
    fn from(choice: OpenAiChoice) -> Self {
        let tool_calls = choice
            .message
            .tool_calls
            .map(|calls| calls.into_iter().map(ToolCall::from).collect::<Vec<_>>())
            .filter(|calls: &Vec<_>| !calls.is_empty());

        Self {
            index: choice.index,
            message: UnifiedMessage {
                role: ChatRole::Assistant,
                content: choice.message.content.unwrap_or_default(),
                reasoning_content: choice.message.reasoning_content,
                tool_calls,
                tool_call_id: None,
            },
            finish_reason: choice.finish_reason,
        }
    }
}

impl From<OpenAiToolCall> for ToolCall {
    fn from(call: OpenAiToolCall) -> Self {
        Self {
            id: call
                .id
                .unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4())),
            kind: ToolCallType::Function,
            function: FunctionCall {
                name: call.function.name.unwrap_or_default(),
                arguments: call.function.arguments.unwrap_or_default(),
            },
        }
    }
}

/// One streaming chunk from an OpenAI-compatible endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiStreamChunk {
    pub id: String,
    pub model: String,
    pub choices: Vec<OpenAiChoiceDelta>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiChoiceDelta {
    pub index: u32,
    pub delta: OpenAiMessageDelta,
    #[serde(default)]
    pub finish_reason: Option<FinishReason>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct OpenAiMessageDelta {
    #[serde(default)]
    pub role: Option<ChatRole>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<OpenAiStreamingToolCall>>,
}

/// Tool-call fragment as it appears on the wire: a new call carries an id
/// and a name, a continuation carries only more argument text.
#[derive(Debug, Deserialize)]
pub(crate) struct OpenAiStreamingToolCall {
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<OpenAiFunctionCall>,
}

impl From<OpenAiStreamChunk> for UnifiedChunk {
    fn from(chunk: OpenAiStreamChunk) -> Self {
        Self {
            id: chunk.id,
            model: chunk.model,
            choices: chunk.choices.into_iter().map(UnifiedChoiceDelta::from).collect(),
            usage: chunk.usage,
        }
    }
}

impl From<OpenAiChoiceDelta> for UnifiedChoiceDelta {
    fn from(choice: OpenAiChoiceDelta) -> Self {
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
                content: choice.delta.content,
                reasoning_content: choice.delta.reasoning_content,
                tool_calls,
            },
            finish_reason: choice.finish_reason,
        }
    }
}

fn streaming_tool_call(position: usize, call: OpenAiStreamingToolCall) -> StreamingToolCall {
    let index = call.index.unwrap_or(position);
    let function = call.function.unwrap_or(OpenAiFunctionCall {
        name: None,
        arguments: None,
    });

    match call.id {
        Some(id) => StreamingToolCall::Start {
            index,
            id,
            kind: ToolCallType::Function,
            function: FunctionStart {
                name: function.name.unwrap_or_default(),
                arguments: function.arguments.unwrap_or_default(),
            },
        },
        None => StreamingToolCall::Delta {
            index,
            function: FunctionDelta {
                arguments: function.arguments.unwrap_or_default(),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_passes_through_unchanged() {
        let raw = r#"{
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1700000000,
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "The answer is 5.",
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "calculator",
                            "arguments": "{\"operation\":\"add\",\"operand1\":2,\"operand2\":3}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": { "prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15 }
        }"#;

        let response: OpenAiResponse = serde_json::from_str(raw).unwrap();
        let unified = UnifiedResponse::from(response);

        let message = unified.message().unwrap();
        assert_eq!(message.content, "The answer is 5.");

        let calls = message.tool_calls.as_ref().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].function.name, "calculator");
        assert_eq!(
            calls[0].function.arguments,
            r#"{"operation":"add","operand1":2,"operand2":3}"#
        );

        assert_eq!(
            unified.choices[0].finish_reason,
            Some(FinishReason::ToolCalls)
        );
    }

    #[test]
    fn empty_tool_call_list_is_omitted() {
        let raw = r#"{
            "id": "chatcmpl-2",
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "Hello.", "tool_calls": [] },
                "finish_reason": "stop"
            }]
        }"#;

        let response: OpenAiResponse = serde_json::from_str(raw).unwrap();
        let unified = UnifiedResponse::from(response);

        assert!(unified.message().unwrap().tool_calls.is_none());
    }

    #[test]
    fn chunk_fragments_map_to_start_and_delta() {
        let start_raw = r#"{
            "id": "chatcmpl-3",
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "delta": {
                    "tool_calls": [{
                        "index": 0,
                        "id": "call_a",
                        "type": "function",
                        "function": { "name": "calculator", "arguments": "" }
                    }]
                }
            }]
        }"#;

        let delta_raw = r#"{
            "id": "chatcmpl-3",
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "delta": {
                    "tool_calls": [{ "index": 0, "function": { "arguments": "{\"operation\":" } }]
                }
            }]
        }"#;

        let start: UnifiedChunk = serde_json::from_str::<OpenAiStreamChunk>(start_raw).unwrap().into();
        let delta: UnifiedChunk = serde_json::from_str::<OpenAiStreamChunk>(delta_raw).unwrap().into();

        let start_calls = start.choices[0].delta.tool_calls.as_ref().unwrap();
        assert!(matches!(&start_calls[0], StreamingToolCall::Start { id, .. } if id == "call_a"));

        let delta_calls = delta.choices[0].delta.tool_calls.as_ref().unwrap();
        assert!(matches!(
            &delta_calls[0],
            StreamingToolCall::Delta { function, .. } if function.arguments == "{\"operation\":"
        ));
    }

    #[test]
    fn reasoning_delta_surfaces_in_unified_chunk() {
        let raw = r#"{
            "id": "chatcmpl-4",
            "model": "deepseek-reasoner",
            "choices": [{
                "index": 0,
                "delta": { "reasoning_content": "Let me add the operands." }
            }]
        }"#;

        let chunk: UnifiedChunk = serde_json::from_str::<OpenAiStreamChunk>(raw).unwrap().into();

        assert_eq!(
            chunk.choices[0].delta.reasoning_content.as_deref(),
            Some("Let me add the operands.")
        );
        assert!(chunk.choices[0].delta.content.is_none());
    }
}
