use serde::Serialize;
use serde_json::Value;

use crate::messages::unified::{ChatRole, ToolCall, ToolDefinition, UnifiedMessage, UnifiedRequest};

/// Request body for the Mistral `/chat/completions` endpoint. The outbound
/// shape matches OpenAI's; the divergence is all on the response side.
#[derive(Debug, Serialize)]
pub(crate) struct MistralRequest {
    pub model: String,
    pub messages: Vec<MistralMessage>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<MistralTool>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MistralMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct MistralTool {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: MistralFunctionDef,
}

#[derive(Debug, Serialize)]
pub(crate) struct MistralFunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl From<UnifiedRequest> for MistralRequest {
    fn from(request: UnifiedRequest) -> Self {
        Self {
            model: request.model,
            messages: request.messages.into_iter().map(MistralMessage::from).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
            tools: request
                .tools
                .map(|tools| tools.into_iter().map(MistralTool::from).collect()),
        }
    }
}

impl From<UnifiedMessage> for MistralMessage {
    fn from(message: UnifiedMessage) -> Self {
        Self {
            role: message.role,
            content: message.content,
            tool_calls: message.tool_calls,
            tool_call_id: message.tool_call_id,
        }
    }
}

impl From<ToolDefinition> for MistralTool {
    fn from(tool: ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: MistralFunctionDef {
                name: tool.name,
                description: tool.description,
                parameters: tool.input_schema,
            },
        }
    }
}
