use serde::Serialize;
use serde_json::Value;

use crate::messages::unified::{ChatRole, ReasoningEffort, ToolCall, ToolDefinition, UnifiedMessage, UnifiedRequest};

/// Request body for the OpenAI `/chat/completions` endpoint, shared by every
/// family speaking that shape.
#[derive(Debug, Serialize)]
pub(crate) struct OpenAiRequest {
    pub model: String,
    pub messages: Vec<OpenAiMessage>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<OpenAiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

/// Tool declaration in the OpenAI function-wrapper shape.
#[derive(Debug, Serialize)]
pub(crate) struct OpenAiTool {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub function: OpenAiFunctionDef,
}

#[derive(Debug, Serialize)]
pub(crate) struct OpenAiFunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl From<UnifiedRequest> for OpenAiRequest {
    fn from(request: UnifiedRequest) -> Self {
        Self {
            model: request.model,
            messages: request.messages.into_iter().map(OpenAiMessage::from).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream: false,
            tools: request
                .tools
                .map(|tools| tools.into_iter().map(OpenAiTool::from).collect()),
            reasoning_effort: request.reasoning_effort,
        }
    }
}

impl From<UnifiedMessage> for OpenAiMessage {
    fn from(message: UnifiedMessage) -> Self {
        // reasoning_content is a response-only field; it is not sent back.
        Self {
            role: message.role,
            content: message.content,
            tool_calls: message.tool_calls,
            tool_call_id: message.tool_call_id,
        }
    }
}

impl From<ToolDefinition> for OpenAiTool {
    fn from(tool: ToolDefinition) -> Self {
        // Structural rename only: inputSchema becomes parameters under a
        // function wrapper. The schema value itself is forwarded untouched.
        Self {
            kind: "function",
            function: OpenAiFunctionDef {
                name: tool.name,
                description: tool.description,
                parameters: tool.input_schema,
            },
        }
    }
}
