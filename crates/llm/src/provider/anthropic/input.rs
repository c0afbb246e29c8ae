use serde::Serialize;
use serde_json::Value;

use crate::messages::unified::{ChatRole, ToolDefinition, UnifiedMessage, UnifiedRequest};

const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Request body for the Anthropic `/messages` endpoint.
#[derive(Debug, Serialize)]
pub(crate) struct AnthropicRequest {
    pub model: String,
    /// Required by the API, unlike every other family.
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<AnthropicSystem>,
    pub messages: Vec<AnthropicMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<AnthropicTool>>,
}

/// System prompt: a plain string, or text blocks when part of the prompt is
/// marked cacheable.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub(crate) enum AnthropicSystem {
    Text(String),
    Blocks(Vec<SystemBlock>),
}

#[derive(Debug, Serialize)]
pub(crate) struct SystemBlock {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_control: Option<CacheControl>,
}

impl SystemBlock {
    fn text(text: String) -> Self {
        Self {
            kind: "text",
            text,
            cache_control: None,
        }
    }

    fn cached(text: String) -> Self {
        Self {
            kind: "text",
            text,
            cache_control: Some(CacheControl::Ephemeral),
        }
    }
}

/// Cache-control marker understood by the Anthropic family only.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum CacheControl {
    Ephemeral,
}

#[derive(Debug, Serialize)]
pub(crate) struct AnthropicMessage {
    pub role: AnthropicRole,
    pub content: Vec<AnthropicContent>,
}

/// Anthropic has no system or tool roles in the message list; system moves
/// to the dedicated field and tool results ride in user messages.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum AnthropicRole {
    User,
    Assistant,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum AnthropicContent {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
    },
}

/// Anthropic keeps the caller's `input_schema` naming, so the tool rewrite
/// is the snake_case rename alone.
#[derive(Debug, Serialize)]
pub(crate) struct AnthropicTool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl From<UnifiedRequest> for AnthropicRequest {
    fn from(request: UnifiedRequest) -> Self {
        let mut system_parts = Vec::new();
        let mut messages = Vec::new();

        for message in request.messages {
            match message.role {
                ChatRole::System => system_parts.push(message.content),
                ChatRole::User => messages.push(AnthropicMessage {
                    role: AnthropicRole::User,
                    content: vec![AnthropicContent::Text {
                        text: message.content,
                    }],
                }),
                ChatRole::Assistant => messages.push(assistant_message(message)),
                ChatRole::Tool => messages.push(AnthropicMessage {
                    role: AnthropicRole::User,
                    content: vec![AnthropicContent::ToolResult {
                        tool_use_id: message.tool_call_id.unwrap_or_default(),
                        content: message.content,
                    }],
                }),
            }
        }

        let system = build_system(system_parts, request.cached);

        Self {
            model: request.model,
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: request.temperature,
            system,
            messages,
            stream: false,
            tools: request
                .tools
                .map(|tools| tools.into_iter().map(AnthropicTool::from).collect()),
        }
    }
}

/// Relocate system content to the dedicated field. With a cached suffix the
/// prompt becomes two blocks: the uncached preamble and the suffix marked
/// ephemeral.
fn build_system(parts: Vec<String>, cached: Option<String>) -> Option<AnthropicSystem> {
    let preamble = if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    };

    match cached {
        None => preamble.map(AnthropicSystem::Text),
        Some(suffix) => {
            let mut blocks = Vec::with_capacity(2);

            if let Some(text) = preamble {
                blocks.push(SystemBlock::text(text));
            }

            blocks.push(SystemBlock::cached(suffix));

            Some(AnthropicSystem::Blocks(blocks))
        }
    }
}

fn assistant_message(message: UnifiedMessage) -> AnthropicMessage {
    let mut content = Vec::new();

    if !message.content.is_empty() {
        content.push(AnthropicContent::Text {
            text: message.content,
        });
    }

    for call in message.tool_calls.unwrap_or_default() {
        content.push(AnthropicContent::ToolUse {
            id: call.id,
            name: call.function.name,
            input: serde_json::from_str(&call.function.arguments)
                .unwrap_or_else(|_| Value::Object(Default::default())),
        });
    }

    AnthropicMessage {
        role: AnthropicRole::Assistant,
        content,
    }
}

impl From<ToolDefinition> for AnthropicTool {
    fn from(tool: ToolDefinition) -> Self {
        Self {
            name: tool.name,
            description: tool.description,
            input_schema: tool.input_schema,
        }
    }
}
