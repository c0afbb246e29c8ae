//! Protocol-agnostic message types.
//!
//! This is the single schema the caller reads and writes. Vendor providers
//! translate to and from their own wire formats at the transport boundary;
//! the shapes here are what cross the crate surface, in both directions:
//!
//! ```text
//! UnifiedRequest → provider → vendor wire → UnifiedResponse / UnifiedChunk
//! ```
//!
//! Optional fields serialize only when present. Absent never becomes an
//! empty placeholder, so `if let Some(..)` checks downstream keep their
//! meaning.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parameters for one chat-completion turn against any supported vendor.
///
/// The conversation is owned by the caller and passed whole on every call;
/// the adapter never retains state between turns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedRequest {
    /// Model identifier, e.g. `"gpt-4o-mini"` or `"claude-3-5-sonnet-latest"`.
    pub model: String,

    /// Ordered conversation, oldest first.
    pub messages: Vec<UnifiedMessage>,

    /// Sampling temperature. Values above the vendor family's ceiling are
    /// clamped by the dispatch core, not rejected.
    pub temperature: f32,

    /// Output-token ceiling. Filled from the registry for vendors that
    /// require it; otherwise forwarded only when the caller set it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Tools the model may call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,

    /// Reasoning effort knob, forwarded to vendors that understand it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<ReasoningEffort>,

    /// Cache-annotated suffix appended to the system prompt for vendor
    /// families with prompt caching; ignored by the rest.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<String>,
}

impl UnifiedRequest {
    pub fn new(model: impl Into<String>, messages: Vec<UnifiedMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: 1.0,
            max_tokens: None,
            tools: None,
            reasoning_effort: None,
            cached: None,
        }
    }
}

/// Message sender role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
    Tool,
}

/// One message in a conversation.
///
/// `tool` messages must carry `tool_call_id` referencing a prior assistant
/// `tool_calls` entry; assistant messages carry `tool_calls` only when the
/// vendor emitted at least one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedMessage {
    pub role: ChatRole,

    pub content: String,

    /// Chain-of-thought text from reasoning models, when the vendor
    /// surfaces it separately from the answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,

    /// Tool invocations requested by the assistant, in emission order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,

    /// For `tool` messages: the id of the call this message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl UnifiedMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::text(ChatRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::text(ChatRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::text(ChatRole::Assistant, content)
    }

    /// A tool-result message answering the call identified by `tool_call_id`.
    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::text(ChatRole::Tool, content)
        }
    }

    fn text(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            reasoning_content: None,
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

/// A structured invocation request emitted by the model instead of plain
/// text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Vendor-assigned id, unique within a turn.
    pub id: String,

    #[serde(rename = "type")]
    pub kind: ToolCallType,

    pub function: FunctionCall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolCallType {
    Function,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,

    /// JSON-encoded argument object. During streaming this is accumulated
    /// from fragments and is not guaranteed parseable until the turn's
    /// terminal chunk has arrived.
    pub arguments: String,
}

/// Caller-supplied, vendor-agnostic tool declaration.
///
/// The `inputSchema` key and its JSON Schema `object`/`properties`/`required`
/// conventions are a wire-visible contract: callers author these directly,
/// and the schema value is forwarded to every vendor without semantic
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,

    pub description: String,

    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Reasoning effort for models with a configurable thinking budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Low,
    Medium,
    High,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    /// Any other reason, preserved verbatim for forward compatibility.
    #[serde(untagged)]
    Other(String),
}

/// Token usage reported by the vendor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Complete non-streaming response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedResponse {
    pub id: String,

    pub model: String,

    /// Response candidates; index 0 is the primary one.
    pub choices: Vec<UnifiedChoice>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl UnifiedResponse {
    /// The primary choice's message, when the vendor returned one.
    pub fn message(&self) -> Option<&UnifiedMessage> {
        self.choices.first().map(|choice| &choice.message)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedChoice {
    pub index: u32,

    pub message: UnifiedMessage,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

/// One incremental unit of a streaming response.
///
/// Chunks arrive in vendor emission order and the adapter preserves that
/// order exactly. The chunk carrying `finish_reason` is terminal: nothing is
/// yielded after it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedChunk {
    pub id: String,

    pub model: String,

    pub choices: Vec<UnifiedChoiceDelta>,

    /// Cumulative usage, present on the final chunk for vendors that report
    /// it while streaming.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnifiedChoiceDelta {
    pub index: u32,

    pub delta: UnifiedMessageDelta,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

/// Partial message content carried by one chunk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnifiedMessageDelta {
    /// Present on the first chunk of a turn only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ChatRole>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<StreamingToolCall>>,
}

/// A partial tool-call fragment inside a streaming delta.
///
/// `Start` opens a new call with its id and function name; `Delta` appends
/// an argument fragment to the most recently opened call. A fragment never
/// carries an id of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StreamingToolCall {
    Start {
        /// Position of this call within the turn's tool_calls sequence.
        index: usize,
        id: String,
        #[serde(rename = "type")]
        kind: ToolCallType,
        function: FunctionStart,
    },
    Delta {
        index: usize,
        function: FunctionDelta,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionStart {
    pub name: String,

    /// Usually empty; built up by subsequent deltas.
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDelta {
    /// Fragment to append to the open call's argument string.
    pub arguments: String,
}
