//! Static model registry.
//!
//! Plain data, loaded once into the binary, read-only thereafter: which
//! vendor family serves which model identifiers, where that family lives,
//! which wire protocol it speaks, and the per-model output-token ceiling.

use crate::error::LlmError;

/// Wire protocol spoken by a vendor family.
///
/// Several families share the OpenAI chat-completions shape while keeping
/// their own base URLs and credentials; the dispatch core matches on this
/// tag to pick the request/response/stream transformers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireProtocol {
    /// OpenAI `/chat/completions` shape.
    OpenAiCompatible,
    /// Anthropic `/messages` shape with typed content blocks.
    Anthropic,
    /// Mistral chat shape: OpenAI-adjacent, with content-part arrays and
    /// object-form tool arguments in responses.
    Mistral,
}

/// A group of model identifiers sharing one wire protocol, one base URL and
/// one credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    OpenAi,
    Grok,
    Gemini,
    DeepSeek,
    Alibaba,
    Inception,
    Mistral,
    Anthropic,
}

const OPENAI_MODELS: &[&str] = &[
    "gpt-4.1-nano",
    "gpt-4.1-mini",
    "gpt-4o-mini",
    "gpt-4o",
    "gpt-4o-2024-11-20",
    "chatgpt-4o-latest",
    "gpt-4.1",
    "o1-mini",
    "o1-preview",
    "o1",
    "o3-mini",
    "o3",
];

const GROK_MODELS: &[&str] = &[
    "grok-3-latest",
    "grok-3-fast-latest",
    "grok-3-mini-latest",
    "grok-3-mini-fast-latest",
    "grok-2-vision-latest",
];

const GEMINI_MODELS: &[&str] = &[
    "gemini-2.0-flash-lite",
    "gemini-2.0-flash",
    "gemini-2.0-flash-thinking-exp",
    "gemini-2.5-pro-exp-03-25",
    "gemini-2.5-pro-preview-03-25",
];

const DEEPSEEK_MODELS: &[&str] = &["deepseek-chat", "deepseek-reasoner"];

const ALIBABA_MODELS: &[&str] = &["qwen-turbo-latest", "qwen-plus-latest", "qwen-max-latest", "qwq-plus"];

const INCEPTION_MODELS: &[&str] = &["mercury-coder-small", "mercury-coder-mini"];

const MISTRAL_MODELS: &[&str] = &[
    "mistral-saba-latest",
    "mistral-large-latest",
    "codestral-latest",
    "pixtral-large-latest",
];

const ANTHROPIC_MODELS: &[&str] = &[
    "claude-3-5-haiku-latest",
    "claude-3-5-sonnet-latest",
    "claude-3-7-sonnet-latest",
    "claude-3-opus-latest",
];

/// Maximum output tokens per model. Mandatory on the Anthropic wire, used as
/// a lookup table by the dispatch core.
const MAX_OUTPUT_TOKENS: &[(&str, u32)] = &[
    ("gpt-4.1-nano", 32768),
    ("gpt-4.1-mini", 32768),
    ("gpt-4o-mini", 16384),
    ("gpt-4o", 16384),
    ("gpt-4o-2024-11-20", 16384),
    ("chatgpt-4o-latest", 16384),
    ("gpt-4.1", 32768),
    ("o1-mini", 65536),
    ("o1-preview", 32768),
    ("o1", 100000),
    ("o3-mini", 100000),
    ("o3", 100000),
    ("mistral-saba-latest", 32000),
    ("mistral-large-latest", 128000),
    ("codestral-latest", 256000),
    ("pixtral-large-latest", 128000),
    ("claude-3-5-haiku-latest", 8192),
    ("claude-3-5-sonnet-latest", 8192),
    ("claude-3-7-sonnet-latest", 64000),
    ("claude-3-opus-latest", 4096),
    ("grok-3-latest", 131072),
    ("grok-3-fast-latest", 131072),
    ("grok-3-mini-latest", 131072),
    ("grok-3-mini-fast-latest", 131072),
    ("grok-2-vision-latest", 32768),
    ("gemini-2.0-flash-lite", 8192),
    ("gemini-2.0-flash", 8192),
    ("gemini-2.0-flash-thinking-exp", 8192),
    ("gemini-2.5-pro-exp-03-25", 8192),
    ("gemini-2.5-pro-preview-03-25", 8192),
    ("deepseek-chat", 8192),
    ("deepseek-reasoner", 8192),
    ("qwen-turbo-latest", 8192),
    ("qwen-plus-latest", 8192),
    ("qwen-max-latest", 8192),
    ("qwq-plus", 8192),
    ("mercury-coder-small", 32000),
    ("mercury-coder-mini", 32000),
];

impl ModelFamily {
    pub const ALL: &'static [ModelFamily] = &[
        ModelFamily::OpenAi,
        ModelFamily::Grok,
        ModelFamily::Gemini,
        ModelFamily::DeepSeek,
        ModelFamily::Alibaba,
        ModelFamily::Inception,
        ModelFamily::Mistral,
        ModelFamily::Anthropic,
    ];

    /// Stable family name, also the credential key in configuration files.
    pub fn name(self) -> &'static str {
        match self {
            ModelFamily::OpenAi => "openai",
            ModelFamily::Grok => "grok",
            ModelFamily::Gemini => "gemini",
            ModelFamily::DeepSeek => "deepseek",
            ModelFamily::Alibaba => "alibaba",
            ModelFamily::Inception => "inception",
            ModelFamily::Mistral => "mistral",
            ModelFamily::Anthropic => "anthropic",
        }
    }

    pub fn wire_protocol(self) -> WireProtocol {
        match self {
            ModelFamily::OpenAi
            | ModelFamily::Grok
            | ModelFamily::Gemini
            | ModelFamily::DeepSeek
            | ModelFamily::Alibaba
            | ModelFamily::Inception => WireProtocol::OpenAiCompatible,
            ModelFamily::Mistral => WireProtocol::Mistral,
            ModelFamily::Anthropic => WireProtocol::Anthropic,
        }
    }

    /// Model identifiers served by this family.
    pub fn models(self) -> &'static [&'static str] {
        match self {
            ModelFamily::OpenAi => OPENAI_MODELS,
            ModelFamily::Grok => GROK_MODELS,
            ModelFamily::Gemini => GEMINI_MODELS,
            ModelFamily::DeepSeek => DEEPSEEK_MODELS,
            ModelFamily::Alibaba => ALIBABA_MODELS,
            ModelFamily::Inception => INCEPTION_MODELS,
            ModelFamily::Mistral => MISTRAL_MODELS,
            ModelFamily::Anthropic => ANTHROPIC_MODELS,
        }
    }

    pub(crate) fn default_base_url(self) -> &'static str {
        match self {
            ModelFamily::OpenAi => "https://api.openai.com/v1",
            ModelFamily::Grok => "https://api.x.ai/v1",
            ModelFamily::Gemini => "https://generativelanguage.googleapis.com/v1beta/openai",
            ModelFamily::DeepSeek => "https://api.deepseek.com/v1",
            ModelFamily::Alibaba => "https://dashscope-intl.aliyuncs.com/compatible-mode/v1",
            ModelFamily::Inception => "https://api.inceptionlabs.ai/v1",
            ModelFamily::Mistral => "https://api.mistral.ai/v1",
            ModelFamily::Anthropic => "https://api.anthropic.com/v1",
        }
    }

    /// Highest sampling temperature the family accepts. Requests above the
    /// ceiling are clamped, not rejected.
    pub fn max_temperature(self) -> f32 {
        match self.wire_protocol() {
            WireProtocol::OpenAiCompatible => 2.0,
            WireProtocol::Mistral => 1.5,
            WireProtocol::Anthropic => 1.0,
        }
    }
}

/// Resolve the vendor family serving `model`.
///
/// Exactly one family lists any supported identifier; an identifier absent
/// from every list is an [`LlmError::UnsupportedModel`].
pub fn resolve_family(model: &str) -> Result<ModelFamily, LlmError> {
    ModelFamily::ALL
        .iter()
        .copied()
        .find(|family| family.models().contains(&model))
        .ok_or_else(|| LlmError::UnsupportedModel(model.to_string()))
}

/// Maximum output tokens for `model`, if the registry knows it.
pub fn max_output_tokens(model: &str) -> Option<u32> {
    MAX_OUTPUT_TOKENS
        .iter()
        .find(|(id, _)| *id == model)
        .map(|&(_, limit)| limit)
}
