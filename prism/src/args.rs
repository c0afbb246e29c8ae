use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use llm::messages::unified::ReasoningEffort;

#[derive(Debug, Parser)]
#[command(name = "prism", about = "Chat with any supported model through one interface", version)]
pub(crate) struct Args {
    /// Model identifier, e.g. gpt-4o-mini or claude-3-5-sonnet-latest.
    /// Prompted for interactively when absent.
    #[arg(long, short, env = "PRISM_MODEL")]
    pub model: Option<String>,

    /// API key for the selected model's vendor family. Falls back to the
    /// configuration file, then to an interactive prompt.
    #[arg(long, env = "PRISM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Path to the configuration file. Without this flag, prism.toml in the
    /// working directory is used when present.
    #[arg(long, short, env = "PRISM_CONFIG")]
    pub config: Option<PathBuf>,

    /// Sampling temperature.
    #[arg(long, short)]
    pub temperature: Option<f32>,

    /// Wait for complete responses instead of streaming.
    #[arg(long)]
    pub no_stream: bool,

    /// Reasoning effort for models with a configurable thinking budget.
    #[arg(long, value_enum)]
    pub reasoning_effort: Option<ReasoningEffortArg>,

    /// System-prompt suffix to mark as cacheable on vendor families with
    /// prompt caching; ignored by the rest.
    #[arg(long)]
    pub cached: Option<String>,

    /// Minimum level for log output.
    #[arg(long, env = "PRISM_LOG", default_value = "warn")]
    pub log_level: log::LevelFilter,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub(crate) enum ReasoningEffortArg {
    Low,
    Medium,
    High,
}

impl From<ReasoningEffortArg> for ReasoningEffort {
    fn from(effort: ReasoningEffortArg) -> Self {
        match effort {
            ReasoningEffortArg::Low => ReasoningEffort::Low,
            ReasoningEffortArg::Medium => ReasoningEffort::Medium,
            ReasoningEffortArg::High => ReasoningEffort::High,
        }
    }
}
