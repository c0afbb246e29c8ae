//! Configuration for the prism CLI: default model settings and one
//! credential block per vendor family, loaded from a TOML file. Read-only
//! after load.

mod error;
mod loader;

use std::{collections::BTreeMap, path::Path};

use secrecy::SecretString;
use serde::Deserialize;

pub use error::Error;

pub(crate) type Result<T> = std::result::Result<T, error::Error>;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Model used when none is given on the command line.
    #[serde(default)]
    pub default_model: Option<String>,

    /// Sampling temperature used when none is given on the command line.
    #[serde(default)]
    pub default_temperature: Option<f32>,

    /// Credentials and endpoint overrides, keyed by vendor family name
    /// (`openai`, `anthropic`, `mistral`, ...).
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> crate::Result<Config> {
        loader::load(path)
    }

    /// Credential block for a vendor family, if configured.
    pub fn provider(&self, family: &str) -> Option<&ProviderConfig> {
        self.providers.get(family)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderConfig {
    /// API key for this family. Redacted from Debug output.
    pub api_key: Option<SecretString>,

    /// Override for the family's public endpoint.
    pub base_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use secrecy::ExposeSecret;

    use crate::Config;

    #[test]
    fn all_values() {
        let config = indoc! {r#"
            default_model = "claude-3-5-sonnet-latest"
            default_temperature = 0.7

            [providers.anthropic]
            api_key = "sk-ant-test"
            base_url = "http://localhost:9090/v1"

            [providers.openai]
            api_key = "sk-test"
        "#};

        let config: Config = toml::from_str(config).unwrap();

        assert_eq!(config.default_model.as_deref(), Some("claude-3-5-sonnet-latest"));
        assert_eq!(config.default_temperature, Some(0.7));

        let anthropic = config.provider("anthropic").unwrap();
        assert_eq!(anthropic.api_key.as_ref().unwrap().expose_secret(), "sk-ant-test");
        assert_eq!(anthropic.base_url.as_deref(), Some("http://localhost:9090/v1"));

        let openai = config.provider("openai").unwrap();
        assert!(openai.base_url.is_none());
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();

        assert!(config.default_model.is_none());
        assert!(config.default_temperature.is_none());
        assert!(config.providers.is_empty());
        assert!(config.provider("anthropic").is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let config = indoc! {r#"
            default_model = "gpt-4o-mini"
            retries = 3
        "#};

        let result: Result<Config, _> = toml::from_str(config);

        assert!(result.is_err());
    }

    #[test]
    fn api_keys_do_not_leak_through_debug() {
        let config = indoc! {r#"
            [providers.mistral]
            api_key = "very-secret"
        "#};

        let config: Config = toml::from_str(config).unwrap();

        let printed = format!("{config:?}");
        assert!(!printed.contains("very-secret"));
    }
}
