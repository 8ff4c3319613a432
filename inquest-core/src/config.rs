//! Configuration system for inquest.
//!
//! Uses `figment` for layered configuration: defaults -> config file ->
//! `INQUEST_*` environment variables. The default file locations are
//! `inquest.toml` in the working directory and
//! `~/.config/inquest/config.toml`.

use crate::error::ConfigError;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which language-model backend to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// Any OpenAI-compatible chat completions endpoint.
    Openai,
    /// Canned responses, for tests and offline runs.
    Mock,
}

/// Language-model provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub provider: ProviderKind,
    pub model: String,
    pub base_url: String,
    /// Environment variable consulted when `api_key` is unset.
    pub api_key_env: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Hard deadline for one model request.
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Openai,
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key: None,
            timeout_secs: 60,
        }
    }
}

/// Executor retry tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Total attempts per step, including the first.
    pub max_attempts: u32,
    /// Base backoff delay; doubles per retry.
    pub retry_base_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_base_ms: 500,
        }
    }
}

/// Bounds applied to tool results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    pub max_key_points: usize,
    pub max_sources: usize,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            max_key_points: 8,
            max_sources: 5,
        }
    }
}

/// Top-level configuration for the inquest pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InquestConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Run the verifier's model-assisted advisory pass after the rules.
    #[serde(default)]
    pub advisory_verification: bool,
}

impl InquestConfig {
    /// Load configuration with the standard layering. An explicit file path
    /// replaces the default file locations.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(InquestConfig::default()));

        match config_file {
            Some(path) => {
                figment = figment.merge(Toml::file(path));
            }
            None => {
                if let Some(dirs) = directories::ProjectDirs::from("", "", "inquest") {
                    figment = figment.merge(Toml::file(dirs.config_dir().join("config.toml")));
                }
                figment = figment.merge(Toml::file("inquest.toml"));
            }
        }

        figment
            .merge(Env::prefixed("INQUEST_").split("__"))
            .extract()
            .map_err(|e| ConfigError::Invalid {
                message: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_sensible() {
        let config = InquestConfig::default();
        assert_eq!(config.llm.provider, ProviderKind::Openai);
        assert_eq!(config.llm.timeout_secs, 60);
        assert_eq!(config.executor.max_attempts, 3);
        assert_eq!(config.executor.retry_base_ms, 500);
        assert_eq!(config.tools.max_key_points, 8);
        assert!(!config.advisory_verification);
    }

    #[test]
    fn file_layer_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[llm]\nprovider = \"mock\"\nmodel = \"test-model\"\n\n[executor]\nmax_attempts = 5\nretry_base_ms = 10"
        )
        .unwrap();

        let config = InquestConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.llm.provider, ProviderKind::Mock);
        assert_eq!(config.llm.model, "test-model");
        assert_eq!(config.executor.max_attempts, 5);
        // Unspecified sections keep defaults.
        assert_eq!(config.tools.max_sources, 5);
    }

    #[test]
    fn provider_kind_serde_names() {
        assert_eq!(
            serde_json::to_string(&ProviderKind::Openai).unwrap(),
            "\"openai\""
        );
        let back: ProviderKind = serde_json::from_str("\"mock\"").unwrap();
        assert_eq!(back, ProviderKind::Mock);
    }
}
