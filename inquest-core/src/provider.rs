//! Language-model provider abstraction.
//!
//! The planner, the tools, the synthesizer, and the verifier's advisory pass
//! all talk to a model through the `LanguageModel` trait, so the whole
//! pipeline is testable against `MockModel` and portable across backends.

use crate::config::{LlmConfig, ProviderKind};
use crate::error::LlmError;
use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// A thin, stateless completion interface: one system prompt, one user
/// prompt, one text response.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError>;

    fn model_name(&self) -> &str;
}

/// Remove the markdown code fences models often wrap JSON in.
pub fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix("```").unwrap_or(trimmed);
    trimmed.trim()
}

/// Build the configured provider.
///
/// Fails fast with `LlmError::NoCredential` before any step is dispatched
/// when a real backend has no usable key.
pub fn build_model(config: &LlmConfig) -> Result<Arc<dyn LanguageModel>, LlmError> {
    match config.provider {
        ProviderKind::Mock => Ok(Arc::new(OfflineModel)),
        ProviderKind::Openai => Ok(Arc::new(OpenAiCompatModel::new(config)?)),
    }
}

/// Provider for any OpenAI-compatible chat completions endpoint.
pub struct OpenAiCompatModel {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout_secs: u64,
}

impl OpenAiCompatModel {
    /// Create a provider from configuration, resolving the API key from the
    /// inline value or the configured environment variable.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var(&config.api_key_env).ok())
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::NoCredential {
                provider: "openai".to_string(),
            })?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::ApiRequest {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatModel {
    async fn generate(&self, system: &str, user: &str) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(model = %self.model, "sending chat completion request");

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout {
                        timeout_secs: self.timeout_secs,
                    }
                } else {
                    LlmError::ApiRequest {
                        message: e.to_string(),
                    }
                }
            })?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError::RateLimited);
        }
        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(LlmError::ApiRequest {
                message: format!("status {status}: {detail}"),
            });
        }

        let payload: serde_json::Value =
            response.json().await.map_err(|e| LlmError::ResponseParse {
                message: e.to_string(),
            })?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| LlmError::ResponseParse {
                message: "response has no choices[0].message.content".to_string(),
            })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Keyless provider for offline runs. Routes on the calling stage's system
/// prompt and returns canned, schema-valid JSON, so the whole pipeline can be
/// exercised end to end without credentials.
pub struct OfflineModel;

impl OfflineModel {
    const PLAN: &'static str = r#"{
        "goal": "offline walkthrough of the research pipeline",
        "assumptions": ["responses are canned"],
        "steps": [
            {"id": 1, "tool": "research", "description": "research the question offline", "params": {"topic": "the question"}, "depends_on": []}
        ],
        "max_steps": 10
    }"#;

    const FINDINGS: &'static str = r#"{
        "topic": "offline topic",
        "summary": "Canned findings produced without a model backend.",
        "key_points": ["this run used the offline provider"],
        "assumptions": [],
        "confidence": "low",
        "gaps": [],
        "sources": []
    }"#;

    const COMPARISON: &'static str = r#"{
        "dimensions": ["general"],
        "contrasts": {"general": {"offline": "canned comparison"}},
        "tradeoffs": [],
        "uncertainties": ["comparison produced offline"]
    }"#;

    const SYNTHESIS: &'static str = r#"{
        "summary": "Offline run: findings are canned and carry no real evidence.",
        "claims": [{"text": "The offline provider produced this run.", "citations": ["A-1"]}],
        "hypotheses": [],
        "open_questions": ["re-run against a real backend for actual findings"],
        "confidence": "low"
    }"#;

    const JUDGEMENT: &'static str =
        r#"{"overclaim_detected": false, "missing_assumptions": [], "required_disclaimers": []}"#;
}

#[async_trait]
impl LanguageModel for OfflineModel {
    async fn generate(&self, system: &str, _user: &str) -> Result<String, LlmError> {
        let system = system.to_lowercase();
        let canned = if system.contains("planner") {
            Self::PLAN
        } else if system.contains("synthesizer") {
            Self::SYNTHESIS
        } else if system.contains("auditor") {
            Self::JUDGEMENT
        } else if system.contains("comparison") {
            Self::COMPARISON
        } else {
            Self::FINDINGS
        };
        Ok(canned.to_string())
    }

    fn model_name(&self) -> &str {
        "offline"
    }
}

/// A mock model for tests and offline development.
///
/// Returns queued responses in FIFO order; once the queue is empty it falls
/// back to the fixed fallback response, if any.
pub struct MockModel {
    model: String,
    responses: Mutex<VecDeque<String>>,
    fallback: Option<String>,
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            responses: Mutex::new(VecDeque::new()),
            fallback: None,
        }
    }

    /// A mock that always returns the given text.
    pub fn with_response(text: impl Into<String>) -> Self {
        Self {
            fallback: Some(text.into()),
            ..Self::new()
        }
    }

    /// Queue a response for the next `generate` call.
    pub fn queue(&self, text: impl Into<String>) {
        self.responses.lock().unwrap().push_back(text.into());
    }

    /// Number of responses still queued.
    pub fn queued(&self) -> usize {
        self.responses.lock().unwrap().len()
    }
}

impl Default for MockModel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LanguageModel for MockModel {
    async fn generate(&self, _system: &str, _user: &str) -> Result<String, LlmError> {
        let queued = self.responses.lock().unwrap().pop_front();
        match queued.or_else(|| self.fallback.clone()) {
            Some(text) => Ok(text),
            None => Err(LlmError::ApiRequest {
                message: "mock model has no queued responses".to_string(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_code_fences_variants() {
        assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[tokio::test]
    async fn mock_model_returns_queued_then_fallback() {
        let model = MockModel {
            fallback: Some("fallback".into()),
            ..MockModel::new()
        };
        model.queue("first");
        model.queue("second");

        assert_eq!(model.generate("s", "u").await.unwrap(), "first");
        assert_eq!(model.generate("s", "u").await.unwrap(), "second");
        assert_eq!(model.generate("s", "u").await.unwrap(), "fallback");
    }

    #[tokio::test]
    async fn offline_model_routes_on_caller_stage() {
        let model = OfflineModel;
        let plan = model.generate("You are a research planner.", "q").await.unwrap();
        assert!(plan.contains("\"steps\""));
        let synthesis = model
            .generate("You are a research synthesizer.", "q")
            .await
            .unwrap();
        assert!(synthesis.contains("\"claims\""));
        let findings = model
            .generate("You are a careful research assistant.", "q")
            .await
            .unwrap();
        assert!(findings.contains("\"key_points\""));
    }

    #[tokio::test]
    async fn mock_model_without_responses_errors() {
        let model = MockModel::new();
        assert!(matches!(
            model.generate("s", "u").await,
            Err(LlmError::ApiRequest { .. })
        ));
    }

    #[test]
    fn openai_provider_without_key_fails_fast() {
        let config = LlmConfig {
            api_key: None,
            api_key_env: "INQUEST_TEST_KEY_THAT_IS_NOT_SET".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            OpenAiCompatModel::new(&config),
            Err(LlmError::NoCredential { .. })
        ));
    }

    #[test]
    fn openai_provider_with_inline_key_builds() {
        let config = LlmConfig {
            api_key: Some("sk-test".to_string()),
            ..LlmConfig::default()
        };
        let provider = OpenAiCompatModel::new(&config).unwrap();
        assert_eq!(provider.model_name(), "gpt-4o-mini");
    }

    #[tokio::test]
    async fn unresponsive_endpoint_surfaces_as_timeout() {
        // Bound but never accepted: the connection opens and then hangs.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let config = LlmConfig {
            api_key: Some("sk-test".to_string()),
            base_url: format!("http://127.0.0.1:{port}"),
            timeout_secs: 1,
            ..LlmConfig::default()
        };
        let model = OpenAiCompatModel::new(&config).unwrap();
        let err = model.generate("s", "u").await.unwrap_err();
        assert!(matches!(err, LlmError::Timeout { timeout_secs: 1 }));
    }

    #[test]
    fn build_model_respects_provider_kind() {
        let config = LlmConfig {
            provider: ProviderKind::Mock,
            ..LlmConfig::default()
        };
        let model = build_model(&config).unwrap();
        assert_eq!(model.model_name(), "offline");
    }
}
