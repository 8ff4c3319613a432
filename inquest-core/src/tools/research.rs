//! Research tool — scoped, bounded information retrieval via the model.

use crate::artifact::{Artifact, ArtifactPayload, ResearchFindings};
use crate::config::ToolsConfig;
use crate::error::{LlmError, ToolErrorKind, ToolFailure};
use crate::plan::Step;
use crate::provider::{strip_code_fences, LanguageModel};
use crate::tools::Tool;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

const RESEARCH_SYSTEM_PROMPT: &str = r#"You are a careful research assistant.
Investigate the requested topic within the given scope and constraints.
Be honest about uncertainty: list what you do not know under "gaps".

Output ONLY a JSON object with this exact shape, no prose, no markdown fences:
{
  "topic": "string",
  "summary": "string",
  "key_points": ["string", ...],
  "assumptions": ["string", ...],
  "confidence": "low" | "medium" | "high",
  "gaps": ["string", ...],
  "sources": ["string", ...]
}"#;

/// Scoped retrieval with a bounded result size.
pub struct ResearchTool {
    model: Arc<dyn LanguageModel>,
    max_key_points: usize,
    max_sources: usize,
}

impl ResearchTool {
    pub fn new(model: Arc<dyn LanguageModel>, config: &ToolsConfig) -> Self {
        Self {
            model,
            max_key_points: config.max_key_points,
            max_sources: config.max_sources,
        }
    }

    fn build_prompt(&self, step: &Step) -> String {
        let topic = step
            .params
            .get("topic")
            .and_then(|v| v.as_str())
            .unwrap_or(&step.description);

        let mut prompt = format!("Topic: {topic}\n");
        if let Some(scope) = step.params.get("scope").and_then(|v| v.as_str()) {
            prompt.push_str(&format!("Scope: {scope}\n"));
        }
        if let Some(constraints) = step.params.get("constraints").and_then(|v| v.as_array()) {
            let list: Vec<&str> = constraints.iter().filter_map(|c| c.as_str()).collect();
            if !list.is_empty() {
                prompt.push_str(&format!("Constraints: {}\n", list.join("; ")));
            }
        }
        prompt.push_str(&format!(
            "Limit key_points to {} entries and sources to {} entries.",
            self.max_key_points, self.max_sources
        ));
        prompt
    }
}

pub(crate) fn failure_from_llm(tool: &str, err: LlmError) -> ToolFailure {
    let kind = match err {
        LlmError::RateLimited => ToolErrorKind::RateLimited,
        LlmError::Timeout { .. } => ToolErrorKind::Timeout,
        _ => ToolErrorKind::Api,
    };
    ToolFailure::new(tool, kind, err.to_string())
}

#[async_trait]
impl Tool for ResearchTool {
    fn name(&self) -> &str {
        "research"
    }

    fn description(&self) -> &str {
        "Scoped information retrieval producing structured findings"
    }

    async fn invoke(
        &self,
        step: &Step,
        _deps: &[&Artifact],
    ) -> Result<ArtifactPayload, ToolFailure> {
        let prompt = self.build_prompt(step);
        debug!(step = %step.id, "research tool prompt built");

        let raw = self
            .model
            .generate(RESEARCH_SYSTEM_PROMPT, &prompt)
            .await
            .map_err(|e| failure_from_llm(self.name(), e))?;

        let mut findings: ResearchFindings = serde_json::from_str(strip_code_fences(&raw))
            .map_err(|e| {
                ToolFailure::new(
                    self.name(),
                    ToolErrorKind::MalformedOutput,
                    format!("findings did not conform to schema: {e}"),
                )
            })?;

        if findings.summary.trim().is_empty() {
            return Err(ToolFailure::new(
                self.name(),
                ToolErrorKind::EmptyResult,
                "research produced an empty summary",
            ));
        }

        findings.key_points.truncate(self.max_key_points);
        findings.sources.truncate(self.max_sources);

        Ok(ArtifactPayload::RetrievedFacts(findings))
    }
}
