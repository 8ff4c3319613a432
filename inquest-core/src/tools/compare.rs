//! Comparison tool — structured side-by-side contrasts over upstream findings.

use crate::artifact::{Artifact, ArtifactPayload, ComparisonTable};
use crate::error::{ToolErrorKind, ToolFailure};
use crate::plan::Step;
use crate::provider::{strip_code_fences, LanguageModel};
use crate::tools::research::failure_from_llm;
use crate::tools::Tool;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

const COMPARE_SYSTEM_PROMPT: &str = r#"You are a precise comparison engine.
Contrast the given items along the requested dimensions. Record what cannot
be determined from the inputs under "uncertainties" instead of guessing.

Output ONLY a JSON object with this exact shape, no prose, no markdown fences:
{
  "dimensions": ["string", ...],
  "contrasts": { "dimension": { "item": "description" } },
  "tradeoffs": ["string", ...],
  "uncertainties": ["string", ...]
}"#;

/// Produces a structured comparison from upstream research findings.
pub struct ComparisonTool {
    model: Arc<dyn LanguageModel>,
}

impl ComparisonTool {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    fn build_prompt(&self, step: &Step, deps: &[&Artifact]) -> Result<String, ToolFailure> {
        let mut items = String::new();
        for artifact in deps {
            if let ArtifactPayload::RetrievedFacts(findings) = &artifact.payload {
                items.push_str(&format!(
                    "--- ITEM {} ---\nTopic: {}\nSummary: {}\nKey points: {}\n\n",
                    artifact.id,
                    findings.topic,
                    findings.summary,
                    findings.key_points.join("; "),
                ));
            }
        }
        if items.is_empty() {
            return Err(ToolFailure::new(
                self.name(),
                ToolErrorKind::MissingDependency,
                "comparison requires at least one retrieved_facts dependency artifact",
            ));
        }

        let dimensions: Vec<String> = step
            .params
            .get("dimensions")
            .and_then(|v| v.as_array())
            .map(|a| {
                a.iter()
                    .filter_map(|d| d.as_str().map(str::to_string))
                    .collect()
            })
            .filter(|v: &Vec<String>| !v.is_empty())
            .unwrap_or_else(|| vec!["general".to_string()]);

        Ok(format!(
            "Task: {}\nDimensions: {}\n\nITEMS:\n{items}",
            step.description,
            dimensions.join(", "),
        ))
    }
}

#[async_trait]
impl Tool for ComparisonTool {
    fn name(&self) -> &str {
        "compare"
    }

    fn description(&self) -> &str {
        "Structured side-by-side comparison over upstream findings"
    }

    async fn invoke(
        &self,
        step: &Step,
        deps: &[&Artifact],
    ) -> Result<ArtifactPayload, ToolFailure> {
        let prompt = self.build_prompt(step, deps)?;
        debug!(step = %step.id, items = deps.len(), "comparison tool prompt built");

        let raw = self
            .model
            .generate(COMPARE_SYSTEM_PROMPT, &prompt)
            .await
            .map_err(|e| failure_from_llm(self.name(), e))?;

        let table: ComparisonTable =
            serde_json::from_str(strip_code_fences(&raw)).map_err(|e| {
                ToolFailure::new(
                    self.name(),
                    ToolErrorKind::MalformedOutput,
                    format!("comparison did not conform to schema: {e}"),
                )
            })?;

        Ok(ArtifactPayload::Comparison(table))
    }
}
