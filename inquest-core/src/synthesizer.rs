//! Synthesizer — composes the final answer from the execution trace.
//!
//! The model sees a digest of every artifact plus the list of steps that did
//! not complete. Citations come back as free-form strings and are normalized
//! into [`ArtifactId`]s; anything unparseable is dropped rather than invented.

use crate::answer::{Claim, SynthesizedAnswer};
use crate::artifact::{ArtifactId, Confidence};
use crate::error::CollaboratorError;
use crate::provider::{strip_code_fences, LanguageModel};
use crate::trace::ExecutionTrace;
use serde::Deserialize;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info, warn};

const SYNTHESIS_SYSTEM_PROMPT: &str = r#"You are a research synthesizer. You receive the goal of a research run and a digest of the evidence artifacts it produced. Compose a faithful answer.

Rules:
- Every claim must cite the artifact ids that support it, e.g. ["A-1", "A-3"].
- Never cite an artifact that is not in the digest.
- If a step is listed as failed or skipped, acknowledge the gap in open_questions.
- Separate well-supported claims from hypotheses.

Output ONLY a JSON object, no prose, no markdown fences:
{
  "summary": "2-4 sentence answer to the goal",
  "claims": [{"text": "string", "citations": ["A-1"]}],
  "hypotheses": [{"text": "string", "citations": []}],
  "open_questions": ["string", ...],
  "confidence": "low" | "medium" | "high"
}"#;

/// The model's raw output before citation normalization.
#[derive(Debug, Deserialize)]
struct RawSynthesis {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    claims: Vec<RawClaim>,
    #[serde(default)]
    hypotheses: Vec<RawClaim>,
    #[serde(default)]
    open_questions: Vec<String>,
    #[serde(default)]
    confidence: Confidence,
}

#[derive(Debug, Deserialize)]
struct RawClaim {
    text: String,
    #[serde(default)]
    citations: Vec<String>,
}

fn normalize(raw: RawClaim) -> Claim {
    let citations: Vec<ArtifactId> = raw
        .citations
        .iter()
        .filter_map(|c| {
            let parsed = ArtifactId::parse_loose(c);
            if parsed.is_none() {
                warn!(citation = %c, "dropping unparseable citation");
            }
            parsed
        })
        .collect();
    Claim {
        text: raw.text,
        citations,
    }
}

/// Wraps a language model behind the synthesis contract.
pub struct Synthesizer {
    model: Arc<dyn LanguageModel>,
}

impl Synthesizer {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Compose an answer from everything the run produced.
    pub async fn synthesize(
        &self,
        trace: &ExecutionTrace,
    ) -> Result<SynthesizedAnswer, CollaboratorError> {
        let prompt = build_digest(trace);
        debug!(prompt = prompt.len(), "synthesis digest built");

        let raw = self
            .model
            .generate(SYNTHESIS_SYSTEM_PROMPT, &prompt)
            .await
            .map_err(|e| CollaboratorError::Synthesis {
                message: format!("model request failed: {e}"),
            })?;

        let parsed: RawSynthesis =
            serde_json::from_str(strip_code_fences(&raw)).map_err(|e| {
                CollaboratorError::Synthesis {
                    message: format!("synthesis is not valid JSON: {e}"),
                }
            })?;

        let mut answer = SynthesizedAnswer {
            summary: parsed.summary,
            claims: parsed.claims.into_iter().map(normalize).collect(),
            hypotheses: parsed.hypotheses.into_iter().map(normalize).collect(),
            open_questions: parsed.open_questions,
            confidence: parsed.confidence,
        };

        // The answer is directional: it never claims more than medium
        // confidence, whatever the model says.
        if answer.confidence > Confidence::Medium {
            answer.confidence = Confidence::Medium;
        }

        // A silent model does not erase the run's known gaps.
        if answer.open_questions.is_empty() {
            for step in trace.gaps() {
                answer.open_questions.push(format!(
                    "step {} ({}) did not complete; its findings are missing",
                    step.id, step.description
                ));
            }
        }

        info!(
            claims = answer.claims.len(),
            open_questions = answer.open_questions.len(),
            "answer synthesized"
        );
        Ok(answer)
    }
}

/// Render the trace as a model-readable evidence digest.
fn build_digest(trace: &ExecutionTrace) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "GOAL: {}", trace.plan.goal);
    let _ = writeln!(out, "QUESTION: {}", trace.plan.question);
    let _ = writeln!(out, "\nARTIFACTS:");
    for artifact in trace.artifacts.values() {
        let payload = serde_json::to_string_pretty(&artifact.payload)
            .unwrap_or_else(|_| "<unrenderable>".to_string());
        let _ = writeln!(
            out,
            "- id: {} (step {}, kind {:?})\n{payload}",
            artifact.id,
            artifact.step,
            artifact.kind()
        );
    }
    let gaps = trace.gaps();
    if !gaps.is_empty() {
        let _ = writeln!(out, "\nINCOMPLETE STEPS:");
        for step in gaps {
            let _ = writeln!(out, "- step {} ({}): {}", step.id, step.status, step.description);
        }
    }
    out
}
