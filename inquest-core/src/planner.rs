//! Planner — turns a natural-language question into a validated plan.
//!
//! The model proposes a structured plan as JSON; everything it returns is
//! re-validated here before the executor ever sees it, so a confused model
//! cannot smuggle in cycles, duplicate ids, or unknown tools.

use crate::error::CollaboratorError;
use crate::plan::ResearchPlan;
use crate::provider::{strip_code_fences, LanguageModel};
use std::sync::Arc;
use tracing::{debug, info};

const PLANNER_SYSTEM_PROMPT: &str = r#"You are a research planner. Decompose the user's question into a short, ordered plan of research steps.

Available tools:
- "research": investigate one topic and return structured findings
- "compare": contrast prior research results along named dimensions; its depends_on must list the research steps it consumes

Rules:
- Number steps 1, 2, 3, ... in execution order.
- A step may only depend on earlier steps.
- Keep the plan minimal; most questions need 2-4 steps.

Output ONLY a JSON object, no prose, no markdown fences:
{
  "goal": "one-sentence restatement of what the plan achieves",
  "assumptions": ["string", ...],
  "steps": [
    {
      "id": 1,
      "tool": "research",
      "description": "what this step finds out",
      "params": {"topic": "..."},
      "depends_on": []
    }
  ],
  "max_steps": 10
}"#;

/// Wraps a language model behind the planning contract.
pub struct Planner {
    model: Arc<dyn LanguageModel>,
}

impl Planner {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Produce a validated [`ResearchPlan`] for `question`.
    pub async fn plan(&self, question: &str) -> Result<ResearchPlan, CollaboratorError> {
        let raw = self
            .model
            .generate(PLANNER_SYSTEM_PROMPT, question)
            .await
            .map_err(|e| CollaboratorError::Planning {
                message: format!("model request failed: {e}"),
            })?;
        debug!(raw = raw.len(), "planner response received");

        let mut plan: ResearchPlan =
            serde_json::from_str(strip_code_fences(&raw)).map_err(|e| {
                CollaboratorError::Planning {
                    message: format!("plan is not valid JSON: {e}"),
                }
            })?;
        plan.question = question.to_string();

        plan.validate().map_err(|e| CollaboratorError::Planning {
            message: format!("model produced an invalid plan: {e}"),
        })?;

        info!(steps = plan.steps.len(), goal = %plan.goal, "plan accepted");
        Ok(plan)
    }
}
