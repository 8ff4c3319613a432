//! Execution trace — the full, append-only record of one plan's run.
//!
//! Created once per run by the executor and read-only afterward. Every
//! downstream component (synthesizer, verifier, front end) consumes it
//! without mutation, so distinct runs share nothing.

use crate::artifact::{Artifact, ArtifactId};
use crate::error::ToolErrorKind;
use crate::plan::{ResearchPlan, Step, StepId, StepStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Overall outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every step completed.
    Completed,
    /// At least one step was dispatched but not all completed.
    PartiallyCompleted,
    /// Plan validation failed; no step was ever dispatched.
    Aborted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunStatus::Completed => "completed",
            RunStatus::PartiallyCompleted => "partially_completed",
            RunStatus::Aborted => "aborted",
        };
        write!(f, "{s}")
    }
}

/// Typed record of a step that gave up: the tool, the failure class, the
/// message, and how many attempts were spent on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub tool: String,
    pub kind: ToolErrorKind,
    pub message: String,
    pub attempts: u32,
}

/// One entry in the append-only state-transition log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionEvent {
    pub seq: u64,
    pub step: StepId,
    pub from: StepStatus,
    pub to: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub at: DateTime<Utc>,
}

/// The plan plus, for every step, either an artifact or a failure record,
/// the ordered transition log, and the terminal run status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionTrace {
    pub run_id: Uuid,
    /// The plan with final step statuses.
    pub plan: ResearchPlan,
    pub artifacts: BTreeMap<StepId, Artifact>,
    pub failures: BTreeMap<StepId, StepFailure>,
    pub events: Vec<TransitionEvent>,
    pub status: RunStatus,
    /// Present only when `status` is `Aborted`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abort_reason: Option<String>,
}

impl ExecutionTrace {
    /// A degenerate trace for a plan that failed validation.
    pub fn aborted(plan: ResearchPlan, reason: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            plan,
            artifacts: BTreeMap::new(),
            failures: BTreeMap::new(),
            events: Vec::new(),
            status: RunStatus::Aborted,
            abort_reason: Some(reason.into()),
        }
    }

    /// Look up an artifact by its citation id.
    pub fn artifact_by_id(&self, id: &ArtifactId) -> Option<&Artifact> {
        self.artifacts.values().find(|a| &a.id == id)
    }

    pub fn has_artifact(&self, id: &ArtifactId) -> bool {
        self.artifact_by_id(id).is_some()
    }

    /// Steps that did not complete (failed or skipped), in plan order.
    pub fn gaps(&self) -> Vec<&Step> {
        self.plan
            .steps
            .iter()
            .filter(|s| matches!(s.status, StepStatus::Failed | StepStatus::Skipped))
            .collect()
    }

    pub fn completed_count(&self) -> usize {
        self.plan
            .steps
            .iter()
            .filter(|s| s.status == StepStatus::Completed)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{ArtifactPayload, Confidence, ResearchFindings};
    use crate::plan::ToolKind;

    fn findings(topic: &str) -> ArtifactPayload {
        ArtifactPayload::RetrievedFacts(ResearchFindings {
            topic: topic.into(),
            summary: format!("summary of {topic}"),
            key_points: vec![],
            assumptions: vec![],
            confidence: Confidence::Medium,
            gaps: vec![],
            sources: vec![],
        })
    }

    fn completed_trace() -> ExecutionTrace {
        let mut plan = ResearchPlan::new("q", "goal", vec![Step::new(1, ToolKind::Research, "a")]);
        plan.steps[0].status = StepStatus::Completed;
        let mut artifacts = BTreeMap::new();
        artifacts.insert(StepId(1), Artifact::new(StepId(1), 1, findings("a")));
        ExecutionTrace {
            run_id: Uuid::new_v4(),
            plan,
            artifacts,
            failures: BTreeMap::new(),
            events: Vec::new(),
            status: RunStatus::Completed,
            abort_reason: None,
        }
    }

    #[test]
    fn artifact_lookup_by_citation_id() {
        let trace = completed_trace();
        assert!(trace.has_artifact(&ArtifactId::new("A-1")));
        assert!(!trace.has_artifact(&ArtifactId::new("A-9")));
        assert_eq!(
            trace
                .artifact_by_id(&ArtifactId::new("A-1"))
                .map(|a| a.step),
            Some(StepId(1))
        );
    }

    #[test]
    fn gaps_lists_failed_and_skipped_only() {
        let mut trace = completed_trace();
        trace.plan.steps.push({
            let mut s = Step::new(2, ToolKind::Research, "b");
            s.status = StepStatus::Failed;
            s
        });
        trace.plan.steps.push({
            let mut s = Step::new(3, ToolKind::Compare, "c");
            s.status = StepStatus::Skipped;
            s
        });
        let gaps: Vec<StepId> = trace.gaps().iter().map(|s| s.id).collect();
        assert_eq!(gaps, vec![StepId(2), StepId(3)]);
        assert_eq!(trace.completed_count(), 1);
    }

    #[test]
    fn aborted_trace_carries_reason_and_no_artifacts() {
        let plan = ResearchPlan::new("q", "goal", vec![]);
        let trace = ExecutionTrace::aborted(plan, "plan has no steps");
        assert_eq!(trace.status, RunStatus::Aborted);
        assert_eq!(trace.abort_reason.as_deref(), Some("plan has no steps"));
        assert!(trace.artifacts.is_empty());
        assert!(trace.events.is_empty());
    }

    #[test]
    fn trace_roundtrips_through_json() {
        let trace = completed_trace();
        let json = serde_json::to_string(&trace).unwrap();
        let back: ExecutionTrace = serde_json::from_str(&json).unwrap();
        assert_eq!(back.run_id, trace.run_id);
        assert_eq!(back.status, RunStatus::Completed);
        assert_eq!(back.artifacts.len(), 1);
    }
}
