//! The plan contract — shared schema for research plans and their steps.
//!
//! A `ResearchPlan` is produced once by the planner, validated before
//! execution, and mutated only by the executor (step statuses) during a run.

use crate::error::PlanError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

fn default_max_steps() -> usize {
    10
}

/// Stable identifier of a step, unique within a plan.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct StepId(pub u32);

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for StepId {
    fn from(value: u32) -> Self {
        StepId(value)
    }
}

/// The closed set of tools a step may select.
///
/// Serialized as the gateway dispatch name; adding a variant here plus a
/// registered tool is all it takes to extend the toolset — the executor's
/// control flow never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    Research,
    Compare,
}

impl ToolKind {
    /// The name this tool is registered under in the gateway.
    pub fn dispatch_name(&self) -> &'static str {
        match self {
            ToolKind::Research => "research",
            ToolKind::Compare => "compare",
        }
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dispatch_name())
    }
}

/// Lifecycle status of a step. Mutated only by the executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

impl StepStatus {
    /// Whether this is a terminal status for a finished run.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Completed | StepStatus::Failed | StepStatus::Skipped
        )
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StepStatus::Pending => "pending",
            StepStatus::Running => "running",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
        };
        write!(f, "{s}")
    }
}

/// One unit of dispatchable work: a tool selector plus its parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    pub tool: ToolKind,
    pub description: String,
    /// Parameters the selected tool must be able to interpret.
    #[serde(default)]
    pub params: BTreeMap<String, serde_json::Value>,
    /// Ids of earlier steps whose artifacts this step consumes.
    #[serde(default)]
    pub depends_on: Vec<StepId>,
    #[serde(default)]
    pub status: StepStatus,
}

impl Step {
    pub fn new(id: u32, tool: ToolKind, description: impl Into<String>) -> Self {
        Self {
            id: StepId(id),
            tool,
            description: description.into(),
            params: BTreeMap::new(),
            depends_on: Vec::new(),
            status: StepStatus::Pending,
        }
    }

    pub fn with_dependencies(mut self, ids: impl IntoIterator<Item = u32>) -> Self {
        self.depends_on = ids.into_iter().map(StepId).collect();
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.params.insert(key.into(), value);
        self
    }
}

/// An ordered plan for answering one research question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchPlan {
    /// The originating question, verbatim.
    #[serde(default)]
    pub question: String,
    /// The planner's restatement of the goal.
    pub goal: String,
    /// Assumptions the planner made when decomposing the question.
    #[serde(default)]
    pub assumptions: Vec<String>,
    /// Steps in intended execution order.
    pub steps: Vec<Step>,
    /// Stop condition: a plan longer than this is rejected.
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
}

impl ResearchPlan {
    pub fn new(question: impl Into<String>, goal: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            question: question.into(),
            goal: goal.into(),
            assumptions: Vec::new(),
            steps,
            max_steps: default_max_steps(),
        }
    }

    /// Look up a step by id.
    pub fn step(&self, id: StepId) -> Option<&Step> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Pure structural validation: non-empty, unique ids, dependencies only
    /// on strictly earlier steps (which also rules out cycles), and within
    /// the stop condition.
    pub fn validate(&self) -> std::result::Result<(), PlanError> {
        if self.steps.is_empty() {
            return Err(PlanError::Empty);
        }
        if self.steps.len() > self.max_steps {
            return Err(PlanError::TooManySteps {
                count: self.steps.len(),
                max: self.max_steps,
            });
        }
        let mut seen: HashSet<StepId> = HashSet::new();
        for step in &self.steps {
            for dep in &step.depends_on {
                if !seen.contains(dep) {
                    return Err(PlanError::ForwardDependency {
                        step: step.id,
                        dependency: *dep,
                    });
                }
            }
            if !seen.insert(step.id) {
                return Err(PlanError::DuplicateStepId { id: step.id });
            }
        }
        Ok(())
    }

    /// All steps that transitively depend on any of `roots`.
    ///
    /// Because dependencies only point backwards, a single forward sweep
    /// computes the full closure.
    pub fn transitive_dependents(&self, roots: &BTreeSet<StepId>) -> BTreeSet<StepId> {
        let mut dependents = BTreeSet::new();
        for step in &self.steps {
            if step
                .depends_on
                .iter()
                .any(|d| roots.contains(d) || dependents.contains(d))
            {
                dependents.insert(step.id);
            }
        }
        dependents
    }
}
