//! Artifacts — the immutable, typed results of successfully executed steps.

use crate::plan::StepId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of an artifact, derived from the step that produced it.
///
/// Display form is `A-<step id>`, which is also the citation format the
/// synthesizer is asked to use.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArtifactId(String);

impl ArtifactId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn for_step(step: StepId) -> Self {
        Self(format!("A-{step}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse the loose citation forms language models produce: `A-3`, `3`,
    /// `Step_3`, `Step 3`, `step-3`. Returns `None` when no digits appear.
    pub fn parse_loose(raw: &str) -> Option<Self> {
        let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
        if digits.is_empty() {
            return None;
        }
        let n: u32 = digits.parse().ok()?;
        Some(Self::for_step(StepId(n)))
    }
}

impl fmt::Display for ArtifactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Confidence grade attached to findings and hypotheses.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    #[default]
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        };
        write!(f, "{s}")
    }
}

/// Output of the research tool: scoped, bounded retrieval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchFindings {
    pub topic: String,
    pub summary: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub assumptions: Vec<String>,
    #[serde(default)]
    pub confidence: Confidence,
    #[serde(default)]
    pub gaps: Vec<String>,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Output of the comparison tool: a structured side-by-side contrast.
///
/// `contrasts` maps dimension -> item -> description. BTreeMap keeps the
/// serialized form deterministic, which the verifier relies on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonTable {
    pub dimensions: Vec<String>,
    #[serde(default)]
    pub contrasts: BTreeMap<String, BTreeMap<String, String>>,
    #[serde(default)]
    pub tradeoffs: Vec<String>,
    #[serde(default)]
    pub uncertainties: Vec<String>,
}

/// A speculative conclusion, explicitly below evidence grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HypothesisNote {
    pub statement: String,
    #[serde(default)]
    pub rationale: String,
    #[serde(default)]
    pub confidence: Confidence,
}

/// Kind tag of an artifact payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    RetrievedFacts,
    Comparison,
    Hypothesis,
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArtifactKind::RetrievedFacts => "retrieved_facts",
            ArtifactKind::Comparison => "comparison",
            ArtifactKind::Hypothesis => "hypothesis",
        };
        write!(f, "{s}")
    }
}

/// The typed content of an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ArtifactPayload {
    RetrievedFacts(ResearchFindings),
    Comparison(ComparisonTable),
    Hypothesis(HypothesisNote),
}

impl ArtifactPayload {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            ArtifactPayload::RetrievedFacts(_) => ArtifactKind::RetrievedFacts,
            ArtifactPayload::Comparison(_) => ArtifactKind::Comparison,
            ArtifactPayload::Hypothesis(_) => ArtifactKind::Hypothesis,
        }
    }
}

/// The immutable result of one successfully executed step.
///
/// Owned exclusively by the execution trace; the executor mints these
/// all-or-nothing from a complete payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: ArtifactId,
    /// The step that produced this artifact.
    pub step: StepId,
    /// Monotonically increasing sequence number within the run.
    pub seq: u64,
    pub created_at: DateTime<Utc>,
    pub payload: ArtifactPayload,
}

impl Artifact {
    pub fn new(step: StepId, seq: u64, payload: ArtifactPayload) -> Self {
        Self {
            id: ArtifactId::for_step(step),
            step,
            seq,
            created_at: Utc::now(),
            payload,
        }
    }

    pub fn kind(&self) -> ArtifactKind {
        self.payload.kind()
    }
}
