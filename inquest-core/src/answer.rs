//! The synthesized answer contract.
//!
//! A directional summary plus explicit hypotheses and open questions, each
//! grounded statement carrying references to the artifacts it draws from.
//! Produced once by the synthesizer; never mutated.

use crate::artifact::{ArtifactId, Confidence};
use serde::{Deserialize, Serialize};

/// One statement in the answer with the artifacts it cites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub text: String,
    #[serde(default)]
    pub citations: Vec<ArtifactId>,
}

impl Claim {
    pub fn new(text: impl Into<String>, citations: impl IntoIterator<Item = ArtifactId>) -> Self {
        Self {
            text: text.into(),
            citations: citations.into_iter().collect(),
        }
    }
}

/// A directional (explicitly hedged) answer distinguishing supported claims
/// from hypotheses and open questions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesizedAnswer {
    pub summary: String,
    /// Artifact-grounded statements supporting the summary.
    #[serde(default)]
    pub claims: Vec<Claim>,
    /// Provisional conclusions, below evidence grade.
    #[serde(default)]
    pub hypotheses: Vec<Claim>,
    /// Knowledge gaps the synthesis could not close.
    #[serde(default)]
    pub open_questions: Vec<String>,
    /// Overall confidence grade. The synthesizer caps this at `Medium`.
    #[serde(default)]
    pub confidence: Confidence,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_roundtrips_through_json() {
        let answer = SynthesizedAnswer {
            summary: "Both options are viable.".into(),
            claims: vec![Claim::new(
                "Option A is cheaper.",
                [ArtifactId::new("A-1"), ArtifactId::new("A-3")],
            )],
            hypotheses: vec![Claim::new("B may scale better.", [ArtifactId::new("A-2")])],
            open_questions: vec!["Long-term costs unknown.".into()],
            confidence: Confidence::Medium,
        };
        let json = serde_json::to_string(&answer).unwrap();
        let back: SynthesizedAnswer = serde_json::from_str(&json).unwrap();
        assert_eq!(back, answer);
    }

    #[test]
    fn missing_lists_default_to_empty() {
        let answer: SynthesizedAnswer =
            serde_json::from_value(serde_json::json!({ "summary": "thin" })).unwrap();
        assert!(answer.claims.is_empty());
        assert!(answer.open_questions.is_empty());
        assert_eq!(answer.confidence, Confidence::Low);
    }
}
