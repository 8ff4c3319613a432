//! Verifier — rule-based integrity audit over a finished trace and answer.
//!
//! The deterministic rule layer runs in a fixed order and is authoritative:
//! the same (trace, answer) pair always yields an identical report. An
//! optional model-assisted pass may append advisory findings afterwards, but
//! those are tagged and can never change the verdict.

use crate::answer::SynthesizedAnswer;
use crate::artifact::{ArtifactId, ArtifactKind};
use crate::error::LlmError;
use crate::plan::{StepId, StepStatus};
use crate::provider::{strip_code_fences, LanguageModel};
use crate::trace::{ExecutionTrace, RunStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Overall trust signal for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Warn,
    Fail,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Pass => "pass",
            Verdict::Warn => "warn",
            Verdict::Fail => "fail",
        };
        write!(f, "{s}")
    }
}

/// Severity of one finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warn,
    Fail,
}

/// Which rule produced a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleId {
    SystemError,
    Completeness,
    Overclaim,
    Coverage,
    Confidence,
    Advisory,
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RuleId::SystemError => "system_error",
            RuleId::Completeness => "completeness",
            RuleId::Overclaim => "overclaim",
            RuleId::Coverage => "coverage",
            RuleId::Confidence => "confidence",
            RuleId::Advisory => "advisory",
        };
        write!(f, "{s}")
    }
}

/// One itemized audit finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub severity: Severity,
    pub rule: RuleId,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<StepId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ArtifactId>,
    /// Model-assisted findings are advisory and never affect the verdict.
    #[serde(default)]
    pub advisory: bool,
}

impl Finding {
    fn warn(rule: RuleId, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warn,
            rule,
            message: message.into(),
            step: None,
            artifact: None,
            advisory: false,
        }
    }

    fn fail(rule: RuleId, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Fail,
            ..Self::warn(rule, message)
        }
    }

    fn with_step(mut self, step: StepId) -> Self {
        self.step = Some(step);
        self
    }

    fn with_artifact(mut self, artifact: ArtifactId) -> Self {
        self.artifact = Some(artifact);
        self
    }
}

/// The verifier's immutable output: verdict plus ordered findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub verdict: Verdict,
    pub findings: Vec<Finding>,
}

/// High-certainty markers for the overclaim rule. Fixed list so the rule is
/// reproducible across runs.
const CERTAINTY_MARKERS: &[&str] = &[
    "definitely",
    "certainly",
    "proves",
    "proven",
    "guaranteed",
    "always",
    "undoubtedly",
    "conclusively",
];

fn has_certain_language(text: &str) -> bool {
    let lower = text.to_lowercase();
    CERTAINTY_MARKERS.iter().any(|m| lower.contains(m))
}

/// The rule engine. Stateless; `verify` is a pure function of its inputs.
#[derive(Debug, Default)]
pub struct Verifier;

impl Verifier {
    pub fn new() -> Self {
        Self
    }

    /// Run the deterministic rules in fixed order and aggregate the verdict.
    pub fn verify(
        &self,
        trace: &ExecutionTrace,
        answer: &SynthesizedAnswer,
    ) -> VerificationReport {
        // System-error rule short-circuits everything else.
        if trace.status == RunStatus::Aborted {
            let reason = trace
                .abort_reason
                .as_deref()
                .unwrap_or("plan validation failed");
            let finding = Finding::fail(
                RuleId::SystemError,
                format!("run aborted before execution: {reason}"),
            );
            return VerificationReport {
                verdict: Verdict::Fail,
                findings: vec![finding],
            };
        }

        let mut findings = Vec::new();
        self.completeness_rule(trace, &mut findings);
        self.overclaim_rule(trace, answer, &mut findings);
        self.coverage_rule(trace, answer, &mut findings);
        self.confidence_rule(trace, answer, &mut findings);

        let verdict = aggregate(&findings);
        info!(%verdict, findings = findings.len(), "verification complete");
        VerificationReport { verdict, findings }
    }

    /// Deterministic pass first, then model-assisted advisory findings.
    /// Advisor errors degrade to the deterministic report alone.
    pub async fn verify_with_advisor(
        &self,
        trace: &ExecutionTrace,
        answer: &SynthesizedAnswer,
        model: &dyn LanguageModel,
    ) -> VerificationReport {
        let mut report = self.verify(trace, answer);
        if trace.status == RunStatus::Aborted {
            return report;
        }
        match advisory_findings(trace, answer, model).await {
            Ok(mut advisory) => report.findings.append(&mut advisory),
            Err(err) => {
                warn!(error = %err, "advisory verification failed, keeping rule findings only");
            }
        }
        report
    }

    /// Rule 1: every step must have completed; a mostly-failed run escalates.
    fn completeness_rule(&self, trace: &ExecutionTrace, findings: &mut Vec<Finding>) {
        let mut incomplete = 0usize;
        for step in &trace.plan.steps {
            if step.status != StepStatus::Completed {
                incomplete += 1;
                findings.push(
                    Finding::warn(
                        RuleId::Completeness,
                        format!("missing step: step {} ended {}", step.id, step.status),
                    )
                    .with_step(step.id),
                );
            }
        }
        if incomplete * 2 > trace.plan.steps.len() {
            findings.push(Finding::fail(
                RuleId::Completeness,
                format!(
                    "more than half the plan did not complete ({incomplete} of {})",
                    trace.plan.steps.len()
                ),
            ));
        }
    }

    /// Rule 2: citations must exist, and high-certainty claims must not rest
    /// on hypothesis-grade evidence alone.
    fn overclaim_rule(
        &self,
        trace: &ExecutionTrace,
        answer: &SynthesizedAnswer,
        findings: &mut Vec<Finding>,
    ) {
        for (label, claims) in [("claim", &answer.claims), ("hypothesis", &answer.hypotheses)] {
            for claim in claims {
                for citation in &claim.citations {
                    if !trace.has_artifact(citation) {
                        findings.push(
                            Finding::fail(
                                RuleId::Overclaim,
                                format!(
                                    "unsupported claim: {label} cites missing artifact {citation}"
                                ),
                            )
                            .with_artifact(citation.clone()),
                        );
                    }
                }
            }
        }

        for claim in &answer.claims {
            if !has_certain_language(&claim.text) {
                continue;
            }
            let existing_kinds: Vec<ArtifactKind> = claim
                .citations
                .iter()
                .filter_map(|c| trace.artifact_by_id(c))
                .map(|a| a.kind())
                .collect();
            if !existing_kinds.is_empty()
                && existing_kinds
                    .iter()
                    .all(|k| *k == ArtifactKind::Hypothesis)
            {
                findings.push(Finding::warn(
                    RuleId::Overclaim,
                    format!(
                        "high-certainty phrasing backed only by hypothesis-grade evidence: \"{}\"",
                        claim.text
                    ),
                ));
            }
        }
    }

    /// Rule 3: the goal must be grounded by at least one artifact-backed
    /// statement.
    fn coverage_rule(
        &self,
        trace: &ExecutionTrace,
        answer: &SynthesizedAnswer,
        findings: &mut Vec<Finding>,
    ) {
        let grounded = answer
            .claims
            .iter()
            .any(|c| c.citations.iter().any(|id| trace.has_artifact(id)));
        if !grounded {
            findings.push(Finding::warn(
                RuleId::Coverage,
                format!(
                    "no artifact-backed statement addresses the goal \"{}\"",
                    trace.plan.goal
                ),
            ));
        }
    }

    /// Rule 4: an incomplete run must surface open questions.
    fn confidence_rule(
        &self,
        trace: &ExecutionTrace,
        answer: &SynthesizedAnswer,
        findings: &mut Vec<Finding>,
    ) {
        if answer.open_questions.is_empty() && !trace.gaps().is_empty() {
            findings.push(Finding::warn(
                RuleId::Confidence,
                "overconfidence given incomplete execution: no open questions despite failed or skipped steps",
            ));
        }
    }
}

fn aggregate(findings: &[Finding]) -> Verdict {
    let authoritative = findings.iter().filter(|f| !f.advisory);
    let mut verdict = Verdict::Pass;
    for finding in authoritative {
        match finding.severity {
            Severity::Fail => return Verdict::Fail,
            Severity::Warn => verdict = Verdict::Warn,
        }
    }
    verdict
}

const ADVISOR_SYSTEM_PROMPT: &str = r#"You are a strict research auditor.
Given a research goal and a synthesized answer, judge its epistemic quality.

Output ONLY a JSON object, no prose, no markdown fences:
{
  "overclaim_detected": true | false,
  "missing_assumptions": ["string", ...],
  "required_disclaimers": ["string", ...]
}"#;

#[derive(Debug, Deserialize)]
struct AdvisorJudgement {
    #[serde(default)]
    overclaim_detected: bool,
    #[serde(default)]
    missing_assumptions: Vec<String>,
    #[serde(default)]
    required_disclaimers: Vec<String>,
}

async fn advisory_findings(
    trace: &ExecutionTrace,
    answer: &SynthesizedAnswer,
    model: &dyn LanguageModel,
) -> Result<Vec<Finding>, LlmError> {
    let prompt = format!(
        "GOAL: {}\n\nSUMMARY:\n{}\n\nOPEN QUESTIONS: {}\n\nAre there unsupported claims? Is the confidence level appropriate?",
        trace.plan.goal,
        answer.summary,
        answer.open_questions.join("; "),
    );
    let raw = model.generate(ADVISOR_SYSTEM_PROMPT, &prompt).await?;
    let judgement: AdvisorJudgement =
        serde_json::from_str(strip_code_fences(&raw)).map_err(|e| LlmError::ResponseParse {
            message: e.to_string(),
        })?;

    let mut findings = Vec::new();
    let mut push = |message: String| {
        findings.push(Finding {
            advisory: true,
            ..Finding::warn(RuleId::Advisory, message)
        });
    };
    if judgement.overclaim_detected {
        push("advisor flagged a possible overclaim in the summary".to_string());
    }
    for assumption in judgement.missing_assumptions {
        push(format!("advisor: missing assumption: {assumption}"));
    }
    for disclaimer in judgement.required_disclaimers {
        push(format!("advisor: recommended disclaimer: {disclaimer}"));
    }
    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answer::Claim;
    use crate::artifact::{Artifact, ArtifactPayload, Confidence, HypothesisNote, ResearchFindings};
    use crate::plan::{ResearchPlan, Step, ToolKind};
    use crate::provider::MockModel;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn facts(topic: &str) -> ArtifactPayload {
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

    /// Trace with the given per-step statuses; completed steps get artifacts.
    fn trace_with(statuses: &[StepStatus]) -> ExecutionTrace {
        let steps: Vec<Step> = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| {
                let mut s = Step::new(i as u32 + 1, ToolKind::Research, "step");
                s.status = *status;
                s
            })
            .collect();
        let mut artifacts = BTreeMap::new();
        let mut seq = 0;
        for step in &steps {
            if step.status == StepStatus::Completed {
                seq += 1;
                artifacts.insert(step.id, Artifact::new(step.id, seq, facts("t")));
            }
        }
        let all_completed = statuses.iter().all(|s| *s == StepStatus::Completed);
        ExecutionTrace {
            run_id: Uuid::new_v4(),
            plan: ResearchPlan::new("q", "the goal", steps),
            artifacts,
            failures: BTreeMap::new(),
            events: Vec::new(),
            status: if all_completed {
                RunStatus::Completed
            } else {
                RunStatus::PartiallyCompleted
            },
            abort_reason: None,
        }
    }

    fn grounded_answer() -> SynthesizedAnswer {
        SynthesizedAnswer {
            summary: "Findings point one way.".into(),
            claims: vec![Claim::new("The goal holds.", [ArtifactId::new("A-1")])],
            hypotheses: vec![],
            open_questions: vec![],
            confidence: Confidence::Medium,
        }
    }

    #[test]
    fn clean_run_passes_with_zero_findings() {
        let trace = trace_with(&[StepStatus::Completed, StepStatus::Completed]);
        let report = Verifier::new().verify(&trace, &grounded_answer());
        assert_eq!(report.verdict, Verdict::Pass);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn aborted_trace_short_circuits_to_single_fail() {
        let trace =
            ExecutionTrace::aborted(ResearchPlan::new("q", "goal", vec![]), "plan has no steps");
        // An answer riddled with bad citations must not add findings.
        let answer = SynthesizedAnswer {
            claims: vec![Claim::new("bogus", [ArtifactId::new("A-99")])],
            ..grounded_answer()
        };
        let report = Verifier::new().verify(&trace, &answer);
        assert_eq!(report.verdict, Verdict::Fail);
        assert_eq!(report.findings.len(), 1);
        assert_eq!(report.findings[0].rule, RuleId::SystemError);
    }

    #[test]
    fn missing_step_warns() {
        let trace = trace_with(&[StepStatus::Completed, StepStatus::Failed]);
        let mut answer = grounded_answer();
        answer.open_questions.push("what about step 2?".into());
        let report = Verifier::new().verify(&trace, &answer);
        assert_eq!(report.verdict, Verdict::Warn);
        assert!(report
            .findings
            .iter()
            .any(|f| f.rule == RuleId::Completeness && f.message.contains("missing step")));
    }

    #[test]
    fn mostly_failed_run_escalates_to_fail() {
        let trace = trace_with(&[
            StepStatus::Completed,
            StepStatus::Failed,
            StepStatus::Skipped,
        ]);
        let mut answer = grounded_answer();
        answer.open_questions.push("gaps".into());
        let report = Verifier::new().verify(&trace, &answer);
        assert_eq!(report.verdict, Verdict::Fail);
        assert!(report
            .findings
            .iter()
            .any(|f| f.rule == RuleId::Completeness && f.severity == Severity::Fail));
    }

    #[test]
    fn dangling_citation_fails() {
        let trace = trace_with(&[StepStatus::Completed]);
        let mut answer = grounded_answer();
        answer
            .claims
            .push(Claim::new("unsupported", [ArtifactId::new("A-9")]));
        let report = Verifier::new().verify(&trace, &answer);
        assert_eq!(report.verdict, Verdict::Fail);
        let finding = report
            .findings
            .iter()
            .find(|f| f.rule == RuleId::Overclaim)
            .unwrap();
        assert!(finding.message.contains("unsupported claim"));
        assert_eq!(finding.artifact, Some(ArtifactId::new("A-9")));
    }

    #[test]
    fn certain_language_on_hypothesis_evidence_warns() {
        let mut trace = trace_with(&[StepStatus::Completed]);
        // Replace the artifact with a hypothesis-kind one.
        let id = crate::plan::StepId(1);
        trace.artifacts.insert(
            id,
            Artifact::new(
                id,
                1,
                ArtifactPayload::Hypothesis(HypothesisNote {
                    statement: "maybe".into(),
                    rationale: String::new(),
                    confidence: Confidence::Low,
                }),
            ),
        );
        let answer = SynthesizedAnswer {
            claims: vec![Claim::new(
                "This definitely settles it.",
                [ArtifactId::new("A-1")],
            )],
            ..grounded_answer()
        };
        let report = Verifier::new().verify(&trace, &answer);
        assert_eq!(report.verdict, Verdict::Warn);
        assert!(report
            .findings
            .iter()
            .any(|f| f.rule == RuleId::Overclaim && f.severity == Severity::Warn));
    }

    #[test]
    fn ungrounded_answer_warns_on_coverage() {
        let trace = trace_with(&[StepStatus::Completed]);
        let answer = SynthesizedAnswer {
            summary: "vibes only".into(),
            claims: vec![],
            hypotheses: vec![],
            open_questions: vec![],
            confidence: Confidence::Low,
        };
        let report = Verifier::new().verify(&trace, &answer);
        assert_eq!(report.verdict, Verdict::Warn);
        assert!(report.findings.iter().any(|f| f.rule == RuleId::Coverage));
    }

    #[test]
    fn no_open_questions_despite_gaps_warns() {
        let trace = trace_with(&[StepStatus::Completed, StepStatus::Skipped]);
        let report = Verifier::new().verify(&trace, &grounded_answer());
        assert!(report.findings.iter().any(|f| f.rule == RuleId::Confidence));
        assert_eq!(report.verdict, Verdict::Warn);
    }

    #[test]
    fn open_questions_silence_the_confidence_rule() {
        let trace = trace_with(&[StepStatus::Completed, StepStatus::Skipped]);
        let mut answer = grounded_answer();
        answer.open_questions.push("step 2 unknown".into());
        let report = Verifier::new().verify(&trace, &answer);
        assert!(report.findings.iter().all(|f| f.rule != RuleId::Confidence));
    }

    #[test]
    fn verification_is_deterministic() {
        let trace = trace_with(&[StepStatus::Completed, StepStatus::Failed]);
        let answer = grounded_answer();
        let verifier = Verifier::new();
        let a = verifier.verify(&trace, &answer);
        let b = verifier.verify(&trace, &answer);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[tokio::test]
    async fn advisory_findings_never_change_the_verdict() {
        let trace = trace_with(&[StepStatus::Completed]);
        let answer = grounded_answer();
        let model = MockModel::with_response(
            r#"{"overclaim_detected": true, "missing_assumptions": ["sample bias"], "required_disclaimers": []}"#,
        );
        let report = Verifier::new()
            .verify_with_advisor(&trace, &answer, &model)
            .await;
        assert_eq!(report.verdict, Verdict::Pass);
        let advisory: Vec<&Finding> = report.findings.iter().filter(|f| f.advisory).collect();
        assert_eq!(advisory.len(), 2);
        assert!(advisory.iter().all(|f| f.rule == RuleId::Advisory));
    }

    #[tokio::test]
    async fn advisor_error_degrades_to_rule_findings() {
        let trace = trace_with(&[StepStatus::Completed]);
        let answer = grounded_answer();
        let model = MockModel::with_response("not json");
        let report = Verifier::new()
            .verify_with_advisor(&trace, &answer, &model)
            .await;
        assert_eq!(report.verdict, Verdict::Pass);
        assert!(report.findings.is_empty());
    }

    #[test]
    fn certainty_marker_detection() {
        assert!(has_certain_language("This PROVES the point"));
        assert!(has_certain_language("it is definitely true"));
        assert!(!has_certain_language("this suggests a trend"));
    }
}
