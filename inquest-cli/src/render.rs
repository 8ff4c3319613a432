//! Terminal rendering for plans, traces, answers, and verification reports.

use inquest_core::pipeline::PipelineOutcome;
use inquest_core::verifier::Severity;
use inquest_core::StepStatus;

pub fn print_outcome(outcome: &PipelineOutcome) {
    let trace = &outcome.trace;
    println!("Run {} ({})", trace.run_id, trace.status);
    println!("Goal: {}", trace.plan.goal);
    for step in &trace.plan.steps {
        let marker = match step.status {
            StepStatus::Completed => "✓",
            StepStatus::Failed => "✗",
            StepStatus::Skipped => "↷",
            _ => "·",
        };
        print!("  {marker} step {}: {}", step.id, step.description);
        if let Some(failure) = trace.failures.get(&step.id) {
            print!("  [{} after {} attempts: {}]", failure.kind, failure.attempts, failure.message);
        }
        println!();
    }

    let answer = &outcome.answer;
    println!("\n{}", answer.summary);
    if !answer.claims.is_empty() {
        println!("\nClaims:");
        for claim in &answer.claims {
            let cites: Vec<String> = claim.citations.iter().map(|c| c.to_string()).collect();
            println!("  - {} [{}]", claim.text, cites.join(", "));
        }
    }
    if !answer.hypotheses.is_empty() {
        println!("\nHypotheses:");
        for hypothesis in &answer.hypotheses {
            println!("  - {}", hypothesis.text);
        }
    }
    if !answer.open_questions.is_empty() {
        println!("\nOpen questions:");
        for question in &answer.open_questions {
            println!("  - {question}");
        }
    }
    println!("\nConfidence: {}", answer.confidence);

    let report = &outcome.report;
    println!("Verdict: {}", report.verdict);
    for finding in &report.findings {
        let severity = match finding.severity {
            Severity::Fail => "FAIL",
            Severity::Warn => "warn",
        };
        let advisory = if finding.advisory { " (advisory)" } else { "" };
        println!("  [{severity}] {}{advisory}: {}", finding.rule, finding.message);
    }
}
