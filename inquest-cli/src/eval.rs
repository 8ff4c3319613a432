//! Batch evaluation: run the pipeline over a prompt file and summarize.

use anyhow::Context;
use inquest_core::ResearchPipeline;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{error, info};

#[derive(Debug, Deserialize)]
pub struct EvalPrompt {
    pub id: String,
    #[serde(default)]
    pub category: String,
    pub query: String,
}

#[derive(Debug, Serialize)]
struct EvalResult {
    id: String,
    category: String,
    status: String,
    verdict: String,
    claims: usize,
    findings: usize,
    error: Option<String>,
}

pub async fn run_eval(
    pipeline: &ResearchPipeline,
    prompts_path: &Path,
    as_json: bool,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(prompts_path)
        .with_context(|| format!("cannot read prompts file {}", prompts_path.display()))?;
    let prompts: Vec<EvalPrompt> =
        serde_json::from_str(&raw).context("prompts file is not a JSON array of prompts")?;

    let mut results = Vec::with_capacity(prompts.len());
    for prompt in prompts {
        info!(id = %prompt.id, "evaluating prompt");
        match pipeline.run(&prompt.query).await {
            Ok(outcome) => results.push(EvalResult {
                id: prompt.id,
                category: prompt.category,
                status: outcome.trace.status.to_string(),
                verdict: outcome.report.verdict.to_string(),
                claims: outcome.answer.claims.len(),
                findings: outcome.report.findings.len(),
                error: None,
            }),
            Err(e) => {
                error!(id = %prompt.id, error = %e, "prompt failed");
                results.push(EvalResult {
                    id: prompt.id,
                    category: prompt.category,
                    status: "error".to_string(),
                    verdict: "-".to_string(),
                    claims: 0,
                    findings: 0,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    if as_json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print_table(&results);
    }
    Ok(())
}

fn print_table(results: &[EvalResult]) {
    println!(
        "{:<16} {:<14} {:<20} {:<8} {:>6} {:>8}",
        "id", "category", "status", "verdict", "claims", "findings"
    );
    for r in results {
        println!(
            "{:<16} {:<14} {:<20} {:<8} {:>6} {:>8}",
            r.id, r.category, r.status, r.verdict, r.claims, r.findings
        );
    }
    let passed = results.iter().filter(|r| r.verdict == "pass").count();
    println!("\n{passed}/{} passed verification", results.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn prompt_file_format_parses() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"id": "q1", "category": "comparison", "query": "tokio vs smol?"}},
                {{"id": "q2", "query": "what is io_uring?"}}
            ]"#
        )
        .unwrap();

        let raw = std::fs::read_to_string(file.path()).unwrap();
        let prompts: Vec<EvalPrompt> = serde_json::from_str(&raw).unwrap();
        assert_eq!(prompts.len(), 2);
        assert_eq!(prompts[0].category, "comparison");
        // Category is optional.
        assert_eq!(prompts[1].category, "");
    }
}
