//! Pipeline — wires planner, executor, synthesizer, and verifier together.

use crate::config::InquestConfig;
use crate::error::Result;
use crate::executor::{Executor, RetryPolicy};
use crate::planner::Planner;
use crate::provider::LanguageModel;
use crate::synthesizer::Synthesizer;
use crate::tools::ToolGateway;
use crate::trace::ExecutionTrace;
use crate::verifier::{VerificationReport, Verifier};
use crate::answer::SynthesizedAnswer;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Everything a run produced, kept together for rendering and evaluation.
#[derive(Debug)]
pub struct PipelineOutcome {
    pub trace: ExecutionTrace,
    pub answer: SynthesizedAnswer,
    pub report: VerificationReport,
}

/// The full question-to-verdict pipeline over one language model.
pub struct ResearchPipeline {
    model: Arc<dyn LanguageModel>,
    planner: Planner,
    executor: Executor,
    synthesizer: Synthesizer,
    verifier: Verifier,
    advisory: bool,
}

impl ResearchPipeline {
    pub fn new(model: Arc<dyn LanguageModel>, config: &InquestConfig) -> Self {
        let gateway = Arc::new(ToolGateway::with_default_tools(
            Arc::clone(&model),
            &config.tools,
        ));
        let retry = RetryPolicy {
            max_attempts: config.executor.max_attempts,
            base_delay: Duration::from_millis(config.executor.retry_base_ms),
        };
        Self {
            planner: Planner::new(Arc::clone(&model)),
            executor: Executor::new(gateway).with_retry_policy(retry),
            synthesizer: Synthesizer::new(Arc::clone(&model)),
            verifier: Verifier::new(),
            advisory: config.advisory_verification,
            model,
        }
    }

    /// Token that cancels the executor between steps.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.executor.cancellation_token()
    }

    /// Run the whole pipeline for one question.
    #[instrument(skip(self), fields(model = self.model.model_name()))]
    pub async fn run(&self, question: &str) -> Result<PipelineOutcome> {
        let plan = self.planner.plan(question).await?;
        let trace = self.executor.run(plan).await;
        let answer = self.synthesizer.synthesize(&trace).await?;
        let report = if self.advisory {
            self.verifier
                .verify_with_advisor(&trace, &answer, self.model.as_ref())
                .await
        } else {
            self.verifier.verify(&trace, &answer)
        };
        info!(status = %trace.status, verdict = %report.verdict, "pipeline run finished");
        Ok(PipelineOutcome {
            trace,
            answer,
            report,
        })
    }
}
