//! Executor — the deterministic control loop that walks a plan's steps in
//! declared order, dispatches them through the tool gateway, and records
//! every outcome in the execution trace.
//!
//! Steps run strictly sequentially: step order encodes a data-flow guarantee
//! that must not be reordered, and the bottleneck is network-bound tool
//! calls, not CPU. Per-step failures are contained and recorded; `run`
//! always returns a trace, never an error.

use crate::artifact::Artifact;
use crate::error::PlanError;
use crate::plan::{ResearchPlan, StepId, StepStatus};
use crate::trace::{ExecutionTrace, RunStatus, StepFailure, TransitionEvent};
use crate::tools::ToolGateway;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Bounded retry with exponential backoff for recoverable tool failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per step, including the first.
    pub max_attempts: u32,
    /// Base delay; doubles per retry.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt following `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

/// The executor drives one plan to a finished trace.
pub struct Executor {
    gateway: Arc<ToolGateway>,
    retry: RetryPolicy,
    cancel: CancellationToken,
}

impl Executor {
    pub fn new(gateway: Arc<ToolGateway>) -> Self {
        Self {
            gateway,
            retry: RetryPolicy::default(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Token that aborts the run between steps. Remaining steps are marked
    /// Skipped with reason "cancelled", never Failed.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Validate, then execute the plan sequentially. Always returns a trace:
    /// validation failure yields an Aborted trace with zero dispatched steps.
    pub async fn run(&self, plan: ResearchPlan) -> ExecutionTrace {
        if let Err(err) = self.validate(&plan) {
            warn!(error = %err, "plan validation failed, aborting run");
            return ExecutionTrace::aborted(plan, err.to_string());
        }

        let mut trace = ExecutionTrace {
            run_id: Uuid::new_v4(),
            plan,
            artifacts: BTreeMap::new(),
            failures: BTreeMap::new(),
            events: Vec::new(),
            status: RunStatus::PartiallyCompleted,
            abort_reason: None,
        };
        info!(run_id = %trace.run_id, steps = trace.plan.steps.len(), "starting run");

        let mut event_seq = 0u64;
        let mut artifact_seq = 0u64;
        // Steps whose artifacts will never exist: failed or skipped.
        let mut unusable: BTreeSet<StepId> = BTreeSet::new();

        for idx in 0..trace.plan.steps.len() {
            let step = trace.plan.steps[idx].clone();

            if self.cancel.is_cancelled() {
                transition(
                    &mut trace,
                    &mut event_seq,
                    idx,
                    StepStatus::Skipped,
                    Some("cancelled".to_string()),
                );
                unusable.insert(step.id);
                continue;
            }

            if let Some(dead) = step.depends_on.iter().find(|d| unusable.contains(d)) {
                transition(
                    &mut trace,
                    &mut event_seq,
                    idx,
                    StepStatus::Skipped,
                    Some(format!("dependency step {dead} did not complete")),
                );
                unusable.insert(step.id);
                continue;
            }

            transition(&mut trace, &mut event_seq, idx, StepStatus::Running, None);

            // Dependency artifacts are cloned out of the trace so the trace
            // stays mutable for status bookkeeping during the call.
            let deps: Vec<Artifact> = step
                .depends_on
                .iter()
                .filter_map(|d| trace.artifacts.get(d).cloned())
                .collect();
            let dep_refs: Vec<&Artifact> = deps.iter().collect();

            let mut attempt = 0u32;
            let outcome = loop {
                attempt += 1;
                match self
                    .gateway
                    .invoke(step.tool.dispatch_name(), &step, &dep_refs)
                    .await
                {
                    Ok(payload) => break Ok(payload),
                    Err(failure) if failure.is_recoverable() && attempt < self.retry.max_attempts => {
                        let delay = self.retry.delay(attempt);
                        warn!(
                            step = %step.id,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %failure,
                            "recoverable tool failure, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    Err(failure) => break Err(failure),
                }
            };

            match outcome {
                Ok(payload) => {
                    artifact_seq += 1;
                    let artifact = Artifact::new(step.id, artifact_seq, payload);
                    trace.artifacts.insert(step.id, artifact);
                    transition(&mut trace, &mut event_seq, idx, StepStatus::Completed, None);
                }
                Err(failure) => {
                    trace.failures.insert(
                        step.id,
                        StepFailure {
                            tool: failure.tool.clone(),
                            kind: failure.kind,
                            message: failure.message.clone(),
                            attempts: attempt,
                        },
                    );
                    transition(
                        &mut trace,
                        &mut event_seq,
                        idx,
                        StepStatus::Failed,
                        Some(failure.message),
                    );
                    unusable.insert(step.id);
                }
            }
        }

        let completed = trace.completed_count();
        trace.status = if completed == trace.plan.steps.len() {
            RunStatus::Completed
        } else {
            RunStatus::PartiallyCompleted
        };
        info!(
            run_id = %trace.run_id,
            status = %trace.status,
            completed,
            total = trace.plan.steps.len(),
            "run finished"
        );
        trace
    }

    /// Pure pre-execution validation: structural plan checks plus tool-name
    /// resolution against the gateway.
    fn validate(&self, plan: &ResearchPlan) -> Result<(), PlanError> {
        plan.validate()?;
        for step in &plan.steps {
            let name = step.tool.dispatch_name();
            if !self.gateway.contains(name) {
                return Err(PlanError::UnknownTool {
                    step: step.id,
                    tool: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Apply a status change and append it to the trace's transition log.
fn transition(
    trace: &mut ExecutionTrace,
    event_seq: &mut u64,
    step_index: usize,
    to: StepStatus,
    reason: Option<String>,
) {
    let step = &mut trace.plan.steps[step_index];
    let from = step.status;
    step.status = to;
    *event_seq += 1;
    debug!(step = %step.id, %from, %to, "step transition");
    trace.events.push(TransitionEvent {
        seq: *event_seq,
        step: step.id,
        from,
        to,
        reason,
        at: Utc::now(),
    });
}
