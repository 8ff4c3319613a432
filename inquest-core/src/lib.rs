//! inquest-core: a verifiable research pipeline.
//!
//! A question flows through four stages: a [`planner::Planner`] decomposes it
//! into a dependency-ordered [`plan::ResearchPlan`]; the
//! [`executor::Executor`] drives the plan through tools behind a
//! [`tools::ToolGateway`], producing an append-only
//! [`trace::ExecutionTrace`]; a [`synthesizer::Synthesizer`] composes a
//! cited [`answer::SynthesizedAnswer`] from the trace; and the deterministic
//! [`verifier::Verifier`] audits answer against trace and issues a verdict.
//!
//! The planner and synthesizer lean on a language model and are treated as
//! untrusted collaborators; the executor and verifier are deterministic and
//! enforce the contracts the model cannot be trusted to keep.

pub mod answer;
pub mod artifact;
pub mod config;
pub mod error;
pub mod executor;
pub mod pipeline;
pub mod plan;
pub mod planner;
pub mod provider;
pub mod synthesizer;
pub mod tools;
pub mod trace;
pub mod verifier;

pub use answer::{Claim, SynthesizedAnswer};
pub use artifact::{Artifact, ArtifactId, ArtifactKind, ArtifactPayload, Confidence};
pub use config::InquestConfig;
pub use error::{InquestError, Result};
pub use executor::{Executor, RetryPolicy};
pub use pipeline::{PipelineOutcome, ResearchPipeline};
pub use plan::{ResearchPlan, Step, StepId, StepStatus, ToolKind};
pub use planner::Planner;
pub use provider::{build_model, LanguageModel, MockModel, OfflineModel};
pub use synthesizer::Synthesizer;
pub use tools::{Tool, ToolGateway};
pub use trace::{ExecutionTrace, RunStatus, TransitionEvent};
pub use verifier::{Finding, RuleId, Severity, VerificationReport, Verdict, Verifier};
