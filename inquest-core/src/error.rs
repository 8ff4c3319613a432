//! Error types for the inquest core library.
//!
//! Uses `thiserror` for public API error types. The taxonomy follows the
//! pipeline's containment policy: `PlanError` is structural and fatal to a
//! run before any step is dispatched; `ToolFailure` is per-step, bounded-retry
//! recoverable, and is recorded in the trace rather than propagated;
//! `LlmError` and `CollaboratorError` belong to the external collaborators
//! and are passed through without reinterpretation.

use crate::plan::StepId;
use serde::{Deserialize, Serialize};

/// Convenience result alias for the core library.
pub type Result<T> = std::result::Result<T, InquestError>;

/// Top-level error type for the inquest core library.
#[derive(Debug, thiserror::Error)]
pub enum InquestError {
    #[error("plan error: {0}")]
    Plan(#[from] PlanError),

    #[error("tool failure: {0}")]
    Tool(#[from] ToolFailure),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("collaborator error: {0}")]
    Collaborator(#[from] CollaboratorError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Structural plan defects detected before execution.
///
/// A plan that fails validation is never partially executed: the run aborts
/// with zero dispatched steps.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("plan has no steps")]
    Empty,

    #[error("duplicate step id: {id}")]
    DuplicateStepId { id: StepId },

    #[error("step {step} depends on unknown or later step {dependency}")]
    ForwardDependency { step: StepId, dependency: StepId },

    #[error("step {step} names unknown tool '{tool}'")]
    UnknownTool { step: StepId, tool: String },

    #[error("plan has {count} steps, exceeding the stop condition of {max}")]
    TooManySteps { count: usize, max: usize },
}

/// Classification of a tool failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolErrorKind {
    /// No tool registered under the requested name.
    UnknownTool,
    /// A tool with the same name is already registered.
    AlreadyRegistered,
    /// The step's parameters could not be interpreted by the tool.
    InvalidParams,
    /// A required upstream artifact was absent or of the wrong kind.
    MissingDependency,
    /// The tool ran but produced nothing usable.
    EmptyResult,
    /// The backing provider signalled a rate limit.
    RateLimited,
    /// The call did not complete in time.
    Timeout,
    /// The model's output did not conform to the tool's schema.
    MalformedOutput,
    /// Any other provider/transport error.
    Api,
}

impl std::fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ToolErrorKind::UnknownTool => "unknown_tool",
            ToolErrorKind::AlreadyRegistered => "already_registered",
            ToolErrorKind::InvalidParams => "invalid_params",
            ToolErrorKind::MissingDependency => "missing_dependency",
            ToolErrorKind::EmptyResult => "empty_result",
            ToolErrorKind::RateLimited => "rate_limited",
            ToolErrorKind::Timeout => "timeout",
            ToolErrorKind::MalformedOutput => "malformed_output",
            ToolErrorKind::Api => "api",
        };
        write!(f, "{s}")
    }
}

/// A typed failure reported by a tool invocation.
///
/// Never corrupts an artifact: a tool either returns a complete payload or
/// one of these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[error("tool '{tool}' failed ({kind}): {message}")]
pub struct ToolFailure {
    pub tool: String,
    pub kind: ToolErrorKind,
    pub message: String,
}

impl ToolFailure {
    pub fn new(tool: impl Into<String>, kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            kind,
            message: message.into(),
        }
    }

    /// Whether the executor should retry this failure with backoff.
    ///
    /// Transient provider conditions and malformed model output are worth
    /// another attempt; structural problems are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self.kind,
            ToolErrorKind::EmptyResult
                | ToolErrorKind::RateLimited
                | ToolErrorKind::Timeout
                | ToolErrorKind::MalformedOutput
                | ToolErrorKind::Api
        )
    }
}

/// Errors from language-model provider interactions.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("no usable API credential for provider '{provider}'")]
    NoCredential { provider: String },

    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("model response parse error: {message}")]
    ResponseParse { message: String },

    #[error("rate limited by provider")]
    RateLimited,

    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

/// Errors produced by the external collaborators (planner, synthesizer).
///
/// The core propagates these unchanged; retry policy belongs to the caller
/// of the whole pipeline, not to the core.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CollaboratorError {
    #[error("planning failed: {message}")]
    Planning { message: String },

    #[error("synthesis failed: {message}")]
    Synthesis { message: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recoverable_kinds_are_retried() {
        for kind in [
            ToolErrorKind::EmptyResult,
            ToolErrorKind::RateLimited,
            ToolErrorKind::Timeout,
            ToolErrorKind::MalformedOutput,
            ToolErrorKind::Api,
        ] {
            assert!(ToolFailure::new("research", kind, "x").is_recoverable());
        }
    }

    #[test]
    fn structural_kinds_are_not_retried() {
        for kind in [
            ToolErrorKind::UnknownTool,
            ToolErrorKind::AlreadyRegistered,
            ToolErrorKind::InvalidParams,
            ToolErrorKind::MissingDependency,
        ] {
            assert!(!ToolFailure::new("research", kind, "x").is_recoverable());
        }
    }

    #[test]
    fn tool_failure_display_includes_kind() {
        let failure = ToolFailure::new("compare", ToolErrorKind::MissingDependency, "no inputs");
        let text = failure.to_string();
        assert!(text.contains("compare"));
        assert!(text.contains("missing_dependency"));
        assert!(text.contains("no inputs"));
    }

    #[test]
    fn plan_error_display() {
        let err = PlanError::ForwardDependency {
            step: StepId(3),
            dependency: StepId(7),
        };
        assert_eq!(err.to_string(), "step 3 depends on unknown or later step 7");
    }
}
