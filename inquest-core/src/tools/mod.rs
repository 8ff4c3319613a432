//! Tool gateway — uniform interface over the heterogeneous toolset.
//!
//! Tools are registered by name in a closed dispatch table the executor
//! consults; new tools are additive and never require touching the
//! executor's control flow. A tool either returns a complete artifact
//! payload or a typed failure — nothing in between.

pub mod compare;
pub mod research;

use crate::artifact::{Artifact, ArtifactPayload};
use crate::config::ToolsConfig;
use crate::error::{ToolErrorKind, ToolFailure};
use crate::plan::Step;
use crate::provider::LanguageModel;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

pub use compare::ComparisonTool;
pub use research::ResearchTool;

/// Trait that all tools implement.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The name this tool is dispatched under.
    fn name(&self) -> &str;

    /// Human-readable description of what this tool does.
    fn description(&self) -> &str;

    /// Execute the tool for one step, given its resolved dependency
    /// artifacts. Payload construction is all-or-nothing.
    async fn invoke(
        &self,
        step: &Step,
        deps: &[&Artifact],
    ) -> Result<ArtifactPayload, ToolFailure>;
}

/// The gateway holds all registered tools and dispatches invocations.
pub struct ToolGateway {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolGateway {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// A gateway with the built-in toolset registered.
    pub fn with_default_tools(model: Arc<dyn LanguageModel>, config: &ToolsConfig) -> Self {
        let mut gateway = Self::new();
        let tools: Vec<Arc<dyn Tool>> = vec![
            Arc::new(ResearchTool::new(model.clone(), config)),
            Arc::new(ComparisonTool::new(model)),
        ];
        for tool in tools {
            // Built-in names are distinct; registration cannot fail here.
            let _ = gateway.register(tool);
        }
        gateway
    }

    /// Register a tool. Fails if the name is already taken.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolFailure> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            return Err(ToolFailure::new(
                name.clone(),
                ToolErrorKind::AlreadyRegistered,
                format!("tool '{name}' is already registered"),
            ));
        }
        debug!(tool = %name, "registering tool");
        self.tools.insert(name, tool);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    /// Dispatch one invocation to the named tool.
    pub async fn invoke(
        &self,
        name: &str,
        step: &Step,
        deps: &[&Artifact],
    ) -> Result<ArtifactPayload, ToolFailure> {
        let tool = self.tools.get(name).ok_or_else(|| {
            ToolFailure::new(
                name,
                ToolErrorKind::UnknownTool,
                format!("no tool registered under '{name}'"),
            )
        })?;
        info!(tool = %name, step = %step.id, "invoking tool");
        tool.invoke(step, deps).await
    }
}

impl Default for ToolGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{Confidence, HypothesisNote};
    use crate::plan::ToolKind;

    struct StaticTool {
        name: &'static str,
    }

    #[async_trait]
    impl Tool for StaticTool {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "returns a fixed hypothesis"
        }

        async fn invoke(
            &self,
            _step: &Step,
            _deps: &[&Artifact],
        ) -> Result<ArtifactPayload, ToolFailure> {
            Ok(ArtifactPayload::Hypothesis(HypothesisNote {
                statement: "static".into(),
                rationale: String::new(),
                confidence: Confidence::Low,
            }))
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut gateway = ToolGateway::new();
        gateway.register(Arc::new(StaticTool { name: "x" })).unwrap();
        let err = gateway
            .register(Arc::new(StaticTool { name: "x" }))
            .unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::AlreadyRegistered);
    }

    #[tokio::test]
    async fn unknown_tool_invocation_fails_typed() {
        let gateway = ToolGateway::new();
        let step = Step::new(1, ToolKind::Research, "x");
        let err = gateway.invoke("missing", &step, &[]).await.unwrap_err();
        assert_eq!(err.kind, ToolErrorKind::UnknownTool);
        assert!(!err.is_recoverable());
    }

    #[tokio::test]
    async fn registered_tool_is_dispatched_by_name() {
        let mut gateway = ToolGateway::new();
        gateway
            .register(Arc::new(StaticTool { name: "static" }))
            .unwrap();
        let step = Step::new(1, ToolKind::Research, "x");
        let payload = gateway.invoke("static", &step, &[]).await.unwrap();
        assert!(matches!(payload, ArtifactPayload::Hypothesis(_)));
    }

    #[test]
    fn default_tools_cover_the_tool_kinds() {
        let model: Arc<dyn LanguageModel> =
            Arc::new(crate::provider::MockModel::with_response("{}"));
        let gateway = ToolGateway::with_default_tools(model, &ToolsConfig::default());
        assert!(gateway.contains(ToolKind::Research.dispatch_name()));
        assert!(gateway.contains(ToolKind::Compare.dispatch_name()));
    }
}
