//! Function dispatch with status tracking and cancellation.

use std::sync::Arc;
use tracing::{debug, warn};

use toolchat_core::{CancelFlag, DispatchOutcome, ExecutionStatusHandle, ToolError, ToolRegistry};

use crate::parser::CommandInvocation;

/// Executes parsed commands against the registry.
///
/// Dispatch never returns Err; every way a command can go wrong is a
/// [`DispatchOutcome`] variant the engine branches on.
pub struct Dispatcher {
    registry: Arc<ToolRegistry>,
    status: ExecutionStatusHandle,
    cancel: CancelFlag,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<ToolRegistry>,
        status: ExecutionStatusHandle,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            registry,
            status,
            cancel,
        }
    }

    pub async fn dispatch(&self, invocation: &CommandInvocation) -> DispatchOutcome {
        if self.cancel.is_set() {
            return DispatchOutcome::Interrupted;
        }

        let Some(tool) = self.registry.get(&invocation.name) else {
            warn!(tool = %invocation.name, "Unknown tool requested");
            return DispatchOutcome::Unavailable {
                name: invocation.name.clone(),
            };
        };

        self.status.set_executing(&invocation.name, &invocation.args);
        // Status returns to idle on every exit path
        let _guard = self.status.reset_guard();

        if self.cancel.is_set() {
            return DispatchOutcome::Interrupted;
        }

        debug!(tool = %invocation.name, args = ?invocation.args, "Executing tool");

        match tool.invoke(&invocation.args).await {
            Ok(output) => DispatchOutcome::Success { output },
            Err(ToolError::InvalidArguments(reason)) => {
                let params = tool.parameter_names();
                DispatchOutcome::Failed {
                    reason,
                    expected_params: if params.is_empty() {
                        None
                    } else {
                        Some(params)
                    },
                }
            }
            Err(e) => DispatchOutcome::Failed {
                reason: e.to_string(),
                expected_params: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use toolchat_core::{ExecutionState, Tool};

    struct OkTool;

    #[async_trait]
    impl Tool for OkTool {
        fn name(&self) -> &str {
            "greet"
        }
        fn description(&self) -> &str {
            "Greets"
        }
        async fn invoke(&self, _args: &[String]) -> Result<String, ToolError> {
            Ok("hello".into())
        }
    }

    struct ArityTool;

    #[async_trait]
    impl Tool for ArityTool {
        fn name(&self) -> &str {
            "pair"
        }
        fn description(&self) -> &str {
            "Needs two args"
        }
        fn parameter_names(&self) -> Vec<String> {
            vec!["left".into(), "right".into()]
        }
        async fn invoke(&self, args: &[String]) -> Result<String, ToolError> {
            if args.len() != 2 {
                return Err(ToolError::InvalidArguments(format!(
                    "pair expects 2 arguments, got {}",
                    args.len()
                )));
            }
            Ok(format!("{} + {}", args[0], args[1]))
        }
    }

    struct RaisingTool;

    #[async_trait]
    impl Tool for RaisingTool {
        fn name(&self) -> &str {
            "boom"
        }
        fn description(&self) -> &str {
            "Always fails"
        }
        async fn invoke(&self, _args: &[String]) -> Result<String, ToolError> {
            Err(ToolError::ExecutionFailed {
                tool_name: "boom".into(),
                reason: "it broke".into(),
            })
        }
    }

    fn dispatcher() -> Dispatcher {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(OkTool));
        registry.register(Arc::new(ArityTool));
        registry.register(Arc::new(RaisingTool));
        Dispatcher::new(
            Arc::new(registry),
            ExecutionStatusHandle::new(),
            CancelFlag::default(),
        )
    }

    fn invocation(name: &str, args: &[&str]) -> CommandInvocation {
        CommandInvocation {
            name: name.into(),
            args: args.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn success_outcome() {
        let outcome = dispatcher().dispatch(&invocation("greet", &[])).await;
        assert_eq!(
            outcome,
            DispatchOutcome::Success {
                output: "hello".into()
            }
        );
    }

    #[tokio::test]
    async fn unknown_tool_is_unavailable() {
        let outcome = dispatcher().dispatch(&invocation("missing", &[])).await;
        assert_eq!(
            outcome,
            DispatchOutcome::Unavailable {
                name: "missing".into()
            }
        );
    }

    #[tokio::test]
    async fn invalid_arguments_enriched_with_parameter_names() {
        let outcome = dispatcher().dispatch(&invocation("pair", &["only_one"])).await;
        match outcome {
            DispatchOutcome::Failed {
                expected_params: Some(params),
                ..
            } => assert_eq!(params, vec!["left".to_string(), "right".to_string()]),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn tool_error_is_failed_without_params() {
        let outcome = dispatcher().dispatch(&invocation("boom", &[])).await;
        match outcome {
            DispatchOutcome::Failed {
                reason,
                expected_params: None,
            } => assert!(reason.contains("it broke")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancel_before_dispatch_never_invokes() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(RaisingTool));
        let cancel = CancelFlag::default();
        let dispatcher = Dispatcher::new(
            Arc::new(registry),
            ExecutionStatusHandle::new(),
            cancel.clone(),
        );

        cancel.trigger();
        let outcome = dispatcher.dispatch(&invocation("boom", &[])).await;
        // The raising tool never ran
        assert_eq!(outcome, DispatchOutcome::Interrupted);
    }

    #[tokio::test]
    async fn status_resets_to_idle_after_dispatch() {
        let status = ExecutionStatusHandle::new();
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(OkTool));
        let dispatcher = Dispatcher::new(Arc::new(registry), status.clone(), CancelFlag::default());

        dispatcher.dispatch(&invocation("greet", &[])).await;
        assert!(matches!(status.snapshot().state, ExecutionState::Idle));

        dispatcher.dispatch(&invocation("missing", &[])).await;
        assert!(matches!(status.snapshot().state, ExecutionState::Idle));
    }
}
