//! The result of dispatching one command invocation.

use serde::{Deserialize, Serialize};

/// What happened when a parsed command was dispatched.
///
/// Control flow branches on the variant; the deterministic history
/// strings the model reads come from [`DispatchOutcome::render`] and are
/// produced only at the history boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// The tool ran and produced output.
    Success { output: String },
    /// The tool was found but raised; `expected_params` is filled for
    /// argument errors so the model can self-correct.
    Failed {
        reason: String,
        expected_params: Option<Vec<String>>,
    },
    /// No tool with this name is registered.
    Unavailable { name: String },
    /// Cancellation was requested before the tool ran.
    Interrupted,
}

impl DispatchOutcome {
    /// Render the outcome into the text fed back to the model.
    pub fn render(&self) -> String {
        match self {
            Self::Success { output } => format!("Execution successful: {output}"),
            Self::Failed {
                reason,
                expected_params: Some(params),
            } => format!("Execution failed: {reason}\nExpected parameters: {params:?}"),
            Self::Failed {
                reason,
                expected_params: None,
            } => format!("Execution failed: {reason}"),
            Self::Unavailable { name } => format!("Error: Function '{name}' does not exist"),
            Self::Interrupted => "Execution interrupted by user before execution".into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
