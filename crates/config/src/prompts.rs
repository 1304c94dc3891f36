//! Prompt templates for engine-injected synthetic turns.
//!
//! Templates load from a JSON file when one is present and fall back to
//! built-in strings otherwise. Loading never fails: a malformed or
//! missing file logs a warning and yields the defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// The synthetic-turn templates the engine injects into history.
///
/// `{result}` and `{error}` are literal placeholders substituted at
/// render time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTemplates {
    /// Injected as a user turn after a successful command, carrying the
    /// tool output back to the model
    #[serde(default = "default_execution_prompt")]
    pub command_execution_prompt: String,

    /// Injected as a user turn after a failed command, asking the model
    /// to correct and retry
    #[serde(default = "default_retry_prompt")]
    pub command_retry_prompt: String,

    /// Injected once when the iteration cap is reached or a reply needs
    /// wrapping up
    #[serde(default = "default_summary_prompt")]
    pub final_summary_prompt: String,

    /// Base system prompt used when the user configures none
    #[serde(default = "default_system_prompt")]
    pub default_system_prompt: String,
}

fn default_execution_prompt() -> String {
    "The command has been executed. Result:\n\n{result}\n\n".into()
}

fn default_retry_prompt() -> String {
    "【COMMAND EXECUTION FAILED】\nError: {error}\n\n".into()
}

fn default_summary_prompt() -> String {
    "You have reached the maximum number of iterations.\n".into()
}

fn default_system_prompt() -> String {
    "You are a helpful AI assistant.".into()
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            command_execution_prompt: default_execution_prompt(),
            command_retry_prompt: default_retry_prompt(),
            final_summary_prompt: default_summary_prompt(),
            default_system_prompt: default_system_prompt(),
        }
    }
}

impl PromptTemplates {
    /// Load templates from a JSON file, falling back to the built-in
    /// defaults when the file is absent or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(templates) => templates,
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to parse prompt templates, using defaults"
                    );
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Render the post-execution prompt with the tool's output.
    pub fn render_execution(&self, result: &str) -> String {
        self.command_execution_prompt.replace("{result}", result)
    }

    /// Render the retry prompt with the failure reason.
    pub fn render_retry(&self, error: &str) -> String {
        self.command_retry_prompt.replace("{error}", error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_contain_placeholders() {
        let templates = PromptTemplates::default();
        assert!(templates.command_execution_prompt.contains("{result}"));
        assert!(templates.command_retry_prompt.contains("{error}"));
    }

    #[test]
    fn render_substitutes_placeholders() {
        let templates = PromptTemplates::default();
        let rendered = templates.render_execution("file.txt created");
        assert!(rendered.contains("file.txt created"));
        assert!(!rendered.contains("{result}"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let templates = PromptTemplates::load_or_default(Path::new("/nonexistent.json"));
        assert_eq!(
            templates.final_summary_prompt,
            "You have reached the maximum number of iterations.\n"
        );
    }

    #[test]
    fn malformed_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        std::fs::write(&path, "{not json").unwrap();
        let templates = PromptTemplates::load_or_default(&path);
        assert_eq!(templates.default_system_prompt, "You are a helpful AI assistant.");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prompts.json");
        std::fs::write(
            &path,
            r#"{"final_summary_prompt": "Wrap up now."}"#,
        )
        .unwrap();
        let templates = PromptTemplates::load_or_default(&path);
        assert_eq!(templates.final_summary_prompt, "Wrap up now.");
        assert!(templates.command_execution_prompt.contains("{result}"));
    }
}
