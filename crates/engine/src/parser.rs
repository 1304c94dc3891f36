//! Command parsing.
//!
//! A reply is a command when its first line starts with the command
//! marker. Only the first command line counts; the model sometimes
//! emits several, and the rest are ignored.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use toolchat_config::EngineConfig;

/// The in-band command convention: a literal line prefix and an
/// argument delimiter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandSyntax {
    pub start: String,
    pub separator: String,
}

/// A parsed command invocation. Transient; discarded after dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandInvocation {
    pub name: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("command format is incorrect")]
    Malformed,
}

impl CommandSyntax {
    pub fn new(start: impl Into<String>, separator: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            separator: separator.into(),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(&config.command_start, &config.command_separator)
    }

    /// Is this reply a command at all?
    pub fn is_command(&self, reply: &str) -> bool {
        reply.starts_with(&self.start)
    }

    /// Parse a model reply.
    ///
    /// Returns None for ordinary replies. For command replies, the first
    /// line starting with the marker is tokenized: strip the marker,
    /// split on the separator, trim each token, drop empties. The first
    /// surviving token is the function name, the rest are raw positional
    /// strings. A command line with zero tokens is a parse error, not a
    /// dispatch.
    pub fn parse(&self, reply: &str) -> Option<Result<CommandInvocation, ParseError>> {
        if !self.is_command(reply) {
            return None;
        }

        let command_line = reply
            .lines()
            .find(|line| line.starts_with(&self.start))
            .unwrap_or(reply);

        let rest = command_line.strip_prefix(&self.start).unwrap_or(command_line);

        let tokens: Vec<String> = rest
            .split(&self.separator)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();

        let Some((name, args)) = tokens.split_first() else {
            return Some(Err(ParseError::Malformed));
        };

        Some(Ok(CommandInvocation {
            name: name.clone(),
            args: args.to_vec(),
        }))
    }

    /// A usage line shown to the model after a malformed command.
    pub fn usage_hint(&self) -> String {
        format!(
            "Error: Command format is incorrect. Please use: {start} tool_name {sep} param1 {sep} param2",
            start = self.start,
            sep = self.separator,
        )
    }
}

impl Default for CommandSyntax {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syntax() -> CommandSyntax {
        CommandSyntax::default()
    }

    #[test]
    fn ordinary_reply_is_not_a_command() {
        assert!(syntax().parse("Here is your answer.").is_none());
    }

    #[test]
    fn marker_mid_text_is_not_a_command() {
        let reply = "I could run YLDEXECUTE: ls but I won't.";
        assert!(syntax().parse(reply).is_none());
    }

    #[test]
    fn parses_name_and_args() {
        let parsed = syntax()
            .parse("YLDEXECUTE: mv ￥| /tmp/a.txt ￥| /tmp/b.txt")
            .unwrap()
            .unwrap();
        assert_eq!(parsed.name, "mv");
        assert_eq!(parsed.args, vec!["/tmp/a.txt", "/tmp/b.txt"]);
    }

    #[test]
    fn trims_tokens_and_drops_empties() {
        let parsed = syntax()
            .parse("YLDEXECUTE:   ls  ￥|   ￥| /home/user  ")
            .unwrap()
            .unwrap();
        assert_eq!(parsed.name, "ls");
        assert_eq!(parsed.args, vec!["/home/user"]);
    }

    #[test]
    fn zero_arg_command_is_valid() {
        let parsed = syntax().parse("YLDEXECUTE: get_system_info").unwrap().unwrap();
        assert_eq!(parsed.name, "get_system_info");
        assert!(parsed.args.is_empty());
    }

    #[test]
    fn empty_command_line_is_malformed() {
        let result = syntax().parse("YLDEXECUTE:   ").unwrap();
        assert_eq!(result, Err(ParseError::Malformed));
    }

    #[test]
    fn only_first_command_line_counts() {
        let reply = "YLDEXECUTE: ls ￥| /tmp\nYLDEXECUTE: rm ￥| /tmp/x";
        let parsed = syntax().parse(reply).unwrap().unwrap();
        assert_eq!(parsed.name, "ls");
    }

    #[test]
    fn parse_is_idempotent() {
        let reply = "YLDEXECUTE: ls ￥| /tmp";
        let first = syntax().parse(reply).unwrap().unwrap();
        let second = syntax().parse(reply).unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn custom_syntax() {
        let syntax = CommandSyntax::new("RUN>", "::");
        let parsed = syntax.parse("RUN> echo :: hello").unwrap().unwrap();
        assert_eq!(parsed.name, "echo");
        assert_eq!(parsed.args, vec!["hello"]);
    }

    #[test]
    fn usage_hint_names_the_syntax() {
        let hint = syntax().usage_hint();
        assert!(hint.contains("YLDEXECUTE:"));
        assert!(hint.contains("￥|"));
    }
}
