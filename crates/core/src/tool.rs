//! Tool trait: the abstraction over agent capabilities.
//!
//! Tools are what give the model the ability to act: file operations,
//! network fetches, system queries. Each tool receives the raw argument
//! tokens parsed from the model's command line and returns a plain
//! string result; the engine treats both as opaque.

use crate::error::ToolError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// The core Tool trait.
///
/// Implemented by built-in tools and by adapters over externally
/// launched tool servers. Arguments are the positional string tokens
/// from the command line; server-backed adapters additionally interpret
/// `key=value` tokens as keyword arguments internally.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name this tool is invoked by (e.g., "ls",
    /// "mcp_filesystem_read_file").
    fn name(&self) -> &str;

    /// Full description sent to the model, never truncated.
    fn description(&self) -> &str;

    /// Display group for server-backed tools; None for local tools.
    fn server_group(&self) -> Option<&str> {
        None
    }

    /// The parameter names this tool expects, in order. Used to enrich
    /// arity-mismatch errors so the model can self-correct.
    fn parameter_names(&self) -> Vec<String> {
        Vec::new()
    }

    /// Execute the tool with the parsed argument tokens.
    async fn invoke(&self, args: &[String]) -> std::result::Result<String, ToolError>;
}

/// A read-only view of a registered tool, for the prompt composer and
/// settings displays.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub server_group: Option<String>,
    pub enabled: bool,
}

/// A registry of available tools.
///
/// The engine uses this to look up and execute tools; the prompt
/// composer uses the descriptor view to advertise enabled tools.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. On a name collision the last registration wins;
    /// the collision is logged but is not an error.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            warn!(tool = %name, "Tool name already registered, replacing with last-loaded version");
        }
        self.tools.insert(name, tool);
    }

    /// Get a tool by name. Missing is a first-class outcome, not an
    /// error; dispatch must distinguish "unknown tool" from "tool
    /// raised".
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Descriptor view of every registered tool. `enabled_filter` of
    /// None means all tools are considered enabled.
    pub fn descriptors(
        &self,
        enabled_filter: Option<&std::collections::BTreeSet<String>>,
    ) -> Vec<ToolDescriptor> {
        let mut out: Vec<ToolDescriptor> = self
            .tools
            .values()
            .map(|t| ToolDescriptor {
                name: t.name().to_string(),
                description: t.description().to_string(),
                server_group: t.server_group().map(String::from),
                enabled: enabled_filter.map(|f| f.contains(t.name())).unwrap_or(true),
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    /// List all registered tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Merge another registry's tools into this one (last wins).
    pub fn merge(&mut self, other: ToolRegistry) {
        for (_, tool) in other.tools {
            self.register(tool);
        }
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the joined arguments"
        }
        fn parameter_names(&self) -> Vec<String> {
            vec!["text".into()]
        }
        async fn invoke(&self, args: &[String]) -> std::result::Result<String, ToolError> {
            Ok(args.join(" "))
        }
    }

    struct ShadowEchoTool;

    #[async_trait]
    impl Tool for ShadowEchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "A different echo"
        }
        async fn invoke(&self, _args: &[String]) -> std::result::Result<String, ToolError> {
            Ok("shadowed".into())
        }
    }

    #[test]
    fn registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
    }

    #[tokio::test]
    async fn registry_collision_last_wins() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        registry.register(Arc::new(ShadowEchoTool));
        assert_eq!(registry.len(), 1);

        let tool = registry.get("echo").unwrap();
        let out = tool.invoke(&[]).await.unwrap();
        assert_eq!(out, "shadowed");
    }

    #[test]
    fn registry_descriptors_respect_filter() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));

        let all = registry.descriptors(None);
        assert_eq!(all.len(), 1);
        assert!(all[0].enabled);

        let none: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();
        let filtered = registry.descriptors(Some(&none));
        assert!(!filtered[0].enabled);
    }

    #[tokio::test]
    async fn registry_execute_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));

        let tool = registry.get("echo").unwrap();
        let result = tool
            .invoke(&["hello".to_string(), "world".to_string()])
            .await
            .unwrap();
        assert_eq!(result, "hello world");
    }

    #[test]
    fn registry_merge_combines() {
        let mut a = ToolRegistry::new();
        a.register(Arc::new(EchoTool));
        let mut b = ToolRegistry::new();
        b.register(Arc::new(ShadowEchoTool));

        a.merge(b);
        assert_eq!(a.len(), 1);
    }
}
