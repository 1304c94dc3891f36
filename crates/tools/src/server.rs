//! External tool-server subprocess management.
//!
//! A tool server is a child process speaking line-delimited JSON-RPC 2.0
//! over stdio. Lifecycle per server: spawn, `initialize`, `tools/list`,
//! then any number of `tools/call` invocations, and a best-effort
//! `shutdown` before the process is killed.

use serde::Deserialize;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use async_trait::async_trait;
use toolchat_core::error::ToolError;
use toolchat_core::tool::Tool;

const REQUEST_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);
const SHUTDOWN_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(2);

/// A tool advertised by a server in its `tools/list` reply.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteToolSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<String>,
}

/// A running tool-server subprocess.
pub struct ToolServer {
    name: String,
    child: Child,
    stdin: ChildStdin,
    stdout: Lines<BufReader<ChildStdout>>,
    next_id: u64,
}

impl ToolServer {
    /// Spawn a tool server process with piped stdio.
    pub async fn spawn(
        name: &str,
        command: &str,
        args: &[String],
        env: &HashMap<String, String>,
    ) -> Result<Self, ToolError> {
        debug!(server = %name, command = %command, "Spawning tool server");

        let mut child = Command::new(command)
            .args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ToolError::ServerUnavailable {
                server: name.to_string(),
                reason: format!("Failed to spawn '{command}': {e}"),
            })?;

        let stdin = child.stdin.take().ok_or_else(|| ToolError::ServerUnavailable {
            server: name.to_string(),
            reason: "Child stdin not captured".into(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| ToolError::ServerUnavailable {
            server: name.to_string(),
            reason: "Child stdout not captured".into(),
        })?;

        Ok(Self {
            name: name.to_string(),
            child,
            stdin,
            stdout: BufReader::new(stdout).lines(),
            next_id: 1,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Send one JSON-RPC request and wait for the matching response.
    /// Notifications and unrelated responses on the pipe are skipped.
    async fn request(
        &mut self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        let id = self.next_id;
        self.next_id += 1;

        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let mut line = request.to_string();
        line.push('\n');

        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| self.unavailable(format!("Write to server failed: {e}")))?;
        self.stdin
            .flush()
            .await
            .map_err(|e| self.unavailable(format!("Flush to server failed: {e}")))?;

        let deadline = tokio::time::Instant::now() + REQUEST_TIMEOUT;
        loop {
            let next = tokio::time::timeout_at(deadline, self.stdout.next_line())
                .await
                .map_err(|_| self.unavailable(format!("Timed out waiting for '{method}' reply")))?;

            let line = match next {
                Ok(Some(line)) => line,
                Ok(None) => return Err(self.unavailable("Server closed its stdout".into())),
                Err(e) => return Err(self.unavailable(format!("Read from server failed: {e}"))),
            };

            let value: serde_json::Value = match serde_json::from_str(&line) {
                Ok(v) => v,
                Err(_) => {
                    debug!(server = %self.name, line = %line, "Skipping non-JSON server output");
                    continue;
                }
            };

            if value.get("id").and_then(|v| v.as_u64()) != Some(id) {
                continue;
            }

            if let Some(error) = value.get("error") {
                let message = error
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown error");
                return Err(ToolError::ExecutionFailed {
                    tool_name: method.to_string(),
                    reason: format!("Server '{}' returned error: {message}", self.name),
                });
            }

            return Ok(value.get("result").cloned().unwrap_or(serde_json::Value::Null));
        }
    }

    fn unavailable(&self, reason: String) -> ToolError {
        ToolError::ServerUnavailable {
            server: self.name.clone(),
            reason,
        }
    }

    /// Perform the initialize handshake.
    pub async fn initialize(&mut self) -> Result<(), ToolError> {
        self.request(
            "initialize",
            serde_json::json!({
                "clientInfo": {
                    "name": "toolchat",
                    "version": env!("CARGO_PKG_VERSION"),
                },
            }),
        )
        .await?;
        Ok(())
    }

    /// Ask the server which tools it provides.
    pub async fn list_tools(&mut self) -> Result<Vec<RemoteToolSpec>, ToolError> {
        let result = self.request("tools/list", serde_json::json!({})).await?;
        let tools = result
            .get("tools")
            .cloned()
            .unwrap_or(serde_json::Value::Array(Vec::new()));
        serde_json::from_value(tools).map_err(|e| {
            self.unavailable(format!("Malformed tools/list reply: {e}"))
        })
    }

    /// Invoke a named tool with a JSON arguments object.
    pub async fn call_tool(
        &mut self,
        tool: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        self.request(
            "tools/call",
            serde_json::json!({
                "name": tool,
                "arguments": arguments,
            }),
        )
        .await
    }

    /// Best-effort graceful shutdown, then kill.
    pub async fn shutdown(&mut self) {
        let _ = tokio::time::timeout(
            SHUTDOWN_TIMEOUT,
            self.request("shutdown", serde_json::json!({})),
        )
        .await;
        if let Err(e) = self.child.start_kill() {
            warn!(server = %self.name, error = %e, "Failed to kill tool server");
        }
    }
}

/// Convert positional command tokens into a JSON arguments object.
///
/// A `key=value` token becomes an entry split on the first `=`; a bare
/// token lands under the `value` key (last one wins).
pub fn args_to_json(args: &[String]) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for arg in args {
        match arg.split_once('=') {
            Some((key, value)) if !key.trim().is_empty() => {
                map.insert(key.trim().to_string(), value.trim().into());
            }
            _ => {
                map.insert("value".to_string(), arg.trim().into());
            }
        }
    }
    serde_json::Value::Object(map)
}

/// An adapter exposing one remote tool through the local [`Tool`] trait.
///
/// Registered as `mcp_<server>_<tool>`; all tools from the same server
/// share the server handle behind a mutex, so calls serialize.
pub struct ServerTool {
    full_name: String,
    server_name: String,
    remote_name: String,
    description: String,
    parameters: Vec<String>,
    server: Arc<Mutex<ToolServer>>,
}

impl ServerTool {
    pub fn new(
        server_name: &str,
        spec: RemoteToolSpec,
        server: Arc<Mutex<ToolServer>>,
    ) -> Self {
        Self {
            full_name: format!("mcp_{server_name}_{}", spec.name),
            server_name: server_name.to_string(),
            remote_name: spec.name,
            description: if spec.description.is_empty() {
                "No description".to_string()
            } else {
                spec.description
            },
            parameters: spec.parameters,
            server,
        }
    }
}

#[async_trait]
impl Tool for ServerTool {
    fn name(&self) -> &str {
        &self.full_name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn server_group(&self) -> Option<&str> {
        Some(&self.server_name)
    }

    fn parameter_names(&self) -> Vec<String> {
        self.parameters.clone()
    }

    async fn invoke(&self, args: &[String]) -> Result<String, ToolError> {
        let arguments = args_to_json(args);
        debug!(tool = %self.full_name, args = %arguments, "Calling server tool");

        let mut server = self.server.lock().await;
        let result = server.call_tool(&self.remote_name, arguments).await?;

        Ok(match result {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
    }
}
