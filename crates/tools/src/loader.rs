//! Tool loading: built-ins plus external server configs.
//!
//! Tools load into a staging registry per source, then merge into the
//! final registry in source order, so a later source wins name
//! collisions. A source that fails to load is skipped with a warning;
//! loading never aborts the whole set.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use toolchat_core::ToolRegistry;

use crate::server::{ServerTool, ToolServer};

/// Where a batch of tools comes from.
#[derive(Debug, Clone)]
pub enum ToolSource {
    /// The built-in local tools
    Builtin,
    /// A JSON file describing external tool servers
    ServerConfig(PathBuf),
}

/// A server-config file: `{"servers": {"<name>": {command, args, env}}}`.
#[derive(Debug, Deserialize)]
struct ServersFile {
    #[serde(default)]
    servers: HashMap<String, ServerEntry>,
}

#[derive(Debug, Deserialize)]
struct ServerEntry {
    #[serde(default = "default_command")]
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: HashMap<String, String>,
}

fn default_command() -> String {
    "npx".into()
}

/// The loaded tool set plus the server processes backing it.
///
/// Call [`LoadedTools::shutdown`] before exit so server subprocesses
/// terminate cleanly.
pub struct LoadedTools {
    pub registry: ToolRegistry,
    servers: Vec<Arc<Mutex<ToolServer>>>,
}

impl LoadedTools {
    /// Load tools from every source, in order.
    pub async fn load(sources: &[ToolSource]) -> Self {
        let mut registry = ToolRegistry::new();
        let mut servers = Vec::new();

        for source in sources {
            match source {
                ToolSource::Builtin => {
                    let staged = crate::builtin_registry();
                    info!(count = staged.len(), "Loaded built-in tools");
                    registry.merge(staged);
                }
                ToolSource::ServerConfig(path) => {
                    match load_server_config(path).await {
                        Ok((staged, mut spawned)) => {
                            info!(
                                path = %path.display(),
                                tools = staged.len(),
                                servers = spawned.len(),
                                "Loaded tool servers"
                            );
                            registry.merge(staged);
                            servers.append(&mut spawned);
                        }
                        Err(e) => {
                            warn!(
                                path = %path.display(),
                                error = %e,
                                "Skipping tool-server config"
                            );
                        }
                    }
                }
            }
        }

        Self { registry, servers }
    }

    /// Number of running server processes.
    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    /// Shut down every server subprocess.
    pub async fn shutdown(&self) {
        for server in &self.servers {
            let mut server = server.lock().await;
            info!(server = %server.name(), "Shutting down tool server");
            server.shutdown().await;
        }
    }
}

type SpawnedServers = Vec<Arc<Mutex<ToolServer>>>;

/// Parse a server-config file and bring up each server it names.
///
/// One server failing to start skips that server only.
async fn load_server_config(
    path: &std::path::Path,
) -> std::io::Result<(ToolRegistry, SpawnedServers)> {
    let content = tokio::fs::read_to_string(path).await?;
    let file: ServersFile = serde_json::from_str(&content)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    let mut registry = ToolRegistry::new();
    let mut spawned = Vec::new();

    for (name, entry) in &file.servers {
        let mut server = match ToolServer::spawn(name, &entry.command, &entry.args, &entry.env)
            .await
        {
            Ok(s) => s,
            Err(e) => {
                warn!(server = %name, error = %e, "Failed to start tool server");
                continue;
            }
        };

        if let Err(e) = server.initialize().await {
            warn!(server = %name, error = %e, "Tool server failed to initialize");
            server.shutdown().await;
            continue;
        }

        let tools = match server.list_tools().await {
            Ok(t) => t,
            Err(e) => {
                warn!(server = %name, error = %e, "Tool server failed to list tools");
                server.shutdown().await;
                continue;
            }
        };

        info!(server = %name, count = tools.len(), "Tool server ready");

        let handle = Arc::new(Mutex::new(server));
        for spec in tools {
            if spec.name.is_empty() {
                continue;
            }
            registry.register(Arc::new(ServerTool::new(name, spec, Arc::clone(&handle))));
        }
        spawned.push(handle);
    }

    Ok((registry, spawned))
}
