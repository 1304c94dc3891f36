//! Built-in tools and external tool-server support.
//!
//! Built-in tools cover local file operations, network fetches, and
//! system inspection. External tool servers are subprocesses speaking
//! line-delimited JSON-RPC over stdio; their tools register under
//! `mcp_<server>_<tool>` names alongside the built-ins.

pub mod files;
pub mod loader;
pub mod network;
pub mod server;
pub mod sysinfo;

pub use loader::{LoadedTools, ToolSource};
pub use server::ToolServer;

use std::sync::Arc;
use toolchat_core::ToolRegistry;

/// Register every built-in tool into a fresh registry.
pub fn builtin_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(files::LsTool));
    registry.register(Arc::new(files::ReadFileTool));
    registry.register(Arc::new(files::WriteFileTool));
    registry.register(Arc::new(files::MkdirTool));
    registry.register(Arc::new(files::MvTool));
    registry.register(Arc::new(files::CpTool));
    registry.register(Arc::new(network::FetchUrlTool::new()));
    registry.register(Arc::new(network::DownloadFileTool::new()));
    registry.register(Arc::new(sysinfo::SystemInfoTool));
    registry
}
