//! `toolchat tools`: list every tool the chat session would have.

use std::collections::BTreeMap;
use std::path::PathBuf;

use toolchat_config::AppConfig;
use toolchat_tools::{LoadedTools, ToolSource};

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    let mut sources = vec![ToolSource::Builtin];
    sources.extend(
        config
            .tool_sources
            .iter()
            .map(|p| ToolSource::ServerConfig(PathBuf::from(p))),
    );
    let loaded = LoadedTools::load(&sources).await;

    // Group by server, builtins first
    let mut groups: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for descriptor in loaded.registry.descriptors(config.engine.enabled_tools.as_ref()) {
        let group = descriptor
            .server_group
            .clone()
            .unwrap_or_else(|| "builtin".to_string());
        let marker = if descriptor.enabled { "" } else { " (disabled)" };
        groups
            .entry(group)
            .or_default()
            .push(format!("{}{marker}", descriptor.name));
    }

    println!();
    for (group, names) in &groups {
        println!("  {} ({} tools)", group, names.len());
        for name in names {
            println!("    - {name}");
        }
        println!();
    }
    println!(
        "  {} tools total, {} external server(s)",
        loaded.registry.len(),
        loaded.server_count()
    );

    loaded.shutdown().await;
    Ok(())
}
