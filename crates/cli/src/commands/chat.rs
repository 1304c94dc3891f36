//! `toolchat chat`: interactive or single-message chat mode.

use std::io::Write as _;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use toolchat_config::{AppConfig, PromptTemplates};
use toolchat_core::history::user_visible_turns;
use toolchat_core::{ConversationId, HistoryStore, MemoryHistoryStore, Provider, Turn};
use toolchat_engine::{Engine, EngineEvent};
use toolchat_providers::OpenAiCompatProvider;
use toolchat_tools::{LoadedTools, ToolSource};

pub async fn run(message: Option<String>, no_stream: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Check for API key early and give a clear error
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    DEEPSEEK_API_KEY   (for DeepSeek, the default endpoint)");
        eprintln!("    OPENAI_API_KEY     (for OpenAI-compatible endpoints)");
        eprintln!("    ANTHROPIC_API_KEY  (generic fallback)");
        eprintln!();
        eprintln!("  Or add it to your config file:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let templates =
        PromptTemplates::load_or_default(&AppConfig::config_dir().join("prompts.json"));

    // Built-in tools plus any configured server descriptors
    let mut sources = vec![ToolSource::Builtin];
    sources.extend(
        config
            .tool_sources
            .iter()
            .map(|p| ToolSource::ServerConfig(PathBuf::from(p))),
    );
    let mut loaded = LoadedTools::load(&sources).await;
    let registry = Arc::new(std::mem::take(&mut loaded.registry));

    let api_key = config.api.api_key.clone().unwrap_or_default();
    let provider: Arc<dyn Provider> = Arc::new(OpenAiCompatProvider::new(
        provider_name(&config.api.api_base),
        &config.api.api_base,
        api_key,
    )?);

    let mut engine = Engine::new(
        provider,
        Arc::clone(&registry),
        config.engine.clone(),
        templates,
        &config.api.model,
    );
    if let Some(prompt) = &config.system_prompt {
        engine = engine.with_system_prompt(prompt);
    }

    // Ctrl+C stops the current run instead of killing the process
    let cancel = engine.cancel_flag();
    tokio::spawn(async move {
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                break;
            }
            cancel.trigger();
        }
    });

    let result = if let Some(msg) = message {
        single_message(&engine, &msg, no_stream).await
    } else {
        interactive(&engine, &config, no_stream, loaded.server_count()).await
    };

    loaded.shutdown().await;
    result
}

async fn single_message(
    engine: &Engine,
    message: &str,
    no_stream: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut history = Vec::new();

    if no_stream {
        let response = engine.run(message, &mut history).await;
        println!("{response}");
    } else {
        run_streamed(engine, message, &mut history).await?;
        println!();
    }

    Ok(())
}

async fn interactive(
    engine: &Engine,
    config: &AppConfig,
    no_stream: bool,
    server_count: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║        toolchat — Interactive Mode           ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Endpoint:  {}", config.api.api_base);
    println!("  Model:     {}", config.api.model);
    println!(
        "  Tools:     {} registered ({} external server{})",
        engine.registry().len(),
        server_count,
        if server_count == 1 { "" } else { "s" }
    );
    println!();
    println!("  Type your message and press Enter.");
    println!("  'tools' lists tools, 'clear' resets the conversation,");
    println!("  'exit' quits. Ctrl+C stops a running command.");
    println!();

    let cancel = engine.cancel_flag();
    let store = MemoryHistoryStore::new();
    let conversation = ConversationId::new();
    let system_prompt = engine.effective_system_prompt();
    let mut history: Vec<Turn> = store.load(&conversation, &system_prompt).await?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    prompt()?;
    while let Some(line) = lines.next_line().await? {
        let input = line.trim();
        match input {
            "" => {}
            "exit" | "quit" => break,
            "clear" => {
                store.clear(&conversation, &system_prompt).await?;
                history = store.load(&conversation, &system_prompt).await?;
                println!("  Conversation cleared.");
            }
            "tools" => {
                for name in engine.registry().names() {
                    println!("  - {name}");
                }
            }
            _ => {
                // Ignore any Ctrl+C pressed while idle at the prompt
                cancel.reset();
                println!();

                if no_stream {
                    eprint!("  ...");
                    let response = engine.run(input, &mut history).await;
                    eprint!("\r     \r");
                    for line in response.lines() {
                        println!("  {line}");
                    }
                } else {
                    run_streamed(engine, input, &mut history).await?;
                    println!();
                }
                store.save(&conversation, &history).await?;
                println!();
            }
        }
        prompt()?;
    }

    println!();
    println!(
        "  Goodbye! ({} turns this session)",
        user_visible_turns(&history)
    );
    Ok(())
}

/// Run one streamed request, rendering events to stdout as they arrive.
async fn run_streamed(
    engine: &Engine,
    input: &str,
    history: &mut Vec<Turn>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (tx, mut rx) = mpsc::channel::<EngineEvent>(64);

    let printer = async move {
        while let Some(event) = rx.recv().await {
            match event {
                EngineEvent::Chunk { content } => {
                    print!("{content}");
                    let _ = std::io::stdout().flush();
                }
                EngineEvent::CommandLine { .. } => {
                    // The command text itself was already streamed
                }
                EngineEvent::CommandResult { output } => {
                    println!();
                    println!();
                    println!("  ┌ Command Result");
                    for line in output.lines() {
                        println!("  │ {line}");
                    }
                    println!("  └");
                }
                EngineEvent::Error { message } => {
                    eprintln!();
                    eprintln!("{message}");
                }
                EngineEvent::Done { .. } => {}
            }
        }
    };

    let run = engine.run_streaming(input, history, tx);
    let (_, _response) = tokio::join!(printer, run);

    Ok(())
}

fn prompt() -> Result<(), Box<dyn std::error::Error>> {
    print!("  You > ");
    std::io::stdout().flush()?;
    Ok(())
}

fn provider_name(api_base: &str) -> &'static str {
    if api_base.contains("deepseek") {
        "deepseek"
    } else if api_base.contains("openai") {
        "openai"
    } else if api_base.contains("localhost") || api_base.contains("127.0.0.1") {
        "local"
    } else {
        "custom"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_name_from_base_url() {
        assert_eq!(provider_name("https://api.deepseek.com"), "deepseek");
        assert_eq!(provider_name("https://api.openai.com/v1"), "openai");
        assert_eq!(provider_name("http://localhost:11434/v1"), "local");
        assert_eq!(provider_name("https://llm.example.com/v1"), "custom");
    }
}
