//! `toolchat config`: configuration inspection commands.

use toolchat_config::AppConfig;

pub async fn check() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Validating configuration...");

    match AppConfig::load() {
        Ok(config) => {
            println!("   ✅ Config parsed successfully");

            config.validate()?;

            let mut warnings = Vec::new();

            if !config.has_api_key() {
                warnings.push(
                    "No API key set (set DEEPSEEK_API_KEY or OPENAI_API_KEY env var)".to_string(),
                );
            }

            for source in &config.tool_sources {
                if !std::path::Path::new(source).exists() {
                    warnings.push(format!("Tool source not found: {source}"));
                }
            }

            if warnings.is_empty() {
                println!("   ✅ All checks passed");
            } else {
                println!();
                for w in &warnings {
                    println!("   ⚠️  {w}");
                }
            }

            println!();
            println!("   Endpoint:      {}", config.api.api_base);
            println!("   Model:         {}", config.api.model);
            println!("   Max steps:     {}", config.engine.max_iterations);
            println!("   Tool sources:  {}", config.tool_sources.len());
        }
        Err(e) => {
            println!("   ❌ Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");
    println!("{}", config_path.display());
    Ok(())
}
