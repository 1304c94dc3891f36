//! System information tool.

use async_trait::async_trait;
use toolchat_core::error::ToolError;
use toolchat_core::tool::Tool;

/// Report basic information about the host system as JSON.
pub struct SystemInfoTool;

#[async_trait]
impl Tool for SystemInfoTool {
    fn name(&self) -> &str {
        "get_system_info"
    }

    fn description(&self) -> &str {
        "Get basic information about the current system: OS name, architecture,\n\
         working directory, user, and CPU count. Takes no arguments.\n\
         CORRECT: get_system_info()\n\
         WRONG: get_system_info(system=\"linux\")"
    }

    async fn invoke(&self, args: &[String]) -> Result<String, ToolError> {
        if !args.is_empty() {
            return Err(ToolError::InvalidArguments(format!(
                "get_system_info takes no arguments, got {}",
                args.len()
            )));
        }

        let mut info = serde_json::Map::new();
        info.insert("os_name".into(), std::env::consts::OS.into());
        info.insert("architecture".into(), std::env::consts::ARCH.into());
        info.insert("os_family".into(), std::env::consts::FAMILY.into());

        let cwd = std::env::current_dir()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|_| "Unknown".into());
        info.insert("cwd".into(), cwd.into());

        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "Unknown".into());
        info.insert("user".into(), user.into());

        let cpu_count = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(0);
        info.insert("cpu_count".into(), cpu_count.into());

        // Best-effort extras on Linux
        if std::env::consts::OS == "linux" {
            if let Ok(os_release) = tokio::fs::read_to_string("/etc/os-release").await {
                if let Some(line) = os_release
                    .lines()
                    .find(|l| l.starts_with("PRETTY_NAME="))
                {
                    let distro = line
                        .trim_start_matches("PRETTY_NAME=")
                        .trim_matches('"')
                        .to_string();
                    info.insert("linux_distro".into(), distro.into());
                }
            }
            if let Ok(meminfo) = tokio::fs::read_to_string("/proc/meminfo").await {
                let lines: Vec<String> = meminfo
                    .lines()
                    .take(3)
                    .map(|l| l.trim().to_string())
                    .collect();
                info.insert("memory_info".into(), lines.into());
            }
        }

        serde_json::to_string_pretty(&serde_json::Value::Object(info)).map_err(|e| {
            ToolError::ExecutionFailed {
                tool_name: "get_system_info".into(),
                reason: e.to_string(),
            }
        })
    }
}
