//! Network tools: fetch a URL, download a file.

use async_trait::async_trait;
use toolchat_core::error::ToolError;
use toolchat_core::tool::Tool;

// Page bodies beyond this are truncated before being fed back to the
// model
const MAX_FETCH_BYTES: usize = 100_000;

fn validate_url(url: &str) -> Result<(), ToolError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ToolError::InvalidArguments(
            "URL must start with http:// or https://".into(),
        ));
    }
    Ok(())
}

fn build_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(60))
        .build()
        .unwrap_or_default()
}

/// Fetch a URL and return the response body as text.
pub struct FetchUrlTool {
    client: reqwest::Client,
}

impl FetchUrlTool {
    pub fn new() -> Self {
        Self {
            client: build_client(),
        }
    }
}

impl Default for FetchUrlTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for FetchUrlTool {
    fn name(&self) -> &str {
        "fetch_url"
    }

    fn description(&self) -> &str {
        "Fetch a web page and return its body as text. Long bodies are\n\
         truncated.\n\
         Parameters:\n\
         - url (required): The URL to fetch. Must start with http:// or https://.\n\
         CORRECT: fetch_url(\"https://example.com/page\")\n\
         WRONG: fetch_url(url=\"https://example.com/page\")"
    }

    fn parameter_names(&self) -> Vec<String> {
        vec!["url".into()]
    }

    async fn invoke(&self, args: &[String]) -> Result<String, ToolError> {
        let [url] = args else {
            return Err(ToolError::InvalidArguments(format!(
                "fetch_url expects exactly 1 argument (url), got {}",
                args.len()
            )));
        };
        validate_url(url)?;

        let response = self.client.get(url).send().await.map_err(|e| {
            ToolError::ExecutionFailed {
                tool_name: "fetch_url".into(),
                reason: format!("Request failed: {e}"),
            }
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| ToolError::ExecutionFailed {
            tool_name: "fetch_url".into(),
            reason: format!("Failed to read response body: {e}"),
        })?;

        let truncated = if body.len() > MAX_FETCH_BYTES {
            let mut cut = MAX_FETCH_BYTES;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}\n[truncated, {} bytes total]", &body[..cut], body.len())
        } else {
            body
        };

        Ok(format!("HTTP {status}\n{truncated}"))
    }
}

/// Download a URL to a local file.
pub struct DownloadFileTool {
    client: reqwest::Client,
}

impl DownloadFileTool {
    pub fn new() -> Self {
        Self {
            client: build_client(),
        }
    }
}

impl Default for DownloadFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for DownloadFileTool {
    fn name(&self) -> &str {
        "download_file"
    }

    fn description(&self) -> &str {
        "Download a document from a URL to local storage. Returns the save\n\
         path on success.\n\
         Parameters:\n\
         - url (required): The URL to download from. Must start with http:// or https://.\n\
         - save_path (required): Local save path including filename and extension.\n\
         CORRECT: download_file(\"https://example.com/file.pdf\", \"/home/user/downloads/file.pdf\")\n\
         WRONG: download_file(url=\"https://example.com/file.pdf\", save_path=\"/home/user/downloads/file.pdf\")"
    }

    fn parameter_names(&self) -> Vec<String> {
        vec!["url".into(), "save_path".into()]
    }

    async fn invoke(&self, args: &[String]) -> Result<String, ToolError> {
        let [url, save_path] = args else {
            return Err(ToolError::InvalidArguments(format!(
                "download_file expects exactly 2 arguments (url, save_path), got {}",
                args.len()
            )));
        };
        validate_url(url)?;
        if save_path.trim().is_empty() {
            return Err(ToolError::InvalidArguments("save_path must not be empty".into()));
        }

        if let Some(parent) = std::path::Path::new(save_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let response = self.client.get(url).send().await.map_err(|e| {
            ToolError::ExecutionFailed {
                tool_name: "download_file".into(),
                reason: format!("Download failed: {e}"),
            }
        })?;

        if !response.status().is_success() {
            return Err(ToolError::ExecutionFailed {
                tool_name: "download_file".into(),
                reason: format!("Download failed: HTTP {}", response.status()),
            });
        }

        let bytes = response.bytes().await.map_err(|e| ToolError::ExecutionFailed {
            tool_name: "download_file".into(),
            reason: format!("Download failed: {e}"),
        })?;

        if bytes.is_empty() {
            return Err(ToolError::ExecutionFailed {
                tool_name: "download_file".into(),
                reason: "Downloaded file is empty".into(),
            });
        }

        tokio::fs::write(save_path, &bytes).await?;
        Ok(save_path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fetch_url_rejects_bad_scheme() {
        let tool = FetchUrlTool::new();
        let err = tool.invoke(&["ftp://example.com".into()]).await.unwrap_err();
        assert!(err.to_string().contains("http"));
    }

    #[tokio::test]
    async fn fetch_url_wrong_arity() {
        let tool = FetchUrlTool::new();
        assert!(tool.invoke(&[]).await.is_err());
    }

    #[tokio::test]
    async fn download_file_rejects_empty_save_path() {
        let tool = DownloadFileTool::new();
        let err = tool
            .invoke(&["https://example.com/f.pdf".into(), "  ".into()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("save_path"));
    }
}
