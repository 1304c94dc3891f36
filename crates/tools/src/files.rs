//! File operation tools: list, read, write, mkdir, move, copy.
//!
//! All arguments are positional values. Descriptions carry worked
//! CORRECT/WRONG examples so the model does not invent keyword syntax.

use async_trait::async_trait;
use toolchat_core::error::ToolError;
use toolchat_core::tool::Tool;

fn arity_error(tool: &str, expected: &str, got: usize) -> ToolError {
    ToolError::InvalidArguments(format!("{tool} expects {expected}, got {got}"))
}

/// List directory contents.
pub struct LsTool;

#[async_trait]
impl Tool for LsTool {
    fn name(&self) -> &str {
        "ls"
    }

    fn description(&self) -> &str {
        "List all files and subdirectories in the specified directory.\n\
         Parameters:\n\
         - directory (optional): Directory path to list. Defaults to the current directory.\n\
         CORRECT: ls(\"/home/user/documents\")\n\
         WRONG: ls(directory=\"/home/user/documents\")"
    }

    fn parameter_names(&self) -> Vec<String> {
        vec!["directory".into()]
    }

    async fn invoke(&self, args: &[String]) -> Result<String, ToolError> {
        if args.len() > 1 {
            return Err(arity_error("ls", "at most 1 argument", args.len()));
        }
        let directory = args.first().map(String::as_str).unwrap_or(".");

        let mut entries = tokio::fs::read_dir(directory).await.map_err(|e| {
            ToolError::ExecutionFailed {
                tool_name: "ls".into(),
                reason: format!("Directory does not exist or is unreadable: {directory}: {e}"),
            }
        })?;

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();

        Ok(format!("Contents of {directory}: {}", names.join(", ")))
    }
}

/// Read a file's contents.
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Read a file's content and return it as text.\n\
         Parameters:\n\
         - filepath (required): Path of the file to read.\n\
         CORRECT: read_file(\"/home/user/notes.txt\")\n\
         WRONG: read_file(filepath=\"/home/user/notes.txt\")"
    }

    fn parameter_names(&self) -> Vec<String> {
        vec!["filepath".into()]
    }

    async fn invoke(&self, args: &[String]) -> Result<String, ToolError> {
        let [filepath] = args else {
            return Err(arity_error("read_file", "exactly 1 argument (filepath)", args.len()));
        };

        tokio::fs::read_to_string(filepath)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "read_file".into(),
                reason: format!("Failed to read {filepath}: {e}"),
            })
    }
}

/// Write text to a file, overwriting or appending.
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Write text to a file. Creates parent directories as needed. A trailing\n\
         newline is added when the text does not end with one.\n\
         Parameters:\n\
         - text (required): The text to write.\n\
         - filepath (required): Destination file path.\n\
         - mode (required): \"0\" to overwrite, \"1\" to append.\n\
         CORRECT: write_file(\"Hello, World!\", \"/home/user/out.txt\", \"0\")\n\
         WRONG: write_file(text=\"Hello\", filepath=\"/home/user/out.txt\", mode=\"0\")"
    }

    fn parameter_names(&self) -> Vec<String> {
        vec!["text".into(), "filepath".into(), "mode".into()]
    }

    async fn invoke(&self, args: &[String]) -> Result<String, ToolError> {
        let [text, filepath, mode] = args else {
            return Err(arity_error(
                "write_file",
                "exactly 3 arguments (text, filepath, mode)",
                args.len(),
            ));
        };

        if filepath.trim().is_empty() {
            return Err(ToolError::InvalidArguments("filepath must not be empty".into()));
        }
        let append = match mode.as_str() {
            "0" => false,
            "1" => true,
            other => {
                return Err(ToolError::InvalidArguments(format!(
                    "mode must be \"0\" (overwrite) or \"1\" (append), got \"{other}\""
                )))
            }
        };

        if let Some(parent) = std::path::Path::new(filepath).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut content = text.clone();
        if !content.ends_with('\n') {
            content.push('\n');
        }

        let result = if append {
            use tokio::io::AsyncWriteExt;
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(filepath)
                .await?;
            file.write_all(content.as_bytes()).await
        } else {
            tokio::fs::write(filepath, content.as_bytes()).await
        };

        result.map_err(|e| ToolError::ExecutionFailed {
            tool_name: "write_file".into(),
            reason: format!("Failed to write {filepath}: {e}"),
        })?;

        Ok(if append {
            format!("Appended text to {filepath}")
        } else {
            format!("Wrote text to {filepath}")
        })
    }
}

/// Create a directory.
pub struct MkdirTool;

#[async_trait]
impl Tool for MkdirTool {
    fn name(&self) -> &str {
        "mkdir"
    }

    fn description(&self) -> &str {
        "Create a directory, including missing parents. An existing directory\n\
         is not overwritten.\n\
         Parameters:\n\
         - directory (required): Path of the directory to create.\n\
         CORRECT: mkdir(\"/home/user/new_folder\")\n\
         WRONG: mkdir(directory=\"/home/user/new_folder\")"
    }

    fn parameter_names(&self) -> Vec<String> {
        vec!["directory".into()]
    }

    async fn invoke(&self, args: &[String]) -> Result<String, ToolError> {
        let [directory] = args else {
            return Err(arity_error("mkdir", "exactly 1 argument (directory)", args.len()));
        };

        if tokio::fs::try_exists(directory).await.unwrap_or(false) {
            return Ok(format!("Directory already exists: {directory}"));
        }

        tokio::fs::create_dir_all(directory)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "mkdir".into(),
                reason: format!("Failed to create {directory}: {e}"),
            })?;

        Ok(format!("Created directory: {directory}"))
    }
}

/// Move a file or directory.
pub struct MvTool;

#[async_trait]
impl Tool for MvTool {
    fn name(&self) -> &str {
        "mv"
    }

    fn description(&self) -> &str {
        "Move a file or directory to the target path. If the target directory\n\
         does not exist, create it with mkdir first.\n\
         Parameters:\n\
         - source (required): Source file or directory path.\n\
         - destination (required): Target path.\n\
         CORRECT: mv(\"/home/user/file.txt\", \"/home/user/backup/file.txt\")\n\
         WRONG: mv(source=\"/home/user/file.txt\", destination=\"/home/user/backup/file.txt\")"
    }

    fn parameter_names(&self) -> Vec<String> {
        vec!["source".into(), "destination".into()]
    }

    async fn invoke(&self, args: &[String]) -> Result<String, ToolError> {
        let [source, destination] = args else {
            return Err(arity_error("mv", "exactly 2 arguments (source, destination)", args.len()));
        };

        if !tokio::fs::try_exists(source).await.unwrap_or(false) {
            return Err(ToolError::ExecutionFailed {
                tool_name: "mv".into(),
                reason: format!("Source does not exist: {source}"),
            });
        }

        tokio::fs::rename(source, destination)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "mv".into(),
                reason: format!("Failed to move {source} to {destination}: {e}"),
            })?;

        Ok(format!("Moved {source} to {destination}"))
    }
}

/// Copy a file or directory.
pub struct CpTool;

#[async_trait]
impl Tool for CpTool {
    fn name(&self) -> &str {
        "cp"
    }

    fn description(&self) -> &str {
        "Copy a file or directory (recursively) to the target path.\n\
         Parameters:\n\
         - source (required): Source file or directory path.\n\
         - destination (required): Target path.\n\
         CORRECT: cp(\"/home/user/report.pdf\", \"/home/user/backup/report.pdf\")\n\
         WRONG: cp(source=\"/home/user/report.pdf\", destination=\"/home/user/backup/report.pdf\")"
    }

    fn parameter_names(&self) -> Vec<String> {
        vec!["source".into(), "destination".into()]
    }

    async fn invoke(&self, args: &[String]) -> Result<String, ToolError> {
        let [source, destination] = args else {
            return Err(arity_error("cp", "exactly 2 arguments (source, destination)", args.len()));
        };

        let source = source.clone();
        let destination = destination.clone();
        let src_disp = source.clone();
        let dst_disp = destination.clone();

        tokio::task::spawn_blocking(move || copy_recursive(source.as_ref(), destination.as_ref()))
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "cp".into(),
                reason: format!("Copy task failed: {e}"),
            })?
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "cp".into(),
                reason: format!("Failed to copy {src_disp} to {dst_disp}: {e}"),
            })?;

        Ok(format!("Copied {src_disp} to {dst_disp}"))
    }
}

fn copy_recursive(source: &std::path::Path, destination: &std::path::Path) -> std::io::Result<()> {
    let meta = std::fs::metadata(source)?;
    if meta.is_dir() {
        std::fs::create_dir_all(destination)?;
        for entry in std::fs::read_dir(source)? {
            let entry = entry?;
            copy_recursive(&entry.path(), &destination.join(entry.file_name()))?;
        }
    } else {
        if let Some(parent) = destination.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::copy(source, destination)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ls_lists_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "x").unwrap();
        std::fs::write(dir.path().join("b.txt"), "y").unwrap();

        let out = LsTool
            .invoke(&[dir.path().to_string_lossy().into_owned()])
            .await
            .unwrap();
        assert!(out.contains("a.txt"));
        assert!(out.contains("b.txt"));
    }

    #[tokio::test]
    async fn ls_missing_directory_fails() {
        let result = LsTool.invoke(&["/nonexistent_dir_xyz".into()]).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn read_file_returns_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("note.txt");
        std::fs::write(&path, "hello world").unwrap();

        let out = ReadFileTool
            .invoke(&[path.to_string_lossy().into_owned()])
            .await
            .unwrap();
        assert_eq!(out, "hello world");
    }

    #[tokio::test]
    async fn read_file_wrong_arity() {
        let err = ReadFileTool.invoke(&[]).await.unwrap_err();
        assert!(err.to_string().contains("exactly 1 argument"));
    }

    #[tokio::test]
    async fn write_file_overwrite_and_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt").to_string_lossy().into_owned();

        WriteFileTool
            .invoke(&["first".into(), path.clone(), "0".into()])
            .await
            .unwrap();
        WriteFileTool
            .invoke(&["second".into(), path.clone(), "1".into()])
            .await
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "first\nsecond\n");
    }

    #[tokio::test]
    async fn write_file_rejects_bad_mode() {
        let err = WriteFileTool
            .invoke(&["x".into(), "/tmp/x.txt".into(), "2".into()])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("mode"));
    }

    #[tokio::test]
    async fn mkdir_creates_and_reports_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").to_string_lossy().into_owned();

        let first = MkdirTool.invoke(&[path.clone()]).await.unwrap();
        assert!(first.contains("Created"));

        let second = MkdirTool.invoke(&[path]).await.unwrap();
        assert!(second.contains("already exists"));
    }

    #[tokio::test]
    async fn mv_moves_file() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src.txt");
        let dst = dir.path().join("dst.txt");
        std::fs::write(&src, "data").unwrap();

        MvTool
            .invoke(&[
                src.to_string_lossy().into_owned(),
                dst.to_string_lossy().into_owned(),
            ])
            .await
            .unwrap();

        assert!(!src.exists());
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "data");
    }

    #[tokio::test]
    async fn mv_missing_source_fails() {
        let result = MvTool
            .invoke(&["/no/such/file".into(), "/tmp/dst".into()])
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn cp_copies_directory_tree() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("tree");
        std::fs::create_dir_all(src.join("nested")).unwrap();
        std::fs::write(src.join("nested/file.txt"), "deep").unwrap();
        let dst = dir.path().join("copy");

        CpTool
            .invoke(&[
                src.to_string_lossy().into_owned(),
                dst.to_string_lossy().into_owned(),
            ])
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(dst.join("nested/file.txt")).unwrap(),
            "deep"
        );
    }
}
