use crate::error::CoreError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionMode {
    Local,
    Remote,
}

impl ConnectionMode {
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionMode::Local => "local",
            ConnectionMode::Remote => "remote",
        }
    }
}

/// Where commands actually run.
///
/// `execute` sources the helper script and then calls `command` with `args`,
/// each argument shell-quoted. Byte operations move whole files and either
/// succeed completely or fail.
#[async_trait]
pub trait ShellBackend: Send + Sync {
    fn mode(&self) -> ConnectionMode;

    async fn execute(&self, command: &str, args: &[&str]) -> Result<String, CoreError>;

    async fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>, CoreError>;

    async fn store_bytes(&self, path: &str, data: &[u8]) -> Result<(), CoreError>;

    async fn close(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

pub fn shell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', r"'\''"))
}

pub fn invocation(command: &str, args: &[&str]) -> String {
    let mut line = command.to_string();
    for arg in args {
        line.push(' ');
        line.push_str(&shell_quote(arg));
    }
    line
}

/// Maps captured output to the command contract: a non-zero exit with nothing
/// on stdout is a failure, anything else is the trimmed stdout.
pub(crate) fn captured_text(
    status: i32,
    stdout: &[u8],
    stderr: &[u8],
) -> Result<String, CoreError> {
    let text = String::from_utf8_lossy(stdout).trim().to_string();
    if status != 0 && text.is_empty() {
        let err = String::from_utf8_lossy(stderr).trim().to_string();
        let reason = if err.is_empty() {
            format!("exit status {status}")
        } else {
            err
        };
        return Err(CoreError::Command(reason));
    }
    Ok(text)
}

/// Writes `data` next to `path` and renames it into place, so readers never see
/// a half-written file.
pub async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), CoreError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let name = path
        .file_name()
        .ok_or_else(|| CoreError::Transfer(format!("not a file path: {}", path.display())))?
        .to_string_lossy()
        .to_string();
    let tmp = parent.join(format!(".{name}.{}.partial", Uuid::new_v4().simple()));

    if let Err(err) = tokio::fs::write(&tmp, data).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(CoreError::Transfer(format!("{}: {err}", path.display())));
    }
    if let Err(err) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(CoreError::Transfer(format!("{}: {err}", path.display())));
    }
    Ok(())
}

pub struct LocalBackend {
    shell: String,
    script: PathBuf,
}

impl LocalBackend {
    pub fn new(shell: impl Into<String>, script: PathBuf) -> Self {
        Self {
            shell: shell.into(),
            script,
        }
    }

    pub fn script(&self) -> &Path {
        &self.script
    }
}

#[async_trait]
impl ShellBackend for LocalBackend {
    fn mode(&self) -> ConnectionMode {
        ConnectionMode::Local
    }

    async fn execute(&self, command: &str, args: &[&str]) -> Result<String, CoreError> {
        if !self.script.exists() {
            return Err(CoreError::Command(format!(
                "helper script not found at {}",
                self.script.display()
            )));
        }
        let line = format!(
            "source {}; {}",
            shell_quote(&self.script.to_string_lossy()),
            invocation(command, args)
        );
        debug!(command, "local exec");
        let output = Command::new(&self.shell)
            .arg("-c")
            .arg(&line)
            .output()
            .await
            .map_err(|e| CoreError::Command(format!("{}: {e}", self.shell)))?;
        captured_text(
            output.status.code().unwrap_or(-1),
            &output.stdout,
            &output.stderr,
        )
    }

    async fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>, CoreError> {
        tokio::fs::read(path)
            .await
            .map_err(|e| CoreError::Transfer(format!("{path}: {e}")))
    }

    async fn store_bytes(&self, path: &str, data: &[u8]) -> Result<(), CoreError> {
        write_atomic(Path::new(path), data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn quotes_embedded_single_quotes() {
        assert_eq!(shell_quote("plain"), "'plain'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(
            invocation("fs_search", &["tax report", "/home/o'neil"]),
            r"fs_search 'tax report' '/home/o'\''neil'"
        );
    }

    #[test]
    fn failing_command_without_output_is_an_error() {
        assert!(matches!(
            captured_text(1, b"", b"fs_list: not a directory: /nope"),
            Err(CoreError::Command(msg)) if msg.contains("not a directory")
        ));
        assert_eq!(captured_text(1, b"partial\n", b"").unwrap(), "partial");
        assert_eq!(captured_text(0, b"", b"").unwrap(), "");
    }

    #[tokio::test]
    async fn missing_helper_script_fails_every_call() {
        let dir = TempDir::new().unwrap();
        let backend = LocalBackend::new("sh", dir.path().join("absent.zsh"));
        let err = backend.execute("fs_list", &["/"]).await.unwrap_err();
        assert!(matches!(err, CoreError::Command(msg) if msg.contains("helper script not found")));
    }

    #[tokio::test]
    async fn local_bytes_round_trip_through_atomic_write() {
        let dir = TempDir::new().unwrap();
        let backend = LocalBackend::new("sh", dir.path().join("unused.zsh"));
        let dest = dir.path().join("copy.bin");
        let dest = dest.to_string_lossy().to_string();
        backend.store_bytes(&dest, b"payload").await.unwrap();
        assert_eq!(backend.fetch_bytes(&dest).await.unwrap(), b"payload");

        let leftovers = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".partial"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn store_into_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("no").join("such").join("file.txt");
        let err = write_atomic(&dest, b"x").await.unwrap_err();
        assert!(matches!(err, CoreError::Transfer(_)));
        assert!(!dest.exists());
    }
}
