use crate::backend::{captured_text, invocation, shell_quote, ConnectionMode, ShellBackend};
use crate::error::CoreError;
use async_trait::async_trait;
use nexplorer_ssh::{SftpClient, SshSession};
use std::path::Path;
use tracing::{debug, info, warn};

/// Runs helper commands over an SSH session.
///
/// Each exec opens a new channel, so nothing defined by a previous call
/// survives; the helper is sourced again on every call.
pub struct RemoteBackend {
    session: SshSession,
    sftp: SftpClient,
    shell: String,
    /// Relative paths resolve against the remote home directory.
    script: String,
}

impl RemoteBackend {
    pub fn new(
        session: SshSession,
        sftp: SftpClient,
        shell: impl Into<String>,
        script: impl Into<String>,
    ) -> Self {
        Self {
            session,
            sftp,
            shell: shell.into(),
            script: script.into(),
        }
    }

    pub async fn deploy(&self, local_script: &Path) -> Result<(), CoreError> {
        let data = tokio::fs::read(local_script)
            .await
            .map_err(|e| CoreError::Deploy(format!("{}: {e}", local_script.display())))?;
        self.sftp
            .write_file(&self.script, &data)
            .await
            .map_err(|e| CoreError::Deploy(e.to_string()))?;
        info!(remote = %self.script, bytes = data.len(), "helper script deployed");
        Ok(())
    }
}

/// `<shell> -c 'source "$HOME"/<script>; <command> <args>'`
fn command_line(shell: &str, script: &str, command: &str, args: &[&str]) -> String {
    let prefix = if script.starts_with('/') { "" } else { "\"$HOME\"/" };
    let body = format!(
        "source {}{}; {}",
        prefix,
        shell_quote(script),
        invocation(command, args)
    );
    format!("{} -c {}", shell, shell_quote(&body))
}

#[async_trait]
impl ShellBackend for RemoteBackend {
    fn mode(&self) -> ConnectionMode {
        ConnectionMode::Remote
    }

    async fn execute(&self, command: &str, args: &[&str]) -> Result<String, CoreError> {
        let line = command_line(&self.shell, &self.script, command, args);
        debug!(command, "remote exec");
        let output = self
            .session
            .exec(&line)
            .await
            .map_err(|e| CoreError::Command(e.to_string()))?;
        captured_text(output.status, &output.stdout, &output.stderr)
    }

    async fn fetch_bytes(&self, path: &str) -> Result<Vec<u8>, CoreError> {
        self.sftp
            .read_file(path)
            .await
            .map_err(|e| CoreError::Transfer(format!("{path}: {e}")))
    }

    async fn store_bytes(&self, path: &str, data: &[u8]) -> Result<(), CoreError> {
        self.sftp
            .write_file(path, data)
            .await
            .map_err(|e| CoreError::Transfer(format!("{path}: {e}")))
    }

    async fn close(&self) -> Result<(), CoreError> {
        if let Err(err) = self.sftp.close().await {
            warn!(error = %err, "sftp close failed");
        }
        if self.session.is_closed().await {
            return Ok(());
        }
        self.session
            .disconnect()
            .await
            .map_err(|e| CoreError::Connection(e.to_string()))
    }
}
