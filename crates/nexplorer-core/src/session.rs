use crate::backend::{ConnectionMode, LocalBackend, ShellBackend};
use crate::error::CoreError;
use crate::helper;
use crate::permission::{Confirmer, Prompt};
use crate::remote::RemoteBackend;
use crate::state::{ActivityLog, LogLevel};
use nexplorer_config::paths::home_dir;
use nexplorer_config::{AppConfig, AppPaths, RemoteConfig};
use nexplorer_ssh::{AuthMethod, HostKeyPolicy, SshClient, SshConnectConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use walkdir::{DirEntry, WalkDir};
use zeroize::Zeroizing;

pub const OVERVIEW_UNAVAILABLE: &str = "[Overview Unavailable]";
pub const LOCAL_OVERVIEW_UNAVAILABLE: &str = "[Local Overview Unavailable]";
const PASSPHRASE_ENV: &str = "NEXPLORER_KEY_PASSPHRASE";

pub struct ConnectionContext {
    pub mode: ConnectionMode,
    pub backend: Arc<dyn ShellBackend>,
    pub home: String,
    pub start_path: String,
    pub overview: String,
}

/// Opens the remote session, or the local backend when remote access is off or
/// the user accepts the fallback after a failed connect.
pub async fn establish(
    cfg: &AppConfig,
    paths: &AppPaths,
    force_local: bool,
    confirmer: &dyn Confirmer,
    log: &mut ActivityLog,
) -> Result<ConnectionContext, CoreError> {
    let local_script = cfg.helper.local_path(paths);
    if cfg.helper.local_path.is_none() {
        if let Err(err) = helper::ensure_installed(&local_script) {
            warn!(path = %local_script.display(), error = %err, "helper install failed");
        }
    }

    if cfg.remote.enabled && !force_local {
        match connect_remote(cfg, &local_script, log).await {
            Ok(ctx) => return Ok(ctx),
            Err(err) => {
                log.push(LogLevel::Error, format!("SSH connection failed: {err}"));
                let prompt = Prompt {
                    title: "Connection Failed".to_string(),
                    message: format!(
                        "Could not connect to {}:{}.\n{err}\n\nSwitch to local mode (no SSH)?",
                        cfg.remote.host, cfg.remote.port
                    ),
                };
                if !confirmer.confirm(&prompt).await {
                    return Err(err);
                }
                log.push(LogLevel::System, "Switched to local mode.");
            }
        }
    } else {
        log.push(LogLevel::System, "Running in local mode.");
    }
    open_local(cfg, local_script, log).await
}

pub fn ssh_config(remote: &RemoteConfig) -> Result<SshConnectConfig, CoreError> {
    let auth_method = match remote.auth.trim().to_lowercase().as_str() {
        "key" => AuthMethod::Key {
            private_key_path: remote.key_path(),
            passphrase: std::env::var(PASSPHRASE_ENV).ok().map(Zeroizing::new),
        },
        "agent" => AuthMethod::Agent,
        other => return Err(CoreError::Connection(format!("unknown auth method: {other}"))),
    };
    let host_key_policy =
        HostKeyPolicy::from_config(&remote.host_key_policy, &remote.host_key_fingerprints)
            .map_err(|e| CoreError::Connection(e.to_string()))?;
    Ok(SshConnectConfig {
        host: remote.host.clone(),
        port: remote.port,
        username: remote.username(),
        auth_method,
        host_key_policy,
        keepalive_interval_secs: remote.keepalive_interval_secs,
        connect_timeout_ms: remote.connect_timeout_ms,
    })
}

async fn connect_remote(
    cfg: &AppConfig,
    local_script: &Path,
    log: &mut ActivityLog,
) -> Result<ConnectionContext, CoreError> {
    let ssh = ssh_config(&cfg.remote)?;
    log.push(
        LogLevel::System,
        format!("Connecting to {}@{}:{}...", ssh.username, ssh.host, ssh.port),
    );
    let session = SshClient::connect(ssh)
        .await
        .map_err(|e| CoreError::Connection(e.to_string()))?;
    let sftp = match session.open_sftp().await {
        Ok(sftp) => sftp,
        Err(err) => {
            let _ = session.disconnect().await;
            return Err(CoreError::Connection(format!("sftp: {err}")));
        }
    };
    let backend = RemoteBackend::new(
        session,
        sftp,
        cfg.helper.shell.clone(),
        cfg.helper.remote_path.clone(),
    );

    if local_script.exists() {
        log.push(LogLevel::System, "Deploying host functions to remote...");
        if let Err(err) = backend.deploy(local_script).await {
            log.push(LogLevel::Warning, format!("Failed to deploy helper: {err}"));
        }
    } else {
        log.push(
            LogLevel::Warning,
            format!(
                "Helper script not found at {}; remote features may fail.",
                local_script.display()
            ),
        );
    }

    let home = match backend.execute("fs_home", &[]).await {
        Ok(home) if !home.is_empty() => home,
        Ok(_) | Err(_) => {
            log.push(LogLevel::Warning, "Could not resolve remote home directory.");
            ".".to_string()
        }
    };
    log.push(LogLevel::System, "Mapping file system (this may take a moment)...");
    let overview = match backend.execute("fs_overview", &[]).await {
        Ok(text) => {
            log.push(LogLevel::System, "File system context loaded.");
            text
        }
        Err(err) => {
            log.push(LogLevel::Warning, format!("Could not build overview: {err}"));
            OVERVIEW_UNAVAILABLE.to_string()
        }
    };
    log.push(LogLevel::System, "SSH connected successfully.");
    info!(host = %cfg.remote.host, home = %home, "remote session ready");

    Ok(ConnectionContext {
        mode: ConnectionMode::Remote,
        backend: Arc::new(backend),
        start_path: home.clone(),
        home,
        overview,
    })
}

async fn open_local(
    cfg: &AppConfig,
    local_script: PathBuf,
    log: &mut ActivityLog,
) -> Result<ConnectionContext, CoreError> {
    let start_path = std::env::current_dir()?.to_string_lossy().to_string();
    let home = home_dir().unwrap_or_else(|| PathBuf::from("/"));
    let (depth, limit) = (cfg.helper.overview_depth, cfg.helper.overview_limit);
    let walk_root = home.clone();
    let overview = tokio::task::spawn_blocking(move || local_overview(&walk_root, depth, limit))
        .await
        .ok()
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| LOCAL_OVERVIEW_UNAVAILABLE.to_string());
    log.push(LogLevel::System, "Local file system context loaded.");

    Ok(ConnectionContext {
        mode: ConnectionMode::Local,
        backend: Arc::new(LocalBackend::new(cfg.helper.shell.clone(), local_script)),
        home: home.to_string_lossy().to_string(),
        start_path,
        overview,
    })
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0 && entry.file_name().to_string_lossy().starts_with('.')
}

pub fn local_overview(root: &Path, depth: usize, limit: usize) -> String {
    WalkDir::new(root)
        .max_depth(depth)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_dir())
        .take(limit)
        .map(|e| e.path().display().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedConfirmer;
    use std::fs;
    use tempfile::TempDir;

    fn test_paths(dir: &Path) -> AppPaths {
        AppPaths {
            config_dir: dir.join("config"),
            data_dir: dir.join("data"),
            log_dir: dir.join("logs"),
            config_file: dir.join("config").join("config.toml"),
            helper_script: dir.join("data").join("host_functions.zsh"),
        }
    }

    #[test]
    fn overview_skips_hidden_and_honours_limits() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("docs/2024/q1")).unwrap();
        fs::create_dir_all(root.join(".cache/deep")).unwrap();
        fs::create_dir_all(root.join("music")).unwrap();
        fs::write(root.join("docs/readme.txt"), "x").unwrap();

        let all = local_overview(root, 10, 500);
        assert!(all.contains("docs/2024/q1"));
        assert!(!all.contains(".cache"));
        assert!(!all.contains("readme.txt"));

        let shallow = local_overview(root, 1, 500);
        assert!(shallow.contains("docs"));
        assert!(!shallow.contains("2024"));

        assert_eq!(local_overview(root, 10, 2).lines().count(), 2);
    }

    #[test]
    fn ssh_config_follows_remote_section() {
        let remote = RemoteConfig {
            host: "files.lan".to_string(),
            port: 2222,
            username: Some("ops".to_string()),
            auth: "agent".to_string(),
            ..RemoteConfig::default()
        };
        let ssh = ssh_config(&remote).unwrap();
        assert_eq!(ssh.host, "files.lan");
        assert_eq!(ssh.port, 2222);
        assert_eq!(ssh.username, "ops");
        assert!(matches!(ssh.auth_method, AuthMethod::Agent));
        assert!(matches!(ssh.host_key_policy, HostKeyPolicy::InsecureAcceptAny));

        let bad = RemoteConfig {
            auth: "password".to_string(),
            ..RemoteConfig::default()
        };
        assert!(matches!(ssh_config(&bad), Err(CoreError::Connection(_))));
    }

    #[tokio::test]
    async fn local_mode_installs_helper_and_starts_in_cwd() {
        let dir = TempDir::new().unwrap();
        let paths = test_paths(dir.path());
        let mut cfg = AppConfig::default();
        cfg.remote.enabled = false;
        cfg.helper.overview_depth = 1;
        let confirmer = ScriptedConfirmer::new([false; 0]);
        let mut log = ActivityLog::new(20);

        let ctx = establish(&cfg, &paths, false, &confirmer, &mut log)
            .await
            .unwrap();
        assert_eq!(ctx.mode, ConnectionMode::Local);
        assert!(paths.helper_script.exists());
        assert_eq!(
            ctx.start_path,
            std::env::current_dir().unwrap().to_string_lossy()
        );
        assert!(confirmer.asked().is_empty());
        assert!(log.contains("Running in local mode."));
    }

    #[tokio::test]
    async fn declined_fallback_is_an_error() {
        let dir = TempDir::new().unwrap();
        let paths = test_paths(dir.path());
        let mut cfg = AppConfig::default();
        cfg.remote.enabled = true;
        cfg.remote.auth = "password".to_string();
        let confirmer = ScriptedConfirmer::new([false]);
        let mut log = ActivityLog::new(20);

        let result = establish(&cfg, &paths, false, &confirmer, &mut log).await;
        assert!(matches!(result, Err(CoreError::Connection(_))));
        assert_eq!(confirmer.asked()[0].title, "Connection Failed");
    }

    #[tokio::test]
    async fn accepted_fallback_switches_to_local() {
        let dir = TempDir::new().unwrap();
        let paths = test_paths(dir.path());
        let mut cfg = AppConfig::default();
        cfg.remote.enabled = true;
        cfg.remote.auth = "password".to_string();
        cfg.helper.overview_depth = 1;
        let confirmer = ScriptedConfirmer::new([true]);
        let mut log = ActivityLog::new(20);

        let ctx = establish(&cfg, &paths, false, &confirmer, &mut log)
            .await
            .unwrap();
        assert_eq!(ctx.mode, ConnectionMode::Local);
        assert!(log.contains("Switched to local mode."));
    }
}
