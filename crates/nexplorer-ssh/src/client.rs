use crate::config::{AuthMethod, HostKeyPolicy, SshConnectConfig};
use crate::sftp::SftpClient;
use anyhow::Result;
use russh::client::{Config as ClientConfig, Handle};
use russh::keys::key::PrivateKeyWithHashAlg;
use russh::keys::load_secret_key;
use russh::keys::{Algorithm, HashAlg};
use russh::{client, ChannelMsg, Disconnect};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct SshClient;

#[derive(Clone)]
pub struct SshSession {
    inner: Arc<Mutex<SessionInner>>,
}

struct SessionInner {
    handle: Handle<ClientHandler>,
    host: String,
}

#[derive(Clone, Debug, Default)]
pub struct ExecOutput {
    pub status: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl SshClient {
    pub async fn connect(cfg: SshConnectConfig) -> Result<SshSession> {
        let config = Arc::new(build_client_config(&cfg));
        let handler = ClientHandler {
            host: cfg.host.clone(),
            port: cfg.port,
            policy: cfg.host_key_policy.clone(),
        };

        let timeout = Duration::from_millis(cfg.connect_timeout_ms);
        let sock = tokio::time::timeout(
            timeout,
            tokio::net::TcpStream::connect((cfg.host.as_str(), cfg.port)),
        )
        .await
        .map_err(|_| anyhow::anyhow!("connect to {}:{} timed out", cfg.host, cfg.port))??;
        let mut handle = client::connect_stream(config, sock, handler).await?;

        authenticate(&mut handle, &cfg.username, &cfg.auth_method).await?;

        Ok(SshSession {
            inner: Arc::new(Mutex::new(SessionInner {
                handle,
                host: cfg.host,
            })),
        })
    }
}

impl SshSession {
    pub async fn open_sftp(&self) -> Result<SftpClient> {
        let inner = self.inner.lock().await;
        let channel = inner.handle.channel_open_session().await?;
        channel.request_subsystem(true, "sftp").await?;
        let stream = channel.into_stream();
        SftpClient::new(stream).await
    }

    pub async fn exec(&self, command: &str) -> Result<ExecOutput> {
        let inner = self.inner.lock().await;
        let channel = inner.handle.channel_open_session().await?;
        channel.exec(true, command).await?;
        let (mut reader, _) = channel.split();
        let mut out = ExecOutput::default();
        while let Some(msg) = reader.wait().await {
            match msg {
                ChannelMsg::Data { data } => out.stdout.extend_from_slice(&data),
                ChannelMsg::ExtendedData { data, .. } => out.stderr.extend_from_slice(&data),
                ChannelMsg::ExitStatus { exit_status } => out.status = exit_status as i32,
                ChannelMsg::Close => break,
                _ => {}
            }
        }
        debug!(host = %inner.host, status = out.status, "remote exec finished");
        Ok(out)
    }

    pub async fn disconnect(&self) -> Result<()> {
        let inner = self.inner.lock().await;
        inner
            .handle
            .disconnect(Disconnect::ByApplication, "", "en")
            .await?;
        Ok(())
    }

    pub async fn is_closed(&self) -> bool {
        self.inner.lock().await.handle.is_closed()
    }
}

#[derive(Clone)]
struct ClientHandler {
    host: String,
    port: u16,
    policy: HostKeyPolicy,
}

impl client::Handler for ClientHandler {
    type Error = anyhow::Error;

    fn check_server_key(
        &mut self,
        server_public_key: &russh::keys::PublicKey,
    ) -> impl std::future::Future<Output = Result<bool, Self::Error>> + Send {
        let host = self.host.clone();
        let port = self.port;
        let policy = self.policy.clone();
        let fingerprint = server_public_key.fingerprint(HashAlg::Sha256).to_string();
        async move {
            if let HostKeyPolicy::InsecureAcceptAny = policy {
                warn!(host = %host, port, fingerprint = %fingerprint, "accepting host key without verification");
                return Ok(true);
            }
            let accepted = policy.accepts(&fingerprint);
            if !accepted {
                warn!(host = %host, port, fingerprint = %fingerprint, "host key not in pinned fingerprints");
            }
            Ok(accepted)
        }
    }
}

fn build_client_config(cfg: &SshConnectConfig) -> ClientConfig {
    ClientConfig {
        keepalive_interval: Some(Duration::from_secs(cfg.keepalive_interval_secs)),
        keepalive_max: 3,
        ..Default::default()
    }
}

async fn authenticate(
    handle: &mut Handle<ClientHandler>,
    username: &str,
    auth: &AuthMethod,
) -> Result<()> {
    let user = username.to_string();
    match auth {
        AuthMethod::Key {
            private_key_path,
            passphrase,
        } => {
            let key = load_private_key(private_key_path, passphrase.as_ref().map(|v| v.as_str()))?;
            let hash = if matches!(key.algorithm(), Algorithm::Rsa { .. }) {
                handle.best_supported_rsa_hash().await?.flatten()
            } else {
                None
            };
            let key_with_hash = PrivateKeyWithHashAlg::new(Arc::new(key), hash);
            let res = handle.authenticate_publickey(user, key_with_hash).await?;
            ensure_auth(res)
        }
        AuthMethod::Agent => {
            if authenticate_with_agent(handle, &user).await? {
                Ok(())
            } else {
                Err(anyhow::anyhow!("agent authentication failed"))
            }
        }
    }
}

fn ensure_auth(res: russh::client::AuthResult) -> Result<()> {
    match res {
        russh::client::AuthResult::Success => Ok(()),
        russh::client::AuthResult::Failure { .. } => Err(anyhow::anyhow!("authentication failed")),
    }
}

fn load_private_key(path: &Path, passphrase: Option<&str>) -> Result<russh::keys::PrivateKey> {
    load_secret_key(path, passphrase)
        .map_err(|e| anyhow::anyhow!("cannot load key {}: {e}", path.display()))
}

#[cfg(unix)]
async fn authenticate_with_agent(handle: &mut Handle<ClientHandler>, user: &str) -> Result<bool> {
    let mut client = russh::keys::agent::client::AgentClient::connect_env().await?;
    let keys = client.request_identities().await?;
    for key in keys {
        let hash = if matches!(key.algorithm(), Algorithm::Rsa { .. }) {
            handle.best_supported_rsa_hash().await?.flatten()
        } else {
            None
        };
        let res = handle
            .authenticate_publickey_with(user.to_string(), key, hash, &mut client)
            .await?;
        if matches!(res, russh::client::AuthResult::Success) {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(not(unix))]
async fn authenticate_with_agent(_handle: &mut Handle<ClientHandler>, _user: &str) -> Result<bool> {
    Err(anyhow::anyhow!("ssh agent is only supported on unix"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keepalive_follows_connect_config() {
        let cfg = SshConnectConfig {
            host: "files.lan".to_string(),
            port: 22,
            username: "ops".to_string(),
            auth_method: AuthMethod::Agent,
            host_key_policy: HostKeyPolicy::InsecureAcceptAny,
            keepalive_interval_secs: 30,
            connect_timeout_ms: 1000,
        };
        let client = build_client_config(&cfg);
        assert_eq!(client.keepalive_interval, Some(Duration::from_secs(30)));
        assert_eq!(client.keepalive_max, 3);
    }
}
