pub mod client;
pub mod config;
pub mod sftp;

pub use client::{ExecOutput, SshClient, SshSession};
pub use config::{AuthMethod, HostKeyPolicy, SshConnectConfig};
pub use sftp::SftpClient;
