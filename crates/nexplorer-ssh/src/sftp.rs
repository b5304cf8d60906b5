use anyhow::Result;
use russh_sftp::client::fs::Metadata;
use russh_sftp::client::SftpSession;
use russh_sftp::protocol::OpenFlags;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub struct SftpClient {
    inner: SftpSession,
}

impl SftpClient {
    pub async fn new<S>(stream: S) -> Result<Self>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let inner = SftpSession::new(stream).await?;
        Ok(Self { inner })
    }

    pub async fn metadata(&self, path: &str) -> Result<Metadata> {
        Ok(self.inner.metadata(path).await?)
    }

    pub async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let mut file = self.inner.open(path).await?;
        let mut data = Vec::new();
        file.read_to_end(&mut data).await?;
        Ok(data)
    }

    /// Replaces `path` with `data`. Fails unless the remote size matches afterwards.
    pub async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let flags = OpenFlags::WRITE | OpenFlags::CREATE | OpenFlags::TRUNCATE;
        let mut file = self.inner.open_with_flags(path, flags).await?;
        file.write_all(data).await?;
        file.shutdown().await?;
        let written = self.metadata(path).await?.size.unwrap_or(0);
        if written != data.len() as u64 {
            return Err(anyhow::anyhow!(
                "short write to {path}: {written} of {} bytes",
                data.len()
            ));
        }
        Ok(())
    }

    pub async fn close(&self) -> Result<()> {
        self.inner.close().await?;
        Ok(())
    }
}
