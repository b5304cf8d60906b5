use crate::backend::{write_atomic, ConnectionMode, ShellBackend};
use crate::error::CoreError;
use crate::listing::{parse_listing, DirectoryEntry};
use crate::path::{base_name, join_path};
use crate::transfer::{Direction, TransferRequest};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "ico", "webp"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreviewBody {
    Directory,
    Image,
    Text(String),
    Unreadable(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Preview {
    pub path: String,
    pub entry: DirectoryEntry,
    pub body: PreviewBody,
}

pub struct CommandExecutor {
    backend: Arc<dyn ShellBackend>,
}

impl CommandExecutor {
    pub fn new(backend: Arc<dyn ShellBackend>) -> Self {
        Self { backend }
    }

    pub fn mode(&self) -> ConnectionMode {
        self.backend.mode()
    }

    pub fn backend(&self) -> &Arc<dyn ShellBackend> {
        &self.backend
    }

    pub async fn overview(&self) -> Result<String, CoreError> {
        self.backend.execute("fs_overview", &[]).await
    }

    pub async fn home(&self) -> Result<String, CoreError> {
        self.backend.execute("fs_home", &[]).await
    }

    pub async fn try_list(&self, path: &str) -> Result<Vec<DirectoryEntry>, CoreError> {
        let raw = self.backend.execute("fs_list", &[path]).await?;
        Ok(parse_listing(&raw))
    }

    pub async fn list(&self, path: &str) -> Vec<DirectoryEntry> {
        self.try_list(path).await.unwrap_or_else(|err| {
            warn!(path, error = %err, "listing failed");
            Vec::new()
        })
    }

    /// Raw `TYPE|FULLPATH|SIZE` lines, empty when nothing matched.
    pub async fn search(&self, query: &str, base: &str) -> Result<String, CoreError> {
        self.backend.execute("fs_search", &[query, base]).await
    }

    pub async fn read_head(&self, path: &str, lines: usize) -> Result<String, CoreError> {
        let count = lines.to_string();
        self.backend
            .execute("head", &["-n", count.as_str(), path])
            .await
    }

    pub async fn preview(&self, dir: &str, entry: &DirectoryEntry, lines: usize) -> Preview {
        let path = join_path(dir, &entry.name);
        let body = if entry.is_dir() {
            PreviewBody::Directory
        } else if is_image(&entry.name) {
            PreviewBody::Image
        } else {
            match self.read_head(&path, lines).await {
                Ok(text) => PreviewBody::Text(text),
                Err(err) => PreviewBody::Unreadable(err.to_string()),
            }
        };
        Preview {
            path,
            entry: entry.clone(),
            body,
        }
    }

    /// Copies one file and returns the number of bytes written. A local
    /// destination that is an existing directory receives the file under its
    /// source name.
    pub async fn transfer(&self, request: &TransferRequest) -> Result<u64, CoreError> {
        let (size, destination) = match request.direction {
            Direction::ToClient => {
                let data = self.backend.fetch_bytes(&request.source).await?;
                let destination = into_directory(&request.destination, &request.source).await;
                write_atomic(Path::new(&destination), &data).await?;
                (data.len(), destination)
            }
            Direction::ToHost => {
                let data = tokio::fs::read(&request.source)
                    .await
                    .map_err(|e| CoreError::Transfer(format!("{}: {e}", request.source)))?;
                let destination = match self.mode() {
                    ConnectionMode::Local => {
                        into_directory(&request.destination, &request.source).await
                    }
                    ConnectionMode::Remote => request.destination.clone(),
                };
                self.backend.store_bytes(&destination, &data).await?;
                (data.len(), destination)
            }
        };
        info!(
            mode = self.mode().label(),
            direction = request.direction.label(),
            source = %request.source,
            destination = %destination,
            bytes = size,
            "transfer complete"
        );
        Ok(size as u64)
    }
}

async fn into_directory(destination: &str, source: &str) -> String {
    match tokio::fs::metadata(destination).await {
        Ok(meta) if meta.is_dir() => Path::new(destination)
            .join(base_name(source))
            .to_string_lossy()
            .to_string(),
        _ => destination.to_string(),
    }
}

fn is_image(name: &str) -> bool {
    Path::new(name)
        .extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}
