use std::fs;
use std::io;
use std::path::Path;
use tracing::info;

pub const HOST_FUNCTIONS: &str = include_str!("../assets/host_functions.zsh");

/// Writes the bundled helper to `path` unless a file is already there.
/// Returns `true` when it wrote one.
pub fn ensure_installed(path: &Path) -> io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, HOST_FUNCTIONS)?;
    info!(path = %path.display(), "helper script installed");
    Ok(true)
}
