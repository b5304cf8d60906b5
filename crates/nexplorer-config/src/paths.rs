use anyhow::Result;
use directories::{BaseDirs, ProjectDirs};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub config_file: PathBuf,
    pub helper_script: PathBuf,
}

impl AppPaths {
    pub fn new() -> Result<Self> {
        let proj = ProjectDirs::from("org", "nexplorer", "nexplorer")
            .ok_or_else(|| anyhow::anyhow!("project dirs unavailable"))?;
        let config_dir = proj.config_dir().to_path_buf();
        let data_dir = proj.data_dir().to_path_buf();
        let log_dir = data_dir.join("logs");
        let config_file = config_dir.join("config.toml");
        let helper_script = data_dir.join("host_functions.zsh");
        Ok(Self {
            config_dir,
            data_dir,
            log_dir,
            config_file,
            helper_script,
        })
    }

    pub fn project_config_path(base: impl AsRef<Path>) -> PathBuf {
        base.as_ref().join(".nexplorer.toml")
    }
}

pub fn home_dir() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.home_dir().to_path_buf())
}

pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_home_leaves_absolute_paths() {
        let p = PathBuf::from("/etc/hosts");
        assert_eq!(expand_home(&p), p);
    }

    #[test]
    fn expand_home_rewrites_tilde() {
        let Some(home) = home_dir() else {
            return;
        };
        let p = PathBuf::from("~/.ssh/id_ed25519");
        assert_eq!(expand_home(&p), home.join(".ssh").join("id_ed25519"));
    }
}
