use crate::paths::{expand_home, AppPaths};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub remote: RemoteConfig,
    pub helper: HelperConfig,
    pub ai: AiConfig,
    pub browser: BrowserConfig,
    pub transfer: TransferConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct AppConfigLayer {
    pub remote: Option<RemoteConfigLayer>,
    pub helper: Option<HelperConfigLayer>,
    pub ai: Option<AiConfigLayer>,
    pub browser: Option<BrowserConfigLayer>,
    pub transfer: Option<TransferConfigLayer>,
    pub logging: Option<LoggingConfigLayer>,
}

impl AppConfigLayer {
    pub fn apply_to(self, cfg: &mut AppConfig) {
        if let Some(layer) = self.remote {
            cfg.remote.apply(layer);
        }
        if let Some(layer) = self.helper {
            cfg.helper.apply(layer);
        }
        if let Some(layer) = self.ai {
            cfg.ai.apply(layer);
        }
        if let Some(layer) = self.browser {
            cfg.browser.apply(layer);
        }
        if let Some(layer) = self.transfer {
            cfg.transfer.apply(layer);
        }
        if let Some(layer) = self.logging {
            cfg.logging.apply(layer);
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub auth: String,
    pub key_path: PathBuf,
    pub connect_timeout_ms: u64,
    pub keepalive_interval_secs: u64,
    pub host_key_policy: String,
    pub host_key_fingerprints: Vec<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: "127.0.0.1".to_string(),
            port: 22,
            username: None,
            auth: "key".to_string(),
            key_path: PathBuf::from("~/.ssh/id_ed25519"),
            connect_timeout_ms: 15000,
            keepalive_interval_secs: 15,
            host_key_policy: "accept-any".to_string(),
            host_key_fingerprints: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct RemoteConfigLayer {
    pub enabled: Option<bool>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub username: Option<String>,
    pub auth: Option<String>,
    pub key_path: Option<PathBuf>,
    pub connect_timeout_ms: Option<u64>,
    pub keepalive_interval_secs: Option<u64>,
    pub host_key_policy: Option<String>,
    pub host_key_fingerprints: Option<Vec<String>>,
}

impl RemoteConfig {
    fn apply(&mut self, layer: RemoteConfigLayer) {
        if let Some(v) = layer.enabled {
            self.enabled = v;
        }
        if let Some(v) = layer.host {
            self.host = v;
        }
        if let Some(v) = layer.port {
            self.port = v;
        }
        if layer.username.is_some() {
            self.username = layer.username;
        }
        if let Some(v) = layer.auth {
            self.auth = v;
        }
        if let Some(v) = layer.key_path {
            self.key_path = v;
        }
        if let Some(v) = layer.connect_timeout_ms {
            self.connect_timeout_ms = v;
        }
        if let Some(v) = layer.keepalive_interval_secs {
            self.keepalive_interval_secs = v;
        }
        if let Some(v) = layer.host_key_policy {
            self.host_key_policy = v;
        }
        if let Some(v) = layer.host_key_fingerprints {
            self.host_key_fingerprints = v;
        }
    }

    pub fn username(&self) -> String {
        self.username.clone().unwrap_or_else(whoami::username)
    }

    pub fn key_path(&self) -> PathBuf {
        expand_home(&self.key_path)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HelperConfig {
    pub local_path: Option<PathBuf>,
    /// Relative paths resolve against the remote home directory.
    pub remote_path: String,
    pub shell: String,
    pub overview_depth: usize,
    pub overview_limit: usize,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            local_path: None,
            remote_path: ".host_functions.zsh".to_string(),
            shell: "zsh".to_string(),
            overview_depth: 10,
            overview_limit: 500,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct HelperConfigLayer {
    pub local_path: Option<PathBuf>,
    pub remote_path: Option<String>,
    pub shell: Option<String>,
    pub overview_depth: Option<usize>,
    pub overview_limit: Option<usize>,
}

impl HelperConfig {
    fn apply(&mut self, layer: HelperConfigLayer) {
        if layer.local_path.is_some() {
            self.local_path = layer.local_path;
        }
        if let Some(v) = layer.remote_path {
            self.remote_path = v;
        }
        if let Some(v) = layer.shell {
            self.shell = v;
        }
        if let Some(v) = layer.overview_depth {
            self.overview_depth = v;
        }
        if let Some(v) = layer.overview_limit {
            self.overview_limit = v;
        }
    }

    pub fn local_path(&self, paths: &AppPaths) -> PathBuf {
        self.local_path
            .as_deref()
            .map(expand_home)
            .unwrap_or_else(|| paths.helper_script.clone())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AiConfig {
    pub provider: String,
    pub endpoint: String,
    pub api_key: Option<String>,
    pub api_key_file: Option<PathBuf>,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_ms: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            endpoint: "https://api.openai.com".to_string(),
            api_key: None,
            api_key_file: Some(PathBuf::from("~/keys/openaikey.json")),
            model: "gpt-5-mini".to_string(),
            temperature: None,
            max_tokens: None,
            timeout_ms: 60000,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct AiConfigLayer {
    pub provider: Option<String>,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub api_key_file: Option<PathBuf>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_ms: Option<u64>,
}

impl AiConfig {
    fn apply(&mut self, layer: AiConfigLayer) {
        if let Some(v) = layer.provider {
            self.provider = v;
        }
        if let Some(v) = layer.endpoint {
            self.endpoint = v;
        }
        if layer.api_key.is_some() {
            self.api_key = layer.api_key;
        }
        if layer.api_key_file.is_some() {
            self.api_key_file = layer.api_key_file;
        }
        if let Some(v) = layer.model {
            self.model = v;
        }
        if layer.temperature.is_some() {
            self.temperature = layer.temperature;
        }
        if layer.max_tokens.is_some() {
            self.max_tokens = layer.max_tokens;
        }
        if let Some(v) = layer.timeout_ms {
            self.timeout_ms = v;
        }
    }

    /// Inline key first, then `OPENAI_API_KEY`, then the JSON key file.
    pub fn resolve_api_key(&self) -> Result<Option<String>, ConfigError> {
        if let Some(key) = self.api_key.as_ref().filter(|v| !v.trim().is_empty()) {
            return Ok(Some(key.clone()));
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.trim().is_empty() {
                return Ok(Some(key));
            }
        }
        let Some(file) = self.api_key_file.as_deref() else {
            return Ok(None);
        };
        let file = expand_home(file);
        if !file.exists() {
            return Ok(None);
        }
        read_key_file(&file)
    }
}

fn read_key_file(path: &Path) -> Result<Option<String>, ConfigError> {
    let content = fs::read_to_string(path)?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    Ok(value
        .get("OPENAI_API_KEY")
        .and_then(|v| v.as_str())
        .map(|v| v.to_string()))
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub preview_lines: usize,
    pub log_max: usize,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            preview_lines: 50,
            log_max: 500,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct BrowserConfigLayer {
    pub preview_lines: Option<usize>,
    pub log_max: Option<usize>,
}

impl BrowserConfig {
    fn apply(&mut self, layer: BrowserConfigLayer) {
        if let Some(v) = layer.preview_lines {
            self.preview_lines = v;
        }
        if let Some(v) = layer.log_max {
            self.log_max = v;
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransferConfig {
    pub queue_capacity: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self { queue_capacity: 8 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct TransferConfigLayer {
    pub queue_capacity: Option<usize>,
}

impl TransferConfig {
    fn apply(&mut self, layer: TransferConfigLayer) {
        if let Some(v) = layer.queue_capacity {
            self.queue_capacity = v;
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub stdout: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            stdout: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct LoggingConfigLayer {
    pub level: Option<String>,
    pub json: Option<bool>,
    pub stdout: Option<bool>,
}

impl LoggingConfig {
    fn apply(&mut self, layer: LoggingConfigLayer) {
        if let Some(v) = layer.level {
            self.level = v;
        }
        if let Some(v) = layer.json {
            self.json = v;
        }
        if let Some(v) = layer.stdout {
            self.stdout = v;
        }
    }
}

#[derive(Clone, Debug)]
pub struct ConfigManager {
    pub paths: AppPaths,
}

impl ConfigManager {
    pub fn new(paths: AppPaths) -> Self {
        Self { paths }
    }

    /// Defaults, then the user file (or `explicit`), then the project file in `cwd`,
    /// then `overrides`.
    pub fn load(
        &self,
        explicit: Option<&Path>,
        cwd: Option<&Path>,
        overrides: Option<AppConfigLayer>,
    ) -> Result<AppConfig> {
        let mut cfg = AppConfig::default();

        let user_file = explicit.unwrap_or(&self.paths.config_file);
        if user_file.exists() {
            let layer = Self::load_layer(user_file)?;
            layer.apply_to(&mut cfg);
            debug!(path = %user_file.display(), "config file applied");
        } else if explicit.is_some() {
            return Err(anyhow::anyhow!("config file not found: {}", user_file.display()));
        }

        if let Some(dir) = cwd {
            let project_path = AppPaths::project_config_path(dir);
            if project_path.exists() {
                let layer = Self::load_layer(&project_path)?;
                layer.apply_to(&mut cfg);
                debug!(path = %project_path.display(), "project config applied");
            }
        }

        if let Some(layer) = overrides {
            layer.apply_to(&mut cfg);
        }

        Ok(cfg)
    }

    pub fn load_layer(path: &Path) -> Result<AppConfigLayer> {
        let content = fs::read_to_string(path)?;
        let layer: AppConfigLayer = toml::from_str(&content).map_err(ConfigError::from)?;
        Ok(layer)
    }

    pub fn save_default(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            fs::create_dir_all(parent)?;
        }
        let cfg = AppConfig::default();
        let content = toml::to_string_pretty(&cfg).map_err(|e| anyhow::anyhow!(e))?;
        fs::write(&self.paths.config_file, content)?;
        Ok(())
    }
}
