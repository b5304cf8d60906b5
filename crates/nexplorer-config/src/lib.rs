pub mod paths;
pub mod settings;

pub use paths::AppPaths;
pub use settings::{
    AiConfig, AppConfig, AppConfigLayer, BrowserConfig, ConfigError, ConfigManager, HelperConfig,
    LoggingConfig, RemoteConfig, TransferConfig,
};
