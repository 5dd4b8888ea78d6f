/// Application configuration loaded from config.toml
pub mod app;

/// Remote backend endpoint and keys from environment variables
pub mod backend;

pub use app::{AppConfig, DisplayConfig};
pub use backend::BackendConfig;
