pub mod app;
pub mod session;

pub use app::AppConfig;
pub use session::{validate_production_config, ConfigError, SessionConfig};

use std::env;

pub(crate) fn current_environment() -> String {
    env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string())
}

pub(crate) fn is_production() -> bool {
    current_environment() == "production"
}

pub(crate) fn env_flag_enabled(key: &str) -> bool {
    env::var(key)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "True"))
        .unwrap_or(false)
}
