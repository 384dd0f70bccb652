use std::{env, net::SocketAddr};

use super::session::ConfigError;
use crate::services::calendar_service::DEFAULT_CALENDAR_DAYS;

/// Server settings read from the environment (after `dotenvy`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub calendar_days: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            calendar_days: DEFAULT_CALENDAR_DAYS,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let host = env::var("HOST").unwrap_or(defaults.host);
        let port = match env::var("PORT") {
            Ok(value) => value
                .parse::<u16>()
                .map_err(|_| ConfigError::Invalid("PORT", value))?,
            Err(_) => defaults.port,
        };
        let calendar_days = match env::var("CALENDAR_DAYS") {
            Ok(value) => match value.parse::<u32>() {
                Ok(days) if (1..=60).contains(&days) => days,
                _ => return Err(ConfigError::Invalid("CALENDAR_DAYS", value)),
            },
            Err(_) => defaults.calendar_days,
        };

        Ok(Self {
            host,
            port,
            calendar_days,
        })
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = self
            .host
            .parse::<std::net::IpAddr>()
            .map_err(|_| ConfigError::Invalid("HOST", self.host.clone()))?;
        Ok(SocketAddr::from((ip, self.port)))
    }
}
