//! Server configuration, read from a TOML file.

use std::path::Path;

use emarge_db::DbConfig;
use emarge_service::ServiceConfig;
use serde::Deserialize;

use crate::error::ServerError;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub db: DbConfig,
    pub service: ServiceConfig,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            db: DbConfig::default(),
            service: ServiceConfig::default(),
            log_filter: "emarge=info".into(),
        }
    }
}

impl ServerConfig {
    /// Load from `path`, or use defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ServerError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = std::fs::read_to_string(path).map_err(|source| ServerError::ConfigRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self, ServerError> {
        let config: Self = toml::from_str(raw)?;
        config
            .service
            .reminder
            .validate()
            .map_err(ServerError::InvalidConfig)?;
        Ok(config)
    }
}
