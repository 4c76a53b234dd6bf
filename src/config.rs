//! Configuration types.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Deployment environment. Development mode exposes diagnostic detail in
/// error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Path of the libSQL database file.
    pub db_path: PathBuf,
    /// Allowed CORS origins. `None` mirrors any origin.
    pub cors_origins: Option<Vec<String>>,
    pub environment: Environment,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            db_path: PathBuf::from("./data/todos.db"),
            cors_origins: None,
            environment: Environment::Development,
        }
    }
}

impl ServerConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup, falling back to defaults
    /// for anything unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let port = match lookup("PORT") {
            Some(raw) => raw.trim().parse().map_err(|e| ConfigError::InvalidValue {
                key: "PORT".to_string(),
                message: format!("{raw:?} is not a valid port: {e}"),
            })?,
            None => defaults.port,
        };

        let host = lookup("HOST")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(defaults.host);

        let db_path = lookup("TODO_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let cors_origins = lookup("CORS_ORIGIN").map(|raw| {
            raw.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        });

        let environment = match lookup("APP_ENV").as_deref().map(str::trim) {
            None | Some("") | Some("development") => Environment::Development,
            Some("production") => Environment::Production,
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "APP_ENV".to_string(),
                    message: format!("expected development or production, got {other:?}"),
                });
            }
        };

        Ok(Self {
            host,
            port,
            db_path,
            cors_origins,
            environment,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }
}
