//! Configuration loading and management
//!
//! Configuration comes from an optional YAML file, then environment
//! variables override individual settings:
//!
//! | Variable         | Setting                       |
//! |------------------|-------------------------------|
//! | `HOST`, `PORT`   | `server.host`, `server.port`  |
//! | `DB_BACKEND`     | `database.backend`            |
//! | `DATABASE_URL`   | `database.url`                |
//! | `DB_HOST`        | `database.host`               |
//! | `DB_USER`        | `database.user`               |
//! | `DB_PASS`        | `database.password`           |
//! | `DATABASE_NAME`  | `database.name`               |
//! | `JWT_SECRET`     | `auth.token_secret`           |
//! | `TOKEN_TTL_SECS` | `auth.token_ttl_secs`         |

use crate::core::auth::MAX_TOKEN_TTL_SECS;
use crate::core::orders::OrderPolicy;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Errors related to configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value '{value}' for {field}: {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    #[error("Missing required setting '{0}'")]
    MissingField(String),
}

/// Which store implementation the server runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Backend {
    #[default]
    InMemory,
    Mysql,
    Postgres,
}

impl std::str::FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "in_memory" | "in-memory" | "memory" => Ok(Backend::InMemory),
            "mysql" => Ok(Backend::Mysql),
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            other => Err(ConfigError::InvalidValue {
                field: "database.backend".to_string(),
                value: other.to_string(),
                message: "expected one of in_memory, mysql, postgres".to_string(),
            }),
        }
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Relational store settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: Backend,
    /// Full connection URL; takes precedence over the individual parts
    pub url: Option<String>,
    pub host: String,
    pub user: String,
    pub password: Option<String>,
    pub name: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: Backend::InMemory,
            url: None,
            host: "localhost".to_string(),
            user: "root".to_string(),
            password: None,
            name: "storefront".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_secs: 5,
        }
    }
}

/// Token issuance settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub token_secret: String,
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_secret: String::new(),
            token_ttl_secs: 3600,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub orders: OrderPolicy,
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    pub log_filter: Option<String>,
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }

    /// Overlay settings from the process environment
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(&std::env::vars().collect())
    }

    /// Overlay settings from an explicit variable map
    pub fn with_overrides(mut self, vars: &HashMap<String, String>) -> Result<Self> {
        let get = |key: &str| vars.get(key).filter(|v| !v.is_empty()).cloned();

        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("PORT") {
            self.server.port = parse_setting("PORT", &port)?;
        }
        if let Some(backend) = get("DB_BACKEND") {
            self.database.backend = backend.parse()?;
        }
        if let Some(url) = get("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(host) = get("DB_HOST") {
            self.database.host = host;
        }
        if let Some(user) = get("DB_USER") {
            self.database.user = user;
        }
        if let Some(password) = get("DB_PASS") {
            self.database.password = Some(password);
        }
        if let Some(name) = get("DATABASE_NAME") {
            self.database.name = name;
        }
        if let Some(secret) = get("JWT_SECRET") {
            self.auth.token_secret = secret;
        }
        if let Some(ttl) = get("TOKEN_TTL_SECS") {
            self.auth.token_ttl_secs = parse_setting("TOKEN_TTL_SECS", &ttl)?;
        }

        Ok(self)
    }

    /// Reject settings the server cannot start with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.token_secret.is_empty() {
            return Err(ConfigError::MissingField("auth.token_secret".to_string()));
        }
        if self.auth.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(ConfigError::InvalidValue {
                field: "auth.token_ttl_secs".to_string(),
                value: self.auth.token_ttl_secs.to_string(),
                message: format!("must be at most {} seconds", MAX_TOKEN_TTL_SECS),
            });
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "database.max_connections".to_string(),
                value: "0".to_string(),
                message: "pool needs at least one connection".to_string(),
            });
        }
        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigError::InvalidValue {
                field: "database.min_connections".to_string(),
                value: self.database.min_connections.to_string(),
                message: "exceeds max_connections".to_string(),
            });
        }
        if self.orders.store_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "orders.store_timeout_ms".to_string(),
                value: "0".to_string(),
                message: "timeout must be positive".to_string(),
            });
        }
        Ok(())
    }
}

fn parse_setting<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        message: "not a valid number".to_string(),
    })
}
