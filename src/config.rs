use anyhow::Context;
use dotenvy::dotenv;
use std::env;

use crate::error::SystemErrorPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_port: u16,
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub storage: StorageBackend,
    pub system_error_policy: SystemErrorPolicy,
    pub cors_allowed_origins: Option<Vec<String>>,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let storage = match lookup("STORAGE").as_deref().map(str::trim) {
            None | Some("") | Some("postgres") => StorageBackend::Postgres,
            Some("memory") => StorageBackend::Memory,
            Some(other) => anyhow::bail!("STORAGE must be 'postgres' or 'memory', got '{}'", other),
        };

        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        if storage == StorageBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL must be set when STORAGE is 'postgres'");
        }

        let distinct_system_code = parse_bool(
            "DISTINCT_SYSTEM_ERROR_CODE",
            lookup("DISTINCT_SYSTEM_ERROR_CODE"),
        )?;

        let log_format = match lookup("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => anyhow::bail!("LOG_FORMAT must be 'text' or 'json', got '{}'", other),
        };

        Ok(Config {
            server_port: lookup("SERVER_PORT")
                .unwrap_or_else(|| "3000".to_string())
                .parse()
                .context("SERVER_PORT must be a port number")?,
            database_url,
            database_max_connections: lookup("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|| "5".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?,
            storage,
            system_error_policy: if distinct_system_code {
                SystemErrorPolicy::SystemCode
            } else {
                SystemErrorPolicy::BusinessCode
            },
            cors_allowed_origins: lookup("CORS_ALLOWED_ORIGINS")
                .as_deref()
                .and_then(parse_origins),
            log_format,
        })
    }

    pub fn database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL is not set")
    }
}

fn parse_bool(name: &str, raw: Option<String>) -> anyhow::Result<bool> {
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(false),
        Some(value) => value
            .parse()
            .with_context(|| format!("{} must be 'true' or 'false'", name)),
    }
}

fn parse_origins(raw: &str) -> Option<Vec<String>> {
    let origins: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect();

    if origins.is_empty() {
        None
    } else {
        Some(origins)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_with_database_url() {
        let config = config_from(&[("DATABASE_URL", "postgres://localhost/tx")]).unwrap();

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.database_max_connections, 5);
        assert_eq!(config.storage, StorageBackend::Postgres);
        assert_eq!(config.system_error_policy, SystemErrorPolicy::BusinessCode);
        assert_eq!(config.cors_allowed_origins, None);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn postgres_requires_database_url() {
        assert!(config_from(&[]).is_err());
        assert!(config_from(&[("DATABASE_URL", "  ")]).is_err());
    }

    #[test]
    fn memory_storage_needs_no_database() {
        let config = config_from(&[("STORAGE", "memory")]).unwrap();

        assert_eq!(config.storage, StorageBackend::Memory);
        assert!(config.database_url().is_err());
    }

    #[test]
    fn distinct_system_error_code_switches_policy() {
        let config = config_from(&[
            ("STORAGE", "memory"),
            ("DISTINCT_SYSTEM_ERROR_CODE", "true"),
        ])
        .unwrap();
        assert_eq!(config.system_error_policy, SystemErrorPolicy::SystemCode);

        assert!(config_from(&[
            ("STORAGE", "memory"),
            ("DISTINCT_SYSTEM_ERROR_CODE", "maybe"),
        ])
        .is_err());
    }

    #[test]
    fn parses_cors_origins() {
        let config = config_from(&[
            ("STORAGE", "memory"),
            ("CORS_ALLOWED_ORIGINS", "http://a.test, ,http://b.test"),
        ])
        .unwrap();

        assert_eq!(
            config.cors_allowed_origins,
            Some(vec!["http://a.test".to_string(), "http://b.test".to_string()])
        );
    }

    #[test]
    fn rejects_unknown_values() {
        assert!(config_from(&[("STORAGE", "redis")]).is_err());
        assert!(config_from(&[("STORAGE", "memory"), ("LOG_FORMAT", "xml")]).is_err());
        assert!(config_from(&[("STORAGE", "memory"), ("SERVER_PORT", "http")]).is_err());
    }
}
