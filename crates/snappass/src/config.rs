//! Configuration loading and validation for the snappass service.
//!
//! All values are read from environment variables at startup. The process will
//! exit with a clear error message if any variable is invalid.

use anyhow::{Context, Result};
use serde::Deserialize;

/// Which [`SecretStore`](crate::store::SecretStore) implementation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Volatile in-process map; secrets are lost on restart.
    Memory,
    /// Durable SQLite file at `database_path`.
    Sqlite,
}

/// Validated service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Port the HTTP server listens on.
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Storage backend: `memory` or `sqlite`.
    #[serde(default = "default_storage_backend")]
    pub storage_backend: StorageBackend,

    /// SQLite database file. Only read when the backend is `sqlite`.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Largest accepted secret, in bytes of UTF-8.
    #[serde(default = "default_max_secret_bytes")]
    pub max_secret_bytes: usize,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// OTLP endpoint for span export. Export is disabled when unset.
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,
}

fn default_listen_port() -> u16 {
    5000
}
fn default_storage_backend() -> StorageBackend {
    StorageBackend::Memory
}
fn default_database_path() -> String {
    "snappass.db".into()
}
fn default_max_secret_bytes() -> usize {
    64 * 1024
}
fn default_log_level() -> String {
    "info".into()
}

impl Config {
    /// Load and validate configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if any variable cannot be parsed or fails validation.
    pub fn from_env() -> Result<Self> {
        Self::from_source(config::Environment::default())
    }

    fn from_source<S>(source: S) -> Result<Self>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let cfg = config::Config::builder()
            .add_source(source)
            .build()
            .context("failed to build configuration from environment")?;

        let c: Config = cfg
            .try_deserialize()
            .context("failed to deserialise configuration")?;

        c.validate()?;
        Ok(c)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    fn validate(&self) -> Result<()> {
        if self.storage_backend == StorageBackend::Sqlite {
            ensure_non_empty(&self.database_path, "DATABASE_PATH")?;
        }
        if self.max_secret_bytes == 0 {
            anyhow::bail!("MAX_SECRET_BYTES must be > 0");
        }
        if let Some(endpoint) = &self.otel_exporter_otlp_endpoint {
            ensure_non_empty(endpoint, "OTEL_EXPORTER_OTLP_ENDPOINT")?;
        }
        Ok(())
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} is required and must not be empty");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn valid() -> Config {
        Config {
            listen_port: default_listen_port(),
            storage_backend: default_storage_backend(),
            database_path: default_database_path(),
            max_secret_bytes: default_max_secret_bytes(),
            log_level: default_log_level(),
            otel_exporter_otlp_endpoint: None,
        }
    }

    fn env(vars: &[(&str, &str)]) -> config::Environment {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::default().source(Some(map))
    }

    #[test]
    fn defaults_are_correct() {
        assert_eq!(default_listen_port(), 5000);
        assert_eq!(default_storage_backend(), StorageBackend::Memory);
        assert_eq!(default_database_path(), "snappass.db");
        assert_eq!(default_max_secret_bytes(), 65536);
        assert_eq!(default_log_level(), "info");
    }

    #[test]
    fn empty_environment_uses_defaults() {
        let cfg = Config::from_source(env(&[])).unwrap();
        assert_eq!(cfg.listen_port, 5000);
        assert_eq!(cfg.storage_backend, StorageBackend::Memory);
        assert!(cfg.otel_exporter_otlp_endpoint.is_none());
    }

    #[test]
    fn reads_sqlite_backend_from_environment() {
        let cfg = Config::from_source(env(&[
            ("STORAGE_BACKEND", "sqlite"),
            ("DATABASE_PATH", "/var/lib/snappass/secrets.db"),
            ("LISTEN_PORT", "8080"),
        ]))
        .unwrap();
        assert_eq!(cfg.storage_backend, StorageBackend::Sqlite);
        assert_eq!(cfg.database_path, "/var/lib/snappass/secrets.db");
        assert_eq!(cfg.listen_port, 8080);
    }

    #[test]
    fn rejects_unknown_backend() {
        assert!(Config::from_source(env(&[("STORAGE_BACKEND", "redis")])).is_err());
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_database_path_for_sqlite() {
        let cfg = Config {
            storage_backend: StorageBackend::Sqlite,
            database_path: "  ".into(),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_ignores_database_path_for_memory() {
        let cfg = Config {
            database_path: "".into(),
            ..valid()
        };
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_max_secret_bytes() {
        let cfg = Config {
            max_secret_bytes: 0,
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_rejects_blank_otlp_endpoint() {
        let cfg = Config {
            otel_exporter_otlp_endpoint: Some("".into()),
            ..valid()
        };
        assert!(cfg.validate().is_err());
    }
}
