//! API server configuration.
//!
//! ## Layering
//! ```text
//! built-in defaults  ◄── lowest priority
//!        │
//! branchline.toml    (optional, working directory)
//!        │
//! BRANCHLINE_* env   ◄── highest priority (a `.env` file is loaded first)
//! ```
//!
//! | Key | Env | Default |
//! |---|---|---|
//! | `host` | `BRANCHLINE_HOST` | `0.0.0.0` |
//! | `port` | `BRANCHLINE_PORT` | `8000` |
//! | `database_path` | `BRANCHLINE_DATABASE_PATH` | `branchline.db` |
//! | `db_max_connections` | `BRANCHLINE_DB_MAX_CONNECTIONS` | `5` |
//! | `db_statement_timeout_secs` | `BRANCHLINE_DB_STATEMENT_TIMEOUT_SECS` | `5` |
//! | `jwt_secret` | `BRANCHLINE_JWT_SECRET` | development secret |
//! | `jwt_lifetime_secs` | `BRANCHLINE_JWT_LIFETIME_SECS` | `86400` |
//! | `log_level` | `BRANCHLINE_LOG_LEVEL` | `info` |
//! | `cors_allow_any_origin` | `BRANCHLINE_CORS_ALLOW_ANY_ORIGIN` | `true` |

use std::time::Duration;

use branchline_db::DbConfig;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

/// Optional config file name (extension resolved by the `config` crate).
pub const CONFIG_FILE: &str = "branchline";

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "BRANCHLINE";

/// Secret used when none is configured. Fine for local runs only.
pub const DEV_JWT_SECRET: &str = "branchline-dev-secret-change-me";

const MIN_SECRET_BYTES: usize = 16;

/// API server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Bind host
    pub host: String,

    /// Bind port
    pub port: u16,

    /// SQLite database file
    pub database_path: String,

    /// Pool size
    pub db_max_connections: u32,

    /// Deadline for every store call, in seconds
    pub db_statement_timeout_secs: u64,

    /// HS256 signing secret
    pub jwt_secret: String,

    /// Bearer token lifetime in seconds
    pub jwt_lifetime_secs: i64,

    /// Default `tracing` filter when `RUST_LOG` is unset
    pub log_level: String,

    /// Permissive CORS for browser frontends on other origins
    pub cors_allow_any_origin: bool,
}

impl ApiConfig {
    /// Loads defaults, then `branchline.toml` if present, then `BRANCHLINE_*`
    /// environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_builder(
            Config::builder()
                .add_source(File::with_name(CONFIG_FILE).required(false))
                .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true)),
        )
    }

    /// Applies the defaults under whatever sources `builder` carries, then
    /// validates.
    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config: ApiConfig = builder
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8000)?
            .set_default("database_path", "branchline.db")?
            .set_default("db_max_connections", 5)?
            .set_default("db_statement_timeout_secs", 5)?
            .set_default("jwt_secret", DEV_JWT_SECRET)?
            .set_default("jwt_lifetime_secs", 86_400)?
            .set_default("log_level", "info")?
            .set_default("cors_allow_any_origin", true)?
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.len() < MIN_SECRET_BYTES {
            return Err(ConfigError::InvalidValue {
                key: "jwt_secret",
                reason: format!("must be at least {} bytes", MIN_SECRET_BYTES),
            });
        }
        if self.jwt_lifetime_secs <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "jwt_lifetime_secs",
                reason: "must be positive".to_string(),
            });
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                key: "db_max_connections",
                reason: "must be positive".to_string(),
            });
        }
        if self.db_statement_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "db_statement_timeout_secs",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn statement_timeout(&self) -> Duration {
        Duration::from_secs(self.db_statement_timeout_secs)
    }

    /// Pool settings for the configured database file.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database_path)
            .max_connections(self.db_max_connections)
            .statement_timeout(self.statement_timeout())
    }

    /// Whether the signing secret is still the development default.
    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {key}: {reason}")]
    InvalidValue { key: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::from_builder(Config::builder()).unwrap();

        assert_eq!(config.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.database_path, "branchline.db");
        assert_eq!(config.jwt_lifetime_secs, 86_400);
        assert_eq!(config.statement_timeout(), Duration::from_secs(5));
        assert!(config.uses_dev_secret());
    }

    #[test]
    fn test_overrides_win() {
        let builder = Config::builder()
            .set_override("port", 9090)
            .unwrap()
            .set_override("jwt_secret", "a-much-longer-production-secret")
            .unwrap();
        let config = ApiConfig::from_builder(builder).unwrap();

        assert_eq!(config.port, 9090);
        assert!(!config.uses_dev_secret());
    }

    #[test]
    fn test_short_secret_rejected() {
        let builder = Config::builder().set_override("jwt_secret", "short").unwrap();
        let err = ApiConfig::from_builder(builder).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "jwt_secret", .. }));
    }

    #[test]
    fn test_zero_pool_rejected() {
        let builder = Config::builder().set_override("db_max_connections", 0).unwrap();
        assert!(ApiConfig::from_builder(builder).is_err());
    }
}
