use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Placeholder secret shipped in the default config; startup refuses to run
/// with it so a generated config cannot silently go to production.
pub const PLACEHOLDER_JWT_SECRET: &str = "change-me-to-a-long-random-secret-value";

const MIN_JWT_SECRET_LEN: usize = 32;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub server: ServerConfig,

    pub auth: AuthConfig,

    pub rate_limit: RateLimitConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            general: GeneralConfig::default(),
            server: ServerConfig::default(),
            auth: AuthConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,

    /// Number of tokio worker threads (default: 2)
    /// Set to 0 to use the number of CPU cores
    pub worker_threads: usize,

    /// Maximum database connections (default: 5)
    pub max_db_connections: u32,

    /// Minimum database connections (default: 1)
    pub min_db_connections: u32,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/deskarr.db".to_string(),
            log_level: "info".to_string(),
            worker_threads: 2,
            max_db_connections: 5,
            min_db_connections: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,

    pub port: u16,

    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            cors_allowed_origins: vec!["*".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// HS256 signing secret. Overridden by the DESKARR_JWT_SECRET environment
    /// variable when set; the config-file value is mainly for development.
    #[serde(skip_serializing)]
    pub jwt_secret: String,

    /// Password for the bootstrap admin account. When unset, a random
    /// password is generated on first boot and logged once.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bootstrap_admin_password: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: PLACEHOLDER_JWT_SECRET.to_string(),
            bootstrap_admin_password: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Sustained refill rate in requests per second.
    pub requests_per_second: f64,

    /// Maximum burst size; new clients start with this many tokens.
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 0.5,
            burst: 5,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // .env is optional; absence is not an error.
        dotenvy::dotenv().ok();

        let path = PathBuf::from("config.toml");
        let mut config = if path.exists() {
            info!("Loading config from: {}", path.display());
            Self::load_from_path(&path)?
        } else {
            info!("No config file found, using defaults");
            Self::default()
        };

        if let Ok(secret) = std::env::var("DESKARR_JWT_SECRET") {
            config.auth.jwt_secret = secret;
        }
        if let Ok(password) = std::env::var("DESKARR_ADMIN_PASSWORD") {
            config.auth.bootstrap_admin_password = Some(password);
        }

        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Startup-time sanity checks. Failing any of these aborts the process
    /// before a socket is bound.
    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret == PLACEHOLDER_JWT_SECRET {
            anyhow::bail!(
                "JWT secret is still the placeholder value; set auth.jwt_secret or DESKARR_JWT_SECRET"
            );
        }

        if self.auth.jwt_secret.len() < MIN_JWT_SECRET_LEN {
            anyhow::bail!("JWT secret must be at least {MIN_JWT_SECRET_LEN} characters");
        }

        if self.server.port == 0 {
            anyhow::bail!("Server port must be non-zero");
        }

        if self.rate_limit.requests_per_second <= 0.0 || self.rate_limit.burst == 0 {
            anyhow::bail!("Rate limit must have a positive rate and a non-zero burst");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.rate_limit.burst, 5);
        assert_eq!(config.general.max_db_connections, 5);
    }

    #[test]
    fn test_placeholder_secret_rejected() {
        let config = Config::default();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_short_secret_rejected() {
        let mut config = Config::default();
        config.auth.jwt_secret = "too-short".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_long_secret_accepted() {
        let mut config = Config::default();
        config.auth.jwt_secret = "0123456789abcdef0123456789abcdef".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
            [general]
            log_level = "debug"

            [server]
            port = 9090

            [rate_limit]
            burst = 10
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.rate_limit.burst, 10);

        assert_eq!(config.general.max_db_connections, 5);
    }
}
