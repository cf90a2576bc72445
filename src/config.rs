use std::path::PathBuf;

use thiserror::Error;

use crate::auth::password::{MAX_HASH_COST, MIN_HASH_COST};

/// Shortest accepted session signing secret, in bytes.
const MIN_SESSION_SECRET_LENGTH: usize = 32;

/// Longest accepted session lifetime (one year).
const MAX_SESSION_TTL_HOURS: i64 = 24 * 365;

/// Largest accepted tab content limit, in MiB.
const MAX_CONTENT_SIZE_MB: usize = 64;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to parse {name} as boolean: {value}")]
    ParseBool { name: String, value: String },
}

/// Application configuration loaded from environment variables.
#[derive(Clone)]
pub struct Config {
    // Database
    pub database_path: PathBuf,

    // Sessions
    pub session_secret: String,
    pub session_ttl_hours: i64,
    pub secure_cookies: bool,

    // Passwords
    pub password_hash_cost: u32,

    // Content
    pub max_content_size_mb: usize,
    pub encryption_enabled: bool,
    pub encryption_key: Option<String>,

    // Abuse protection
    pub rate_limit_per_minute: u32,
    pub access_log_retention_days: i64,
    /// Take the client address from `X-Forwarded-For`/`X-Real-IP` instead
    /// of the peer address. Only enable behind a proxy that sets them.
    pub trust_proxy_headers: bool,

    // Web Server
    pub web_host: String,
    pub web_port: u16,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("session_secret", &"REDACTED")
            .field("session_ttl_hours", &self.session_ttl_hours)
            .field("secure_cookies", &self.secure_cookies)
            .field("password_hash_cost", &self.password_hash_cost)
            .field("max_content_size_mb", &self.max_content_size_mb)
            .field("encryption_enabled", &self.encryption_enabled)
            .field(
                "encryption_key",
                &self.encryption_key.as_ref().map(|_| "REDACTED"),
            )
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("access_log_retention_days", &self.access_log_retention_days)
            .field("trust_proxy_headers", &self.trust_proxy_headers)
            .field("web_host", &self.web_host)
            .field("web_port", &self.web_port)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Database
            database_path: PathBuf::from(env_or_default("DATABASE_PATH", "./data/vault.sqlite")),

            // Sessions
            session_secret: required_env("SESSION_SECRET")?,
            session_ttl_hours: parse_env_i64("SESSION_TTL_HOURS", 24)?,
            secure_cookies: parse_env_bool("SECURE_COOKIES", false)?,

            // Passwords
            password_hash_cost: parse_env_u32("PASSWORD_HASH_COST", 12)?,

            // Content
            max_content_size_mb: parse_env_usize("MAX_CONTENT_SIZE_MB", 1)?,
            encryption_enabled: parse_env_bool("ENCRYPTION_ENABLED", false)?,
            encryption_key: optional_env("ENCRYPTION_KEY"),

            // Abuse protection
            rate_limit_per_minute: parse_env_u32("RATE_LIMIT_PER_MINUTE", 60)?,
            access_log_retention_days: parse_env_i64("ACCESS_LOG_RETENTION_DAYS", 90)?,
            trust_proxy_headers: parse_env_bool("TRUST_PROXY_HEADERS", false)?,

            // Web Server
            web_host: env_or_default("WEB_HOST", "0.0.0.0"),
            web_port: parse_env_u16("WEB_PORT", 8080)?,
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_secret.len() < MIN_SESSION_SECRET_LENGTH {
            return Err(ConfigError::InvalidValue {
                name: "SESSION_SECRET".to_string(),
                message: format!("must be at least {MIN_SESSION_SECRET_LENGTH} bytes"),
            });
        }
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&self.session_ttl_hours) {
            return Err(ConfigError::InvalidValue {
                name: "SESSION_TTL_HOURS".to_string(),
                message: format!("must be between 1 and {MAX_SESSION_TTL_HOURS}"),
            });
        }
        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&self.password_hash_cost) {
            return Err(ConfigError::InvalidValue {
                name: "PASSWORD_HASH_COST".to_string(),
                message: format!("must be between {MIN_HASH_COST} and {MAX_HASH_COST}"),
            });
        }
        if !(1..=MAX_CONTENT_SIZE_MB).contains(&self.max_content_size_mb) {
            return Err(ConfigError::InvalidValue {
                name: "MAX_CONTENT_SIZE_MB".to_string(),
                message: format!("must be between 1 and {MAX_CONTENT_SIZE_MB}"),
            });
        }
        if self.rate_limit_per_minute == 0 {
            return Err(ConfigError::InvalidValue {
                name: "RATE_LIMIT_PER_MINUTE".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.encryption_enabled {
            let key_ok = self
                .encryption_key
                .as_deref()
                .is_some_and(|k| k.len() == 64 && k.chars().all(|c| c.is_ascii_hexdigit()));
            if !key_ok {
                return Err(ConfigError::InvalidValue {
                    name: "ENCRYPTION_KEY".to_string(),
                    message: "must be 64 hex characters when ENCRYPTION_ENABLED is set"
                        .to_string(),
                });
            }
        }
        Ok(())
    }

    /// Maximum tab content size in bytes.
    #[must_use]
    pub const fn max_content_bytes(&self) -> usize {
        self.max_content_size_mb * 1024 * 1024
    }

    /// Session token lifetime.
    #[must_use]
    pub fn session_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.session_ttl_hours)
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn parse_env<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr<Err = std::num::ParseIntError>,
{
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}

fn parse_env_i64(name: &str, default: i64) -> Result<i64, ConfigError> {
    parse_env(name, default)
}

fn parse_env_u32(name: &str, default: u32) -> Result<u32, ConfigError> {
    parse_env(name, default)
}

fn parse_env_u16(name: &str, default: u16) -> Result<u16, ConfigError> {
    parse_env(name, default)
}

fn parse_env_usize(name: &str, default: usize) -> Result<usize, ConfigError> {
    parse_env(name, default)
}

fn parse_env_bool(name: &str, default: bool) -> Result<bool, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => match val.to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::ParseBool {
                name: name.to_string(),
                value: val,
            }),
        },
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> Config {
        Config {
            database_path: PathBuf::from(":memory:"),
            session_secret: "s".repeat(32),
            session_ttl_hours: 24,
            secure_cookies: false,
            password_hash_cost: 12,
            max_content_size_mb: 1,
            encryption_enabled: false,
            encryption_key: None,
            rate_limit_per_minute: 60,
            access_log_retention_days: 90,
            trust_proxy_headers: false,
            web_host: "127.0.0.1".to_string(),
            web_port: 8080,
        }
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_env_bool("NONEXISTENT_VAR", true).unwrap());
        assert!(!parse_env_bool("NONEXISTENT_VAR", false).unwrap());
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let mut config = base_config();
        config.session_secret = "too-short".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { name, .. }) if name == "SESSION_SECRET"
        ));
    }

    #[test]
    fn test_validate_requires_key_when_encryption_enabled() {
        let mut config = base_config();
        config.encryption_enabled = true;
        assert!(config.validate().is_err());

        config.encryption_key = Some("ab".repeat(32));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_cost() {
        let mut config = base_config();
        config.password_hash_cost = 40;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_huge_session_ttl() {
        let mut config = base_config();
        config.session_ttl_hours = i64::MAX / 2;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { name, .. }) if name == "SESSION_TTL_HOURS"
        ));

        config.session_ttl_hours = MAX_SESSION_TTL_HOURS;
        assert!(config.validate().is_ok());
        assert_eq!(config.session_ttl().num_days(), 365);
    }

    #[test]
    fn test_validate_rejects_huge_content_limit() {
        let mut config = base_config();
        config.max_content_size_mb = usize::MAX / 2;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { name, .. }) if name == "MAX_CONTENT_SIZE_MB"
        ));

        config.max_content_size_mb = MAX_CONTENT_SIZE_MB;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", base_config());
        assert!(!rendered.contains(&"s".repeat(32)));
        assert!(rendered.contains("REDACTED"));
    }

    #[test]
    fn test_max_content_bytes() {
        assert_eq!(base_config().max_content_bytes(), 1024 * 1024);
    }
}
