//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub cors_origin: String,
    pub quotes_path: PathBuf,
    pub openai: OpenAiSettings,
    pub jwt: JwtSettings,
    /// When set, authentication is skipped and every request acts as the dev user.
    pub dev_auth: bool,
    pub dev_user_key: i64,
}

/// Settings for the analysis model client.
#[derive(Clone, Debug)]
pub struct OpenAiSettings {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout: Duration,
    pub max_output_tokens: u32,
}

/// Settings for app-issued bearer tokens.
#[derive(Clone, Debug)]
pub struct JwtSettings {
    pub signing_key: String,
    pub expire_minutes: i64,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address = parse_var("BIND_ADDRESS", "0.0.0.0:3000")?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin =
            std::env::var("CORS_ORIGIN").unwrap_or_else(|_| "http://localhost:3000".to_string());

        let quotes_path = std::env::var("QUOTES_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./quotes_data.json"));

        // --- Load Analysis Model Settings ---
        let openai = OpenAiSettings {
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: std::env::var("OPENAI_BASE_URL").ok(),
            model: std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            timeout: Duration::from_secs(parse_var("OPENAI_TIMEOUT", "20")?),
            max_output_tokens: parse_var("OPENAI_MAX_OUTPUT_TOKENS", "800")?,
        };

        // --- Load Auth Settings ---
        let jwt = JwtSettings {
            signing_key: std::env::var("APP_JWT_SIGNING_KEY")
                .unwrap_or_else(|_| "dev-app-jwt".to_string()),
            expire_minutes: parse_var("APP_JWT_EXPIRE_MIN", "43200")?,
        };
        let dev_auth = parse_var("DEV_AUTH", "false")?;
        let dev_user_key = parse_var("DEV_USER_KEY", "0")?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_origin,
            quotes_path,
            openai,
            jwt,
            dev_auth,
            dev_user_key,
        })
    }
}

/// Reads `name`, falling back to `default`, and parses it into `T`.
fn parse_var<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var_uses_default_when_unset() {
        let value: u64 = parse_var("DIARY_TEST_SURELY_UNSET_VAR", "20").unwrap();
        assert_eq!(value, 20);
    }

    #[test]
    fn test_parse_var_reports_invalid_default() {
        let err = parse_var::<u64>("DIARY_TEST_SURELY_UNSET_VAR", "soon").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref name, _) if name == "DIARY_TEST_SURELY_UNSET_VAR"));
    }

    #[test]
    fn test_parse_var_bool() {
        let value: bool = parse_var("DIARY_TEST_SURELY_UNSET_VAR", "true").unwrap();
        assert!(value);
    }
}
