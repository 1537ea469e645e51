//! Runtime configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `STOCKROOM_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`). Needed for sign-in and setup probes.
//! - `STOCKROOM_DB_SCHEMA` - Schema holding the app tables (default: public)
//! - `STOCKROOM_SESSION_DIR` - Directory for the persisted session (default:
//!   the platform data directory + `/stockroom`, or `./.stockroom`)
//! - `STOCKROOM_LOG_FORMAT` - `text` or `json` (default: text)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate between 0.0 and 1.0 (default: 1.0)

use std::path::PathBuf;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_SCHEMA: &str = "public";
const SESSION_DIR_NAME: &str = "stockroom";
const FALLBACK_SESSION_DIR: &str = ".stockroom";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Stockroom runtime configuration.
#[derive(Clone)]
pub struct AppConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: Option<SecretString>,
    /// Schema holding the app's enums, tables and functions
    pub db_schema: String,
    /// Directory holding the persisted session
    pub session_dir: PathBuf,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("db_schema", &self.db_schema)
            .field("session_dir", &self.session_dir)
            .field("log_format", &self.log_format)
            .field("sentry_dsn", &self.sentry_dsn)
            .field("sentry_environment", &self.sentry_environment)
            .field("sentry_sample_rate", &self.sentry_sample_rate)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup` instead of the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("STOCKROOM_DATABASE_URL")
            .or_else(|| lookup("DATABASE_URL"))
            .filter(|url| !url.trim().is_empty())
            .map(SecretString::from);

        let db_schema = lookup("STOCKROOM_DB_SCHEMA").unwrap_or_else(|| DEFAULT_SCHEMA.to_owned());
        validate_identifier(&db_schema, "STOCKROOM_DB_SCHEMA")?;

        let session_dir = lookup("STOCKROOM_SESSION_DIR")
            .map_or_else(default_session_dir, PathBuf::from);

        let log_format = match lookup("STOCKROOM_LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidEnvVar(
                    "STOCKROOM_LOG_FORMAT".to_string(),
                    format!("expected 'text' or 'json', got '{other}'"),
                ));
            }
        };

        let sentry_sample_rate = match lookup("SENTRY_SAMPLE_RATE") {
            Some(raw) => parse_sample_rate(&raw, "SENTRY_SAMPLE_RATE")?,
            None => 1.0,
        };

        Ok(Self {
            database_url,
            db_schema,
            session_dir,
            log_format,
            sentry_dsn: lookup("SENTRY_DSN"),
            sentry_environment: lookup("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
        })
    }

    /// The database URL, for commands that cannot run without one.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if no database URL is configured.
    pub fn require_database_url(&self) -> Result<&SecretString, ConfigError> {
        self.database_url
            .as_ref()
            .ok_or_else(|| ConfigError::MissingEnvVar("STOCKROOM_DATABASE_URL".to_string()))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn default_session_dir() -> PathBuf {
    dirs::data_dir().map_or_else(
        || PathBuf::from(FALLBACK_SESSION_DIR),
        |dir| dir.join(SESSION_DIR_NAME),
    )
}

/// Schema names are interpolated into catalog queries as bind values only,
/// but are also shown in SQL snippets, so keep them to plain identifiers.
fn validate_identifier(value: &str, var_name: &str) -> Result<(), ConfigError> {
    let mut chars = value.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

    if valid_start && valid_rest && value.len() <= 63 {
        Ok(())
    } else {
        Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("'{value}' is not a lower-case SQL identifier"),
        ))
    }
}

fn parse_sample_rate(raw: &str, var_name: &str) -> Result<f32, ConfigError> {
    let rate = raw
        .trim()
        .parse::<f32>()
        .map_err(|e| ConfigError::InvalidEnvVar(var_name.to_string(), e.to_string()))?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!("{rate} is outside 0.0..=1.0"),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert!(config.database_url.is_none());
        assert_eq!(config.db_schema, "public");
        assert_eq!(config.log_format, LogFormat::Text);
        assert!((config.sentry_sample_rate - 1.0).abs() < f32::EPSILON);
        assert!(config.session_dir.ends_with(SESSION_DIR_NAME) || config.session_dir.ends_with(FALLBACK_SESSION_DIR));
        assert!(config.require_database_url().is_err());
    }

    #[test]
    fn test_database_url_fallback() {
        let config = load(&[("DATABASE_URL", "postgres://fly/app")]).unwrap();
        assert_eq!(
            config.require_database_url().unwrap().expose_secret(),
            "postgres://fly/app"
        );

        let config = load(&[
            ("DATABASE_URL", "postgres://fly/app"),
            ("STOCKROOM_DATABASE_URL", "postgres://local/stockroom"),
        ])
        .unwrap();
        assert_eq!(
            config.require_database_url().unwrap().expose_secret(),
            "postgres://local/stockroom"
        );
    }

    #[test]
    fn test_blank_database_url_is_unset() {
        let config = load(&[("STOCKROOM_DATABASE_URL", "  ")]).unwrap();
        assert!(config.database_url.is_none());
    }

    #[test]
    fn test_session_dir_override() {
        let config = load(&[("STOCKROOM_SESSION_DIR", "/tmp/stockroom-test")]).unwrap();
        assert_eq!(config.session_dir, PathBuf::from("/tmp/stockroom-test"));
    }

    #[test]
    fn test_log_format() {
        let config = load(&[("STOCKROOM_LOG_FORMAT", "json")]).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);

        let err = load(&[("STOCKROOM_LOG_FORMAT", "yaml")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(var, _) if var == "STOCKROOM_LOG_FORMAT"));
    }

    #[test]
    fn test_schema_must_be_identifier() {
        assert!(load(&[("STOCKROOM_DB_SCHEMA", "inventory_v2")]).is_ok());
        assert!(load(&[("STOCKROOM_DB_SCHEMA", "public; drop table x")]).is_err());
        assert!(load(&[("STOCKROOM_DB_SCHEMA", "2fast")]).is_err());
        assert!(load(&[("STOCKROOM_DB_SCHEMA", "")]).is_err());
    }

    #[test]
    fn test_sample_rate_bounds() {
        let config = load(&[("SENTRY_SAMPLE_RATE", "0.25")]).unwrap();
        assert!((config.sentry_sample_rate - 0.25).abs() < f32::EPSILON);
        assert!(load(&[("SENTRY_SAMPLE_RATE", "1.5")]).is_err());
        assert!(load(&[("SENTRY_SAMPLE_RATE", "often")]).is_err());
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let config = load(&[("STOCKROOM_DATABASE_URL", "postgres://app:hunter2@db/stock")]).unwrap();
        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter2"));
    }
}
