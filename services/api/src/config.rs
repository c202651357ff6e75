//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use study_insights_core::MasteryPolicy;
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
    pub openai_api_key: String,
    pub summary_model: String,
    pub narrative_timeout: Duration,
    pub narrative_cache_capacity: u64,
    pub narrative_cache_ttl: Duration,
    pub report_window_days: u32,
    pub mastery: MasteryPolicy,
}

/// Parses `raw` as `T`, naming `var` in the error.
fn parse_value<T>(var: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(var.to_string(), e.to_string()))
}

/// Reads `var`, failing with `MissingVar` when it is unset or empty.
fn required_var(var: &str) -> Result<String, ConfigError> {
    std::env::var(var)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| ConfigError::MissingVar(var.to_string()))
}

/// Reads `var`, falling back to `default` when it is unset.
fn var_or<T>(var: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => parse_value(var, &raw),
        Err(_) => Ok(default),
    }
}

/// Checks the mastery thresholds can never classify a topic both ways.
fn validate_policy(policy: MasteryPolicy) -> Result<MasteryPolicy, ConfigError> {
    policy
        .validate()
        .map(|_| policy)
        .map_err(|e| ConfigError::InvalidValue("MASTERY_*".to_string(), e.to_string()))
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = parse_value::<SocketAddr>("BIND_ADDRESS", &bind_address_str)?;

        let database_url = required_var("DATABASE_URL")?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Load Narrative Service Settings ---
        let openai_api_key = required_var("OPENAI_API_KEY")?;
        let summary_model =
            std::env::var("SUMMARY_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let narrative_timeout = Duration::from_secs(var_or("NARRATIVE_TIMEOUT_SECS", 20u64)?);
        let narrative_cache_capacity = var_or("NARRATIVE_CACHE_CAPACITY", 256u64)?;
        let narrative_cache_ttl =
            Duration::from_secs(var_or("NARRATIVE_CACHE_TTL_SECS", 3600u64)?);

        // --- Load Report Policy ---
        let report_window_days = var_or("REPORT_WINDOW_DAYS", 7u32)?;
        if report_window_days == 0 {
            return Err(ConfigError::InvalidValue(
                "REPORT_WINDOW_DAYS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let defaults = MasteryPolicy::default();
        let mastery = validate_policy(MasteryPolicy {
            min_attempts: var_or("MASTERY_MIN_ATTEMPTS", defaults.min_attempts)?,
            strength_threshold: var_or("MASTERY_STRENGTH_THRESHOLD", defaults.strength_threshold)?,
            weakness_threshold: var_or("MASTERY_WEAKNESS_THRESHOLD", defaults.weakness_threshold)?,
            top_k: var_or("MASTERY_TOP_K", defaults.top_k)?,
        })?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_origin,
            openai_api_key,
            summary_model,
            narrative_timeout,
            narrative_cache_capacity,
            narrative_cache_ttl,
            report_window_days,
            mastery,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_value_names_the_variable() {
        assert_eq!(parse_value::<u32>("MASTERY_TOP_K", " 5 ").unwrap(), 5);
        let err = parse_value::<u8>("MASTERY_STRENGTH_THRESHOLD", "300").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref var, _) if var == "MASTERY_STRENGTH_THRESHOLD"));
    }

    #[test]
    fn unset_or_blank_required_var_is_missing() {
        let err = required_var("STUDY_INSIGHTS_UNSET_KEY_FOR_TEST").unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref var) if var == "STUDY_INSIGHTS_UNSET_KEY_FOR_TEST"));

        std::env::set_var("STUDY_INSIGHTS_BLANK_KEY_FOR_TEST", "  ");
        let err = required_var("STUDY_INSIGHTS_BLANK_KEY_FOR_TEST").unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(_)));

        std::env::set_var("STUDY_INSIGHTS_SET_KEY_FOR_TEST", "sk-test");
        assert_eq!(required_var("STUDY_INSIGHTS_SET_KEY_FOR_TEST").unwrap(), "sk-test");
    }

    #[test]
    fn overlapping_thresholds_are_rejected() {
        let policy = MasteryPolicy {
            strength_threshold: 40,
            weakness_threshold: 60,
            ..MasteryPolicy::default()
        };
        assert!(validate_policy(policy).is_err());
        assert!(validate_policy(MasteryPolicy::default()).is_ok());
    }
}
