use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::llm_client::retry::RetryPolicy;

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODELS: &str = "gemini-2.5-flash-preview-05-20,gemini-2.0-flash";

/// Application configuration loaded from environment variables.
///
/// The Gemini secret is deliberately absent: only the name of the variable that
/// holds it is stored, and the value is read on every call.
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub api_key_env: String,
    pub api_base: String,
    /// Ordered fallback list, tried front to back.
    pub models: Vec<String>,
    pub retry: RetryPolicy,
    pub upstream_timeout: Duration,
    pub request_timeout: Duration,
    pub catalog_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let models = parse_models(&env_or("GEMINI_MODELS", DEFAULT_MODELS));
        if models.is_empty() {
            bail!("GEMINI_MODELS must name at least one model");
        }

        let max_attempts = parse_env::<u32>("TAILOR_MAX_ATTEMPTS", 4)?;
        if max_attempts == 0 {
            bail!("TAILOR_MAX_ATTEMPTS must be at least 1");
        }

        let request_timeout = parse_env::<u64>("TAILOR_REQUEST_TIMEOUT_SECS", 60)?;
        if request_timeout == 0 {
            bail!("TAILOR_REQUEST_TIMEOUT_SECS must be at least 1");
        }

        Ok(Config {
            port: parse_env("PORT", 8080)?,
            rust_log: env_or("RUST_LOG", "info"),
            api_key_env: env_or("GEMINI_API_KEY_ENV", "GEMINI_API_KEY"),
            api_base: env_or("GEMINI_API_BASE", DEFAULT_API_BASE)
                .trim_end_matches('/')
                .to_string(),
            models,
            retry: RetryPolicy {
                max_attempts,
                base_delay: Duration::from_millis(parse_env("TAILOR_BACKOFF_BASE_MS", 500)?),
                max_jitter: Duration::from_millis(parse_env("TAILOR_BACKOFF_JITTER_MS", 250)?),
            },
            upstream_timeout: Duration::from_secs(parse_env("TAILOR_UPSTREAM_TIMEOUT_SECS", 120)?),
            request_timeout: Duration::from_secs(request_timeout),
            catalog_path: std::env::var("TAILOR_CATALOG_PATH")
                .ok()
                .filter(|p| !p.trim().is_empty()),
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .ok()
            .with_context(|| format!("Environment variable '{key}' has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

/// Splits a comma-separated model list, dropping blank entries.
fn parse_models(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_models_keeps_order() {
        assert_eq!(
            parse_models("gemini-2.5-flash, gemini-2.0-flash"),
            vec!["gemini-2.5-flash", "gemini-2.0-flash"]
        );
    }

    #[test]
    fn test_parse_models_drops_blanks() {
        assert_eq!(parse_models(" ,gemini-2.0-flash,, "), vec!["gemini-2.0-flash"]);
        assert!(parse_models(" , ").is_empty());
    }

    #[test]
    fn test_default_model_list_is_valid() {
        assert_eq!(parse_models(DEFAULT_MODELS).len(), 2);
    }

    #[test]
    fn test_parse_env_uses_default_when_unset() {
        let value: u64 = parse_env("TAILOR_TEST_UNSET_VARIABLE_XYZ", 42).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        std::env::set_var("TAILOR_TEST_GARBAGE_PORT", "not-a-port");
        let result = parse_env::<u16>("TAILOR_TEST_GARBAGE_PORT", 8080);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_request_timeout_is_rejected() {
        std::env::set_var("TAILOR_REQUEST_TIMEOUT_SECS", "0");
        let result = Config::from_env();
        std::env::remove_var("TAILOR_REQUEST_TIMEOUT_SECS");

        let err = result.unwrap_err();
        assert!(err.to_string().contains("TAILOR_REQUEST_TIMEOUT_SECS"));
    }
}
