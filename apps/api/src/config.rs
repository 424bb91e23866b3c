use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{bail, Context, Result};

pub const DEFAULT_GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_GROQ_MODEL: &str = "llama-3.1-8b-instant";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application configuration loaded from environment variables.
/// Startup fails if a value is present but malformed or out of range.
#[derive(Debug, Clone)]
pub struct Config {
    /// `None` selects the in-memory profile and settings stores.
    pub database_url: Option<String>,
    pub groq: GroqConfig,
    /// Initial value of the extraction policy flag.
    pub llm_fallback_only: bool,
    pub taxonomy_path: PathBuf,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Clone)]
pub struct GroqConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Initial model; the live value is held by the settings store.
    pub model: String,
    pub timeout_secs: u64,
    pub max_tokens: u32,
}

// Hand-written so the API key never reaches a log line.
impl std::fmt::Debug for GroqConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let config = Config {
            database_url: optional_env("DATABASE_URL"),
            groq: GroqConfig {
                api_key: optional_env("GROQ_API_KEY").map(|k| k.trim().to_string()),
                base_url: optional_env("GROQ_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_GROQ_BASE_URL.to_string()),
                model: optional_env("GROQ_MODEL").unwrap_or_else(|| DEFAULT_GROQ_MODEL.to_string()),
                timeout_secs: parse_env("GROQ_TIMEOUT_SECS", 30)?,
                max_tokens: parse_env("GROQ_MAX_TOKENS", 1000)?,
            },
            llm_fallback_only: parse_env("LLM_FALLBACK_ONLY", false)?,
            taxonomy_path: optional_env("TAXONOMY_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("data/skills-taxonomy.json")),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            port: parse_env("PORT", 8080)?,
            rust_log: optional_env("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if !(1..=300).contains(&self.groq.timeout_secs) {
            bail!("GROQ_TIMEOUT_SECS must be between 1 and 300");
        }
        if !(100..=10_000).contains(&self.groq.max_tokens) {
            bail!("GROQ_MAX_TOKENS must be between 100 and 10000");
        }
        if !(1024..=100 * 1024 * 1024).contains(&self.max_upload_bytes) {
            bail!("MAX_UPLOAD_BYTES must be between 1 KiB and 100 MiB");
        }
        if self.groq.model.trim().is_empty() {
            bail!("GROQ_MODEL cannot be blank");
        }
        Ok(())
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        None => Ok(default),
    }
}

#[cfg(test)]
impl Config {
    /// Configuration used by handler tests: in-memory stores, no API key.
    pub fn for_tests() -> Self {
        Config {
            database_url: None,
            groq: GroqConfig {
                api_key: None,
                base_url: DEFAULT_GROQ_BASE_URL.to_string(),
                model: DEFAULT_GROQ_MODEL.to_string(),
                timeout_secs: 30,
                max_tokens: 1000,
            },
            llm_fallback_only: false,
            taxonomy_path: PathBuf::from("data/skills-taxonomy.json"),
            max_upload_bytes: 64 * 1024,
            port: 8080,
            rust_log: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(Config::for_tests().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_timeout_out_of_range() {
        let mut config = Config::for_tests();
        config.groq.timeout_secs = 0;
        assert!(config.validate().is_err());
        config.groq.timeout_secs = 301;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_max_tokens_out_of_range() {
        let mut config = Config::for_tests();
        config.groq.max_tokens = 99;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_tiny_upload_limit() {
        let mut config = Config::for_tests();
        config.max_upload_bytes = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let mut config = Config::for_tests();
        config.groq.api_key = Some("gsk_secret".to_string());
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("gsk_secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
