use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

const DEFAULT_USAGE_FILE: &str = "user_usage.json";
const DEFAULT_COOLDOWN_SECS: u64 = 60 * 60 * 24;
const DEFAULT_CONTACT_URL: &str = "https://aibhargav.site";
const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing or malformed.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_api_base: String,
    /// Unset means nobody can bypass the cooldown.
    pub admin_access_code: Option<String>,
    pub admin_contact_url: String,
    pub usage_file: PathBuf,
    pub cooldown: Duration,
    /// Total attempts per generation call, including the first one.
    pub llm_max_attempts: u32,
    /// Honour `X-Forwarded-For` when deriving the caller identity.
    pub trust_forwarded_for: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            gemini_api_base: std::env::var("GEMINI_API_BASE")
                .unwrap_or_else(|_| DEFAULT_GEMINI_API_BASE.to_string()),
            admin_access_code: optional_env("ADMIN_ACCESS_CODE"),
            admin_contact_url: std::env::var("ADMIN_CONTACT_URL")
                .unwrap_or_else(|_| DEFAULT_CONTACT_URL.to_string()),
            usage_file: std::env::var("USAGE_FILE")
                .unwrap_or_else(|_| DEFAULT_USAGE_FILE.to_string())
                .into(),
            cooldown: Duration::from_secs(parse_env("COOLDOWN_SECS", DEFAULT_COOLDOWN_SECS)?),
            llm_max_attempts: parse_env::<u32>("LLM_MAX_ATTEMPTS", 1)?.max(1),
            trust_forwarded_for: parse_env("TRUST_FORWARDED_FOR", false)?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Treats an empty value the same as an unset one.
fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value: '{raw}'")),
        Err(_) => Ok(default),
    }
}
