//! Environment-backed runtime configuration

use std::env;

use crate::ConciergeError;

pub const DEFAULT_MODEL: &str = "claude-3-5-haiku-20241022";
pub const DEFAULT_MAX_TOKENS: u32 = 1024;
pub const DEFAULT_ADDR: &str = "127.0.0.1:8000";

#[derive(Debug, Clone)]
pub struct Config {
    pub anthropic_api_key: String,
    pub serpapi_key: String,
    /// Optional: without it the attractions fetch fails in isolation.
    pub geoapify_api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub addr: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConciergeError> {
        Ok(Self {
            anthropic_api_key: require("ANTHROPIC_API_KEY")?,
            serpapi_key: require("SERPAPI_KEY")?,
            geoapify_api_key: optional("GEOAPIFY_API_KEY"),
            model: optional("CONCIERGE_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: optional("CONCIERGE_MAX_TOKENS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_MAX_TOKENS),
            addr: optional("CONCIERGE_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string()),
        })
    }
}

fn require(name: &'static str) -> Result<String, ConciergeError> {
    optional(name).ok_or(ConciergeError::MissingConfig(name))
}

fn optional(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}
