//! Configuration loading and validation.

use crate::error::{ConfigError, Result};

/// Zalobot configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Zalo Bot API token.
    pub bot_token: String,

    /// Shared secret echoed back by Zalo in the webhook header.
    pub secret_token: String,

    /// Public URL registered as the webhook target, when known.
    pub webhook_url: Option<String>,

    /// Google Gemini API key.
    pub gemini_api_key: String,

    /// HTTP listen port.
    pub port: u16,

    /// Reply delivery settings.
    pub reply: ReplyConfig,

    /// Task-category inference settings.
    pub categories: CategoryConfig,
}

/// Reply delivery configuration.
#[derive(Debug, Clone, Copy)]
pub struct ReplyConfig {
    /// Maximum characters per outgoing message before chunking.
    pub max_chars: usize,

    /// Delay between consecutive chunks of one reply (milliseconds).
    pub chunk_delay_ms: u64,
}

impl Default for ReplyConfig {
    fn default() -> Self {
        Self {
            max_chars: 2000,
            chunk_delay_ms: 500,
        }
    }
}

/// Trigger words for routing code/math questions to the low-latency model.
///
/// Policy data, not logic: the words live here so retargeting the bot to
/// another language means editing this list, nothing else.
#[derive(Debug, Clone)]
pub struct CategoryConfig {
    pub code_math_keywords: Vec<String>,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        let keywords = [
            "code",
            "bug",
            "debug",
            "function",
            "thuật toán",
            "lập trình",
            "hàm số",
            "phương trình",
            "giải toán",
            "tính toán",
            "đạo hàm",
            "tích phân",
            "regex",
            "sql",
            "python",
            "javascript",
            "rust",
        ];
        Self {
            code_math_keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl Config {
    /// Load configuration from the environment.
    pub fn load() -> Result<Self> {
        let bot_token = require_var("ZALO_BOT_TOKEN")?;
        let secret_token = require_var("ZALO_SECRET_TOKEN")?;
        let gemini_api_key = require_var("GEMINI_API_KEY")?;

        let webhook_url = std::env::var("WEBHOOK_URL").ok().filter(|v| !v.is_empty());

        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid(format!("PORT is not a valid port: {raw}")))?,
            Err(_) => 3000,
        };

        Ok(Self {
            bot_token,
            secret_token,
            webhook_url,
            gemini_api_key,
            port,
            reply: ReplyConfig::default(),
            categories: CategoryConfig::default(),
        })
    }
}

fn require_var(name: &'static str) -> Result<String> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingVar(name).into()),
    }
}
