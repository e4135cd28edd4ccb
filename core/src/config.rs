use anyhow::{Context, Result};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
pub const DEFAULT_ALERT_ENDPOINT: &str = "http://localhost:3000/api/alerts";
pub const DEFAULT_ALERT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LlmSettings {
    pub api_key: String,
    pub model: String,
    pub api_base: Option<String>,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertSettings {
    pub endpoint: String,
    pub timeout: Duration,
}

impl Default for AlertSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ALERT_ENDPOINT.to_string(),
            timeout: DEFAULT_ALERT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub llm: LlmSettings,
    pub alert: AlertSettings,
}

impl Settings {
    /// Reads `.env` (if present) and then the process environment.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = non_empty("OPENAI_API_KEY").context("OPENAI_API_KEY must be set in .env")?;
        let model = non_empty("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let max_tokens = match non_empty("OPENAI_MAX_TOKENS") {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("OPENAI_MAX_TOKENS is not a number: '{}'", raw))?,
            None => DEFAULT_MAX_TOKENS,
        };

        let endpoint =
            non_empty("ALERT_API_ENDPOINT").unwrap_or_else(|| DEFAULT_ALERT_ENDPOINT.to_string());
        let timeout = match non_empty("ALERT_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("ALERT_TIMEOUT_SECS is not a number: '{}'", raw))?;
                if secs == 0 {
                    anyhow::bail!("ALERT_TIMEOUT_SECS must be at least 1");
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_ALERT_TIMEOUT,
        };

        Ok(Self {
            llm: LlmSettings {
                api_key,
                model,
                api_base: non_empty("OPENAI_API_BASE"),
                max_tokens,
            },
            alert: AlertSettings { endpoint, timeout },
        })
    }
}
