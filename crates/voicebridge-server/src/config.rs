//! Process-wide configuration for the voice bridge server, resolved from
//! environment variables at startup (spec §6).

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub host: String,
    pub port: u16,

    /// Long-lived key for the upstream bootstrap POST.
    pub upstream_api_key: String,
    /// Default model id (agents may override this per-session).
    pub upstream_model: String,
    pub upstream_bootstrap_url: String,
    pub upstream_ws_url: String,

    pub vad_threshold: f32,
    pub silence_duration_ms: u64,
    pub profit_margin_percent: f64,

    pub bus_url: String,
    pub directory_url: String,

    pub idle_timeout_ms: i64,

    pub log_level: String,
}

impl BridgeConfig {
    /// Load configuration from environment variables, applying the spec's
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let upstream_api_key = require_env("UPSTREAM_API_KEY")?;
        let bus_url = require_env("BUS_URL")?;
        let directory_url = require_env("DIRECTORY_URL")?;

        let upstream_model =
            std::env::var("UPSTREAM_MODEL").unwrap_or_else(|_| "gpt-4o-realtime-preview".to_string());

        let vad_threshold = parse_env_or("VAD_THRESHOLD", 0.5)?;
        let silence_duration_ms = parse_env_or("SILENCE_DURATION_MS", 500)?;
        let profit_margin_percent = parse_env_or("PROFIT_MARGIN_PERCENT", 20.0)?;
        let idle_timeout_ms = parse_env_or("IDLE_TIMEOUT_MS", 300_000)?;

        let host = std::env::var("VOICEBRIDGE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_env_or("VOICEBRIDGE_PORT", 8090)?;
        let log_level = std::env::var("VOICEBRIDGE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let upstream_bootstrap_url = std::env::var("UPSTREAM_BOOTSTRAP_URL")
            .unwrap_or_else(|_| "https://api.openai.com/v1/realtime/sessions".to_string());
        let upstream_ws_url = std::env::var("UPSTREAM_WS_URL")
            .unwrap_or_else(|_| "wss://api.openai.com/v1/realtime".to_string());

        Ok(Self {
            host,
            port,
            upstream_api_key,
            upstream_model,
            upstream_bootstrap_url,
            upstream_ws_url,
            vad_threshold,
            silence_duration_ms,
            profit_margin_percent,
            bus_url,
            directory_url,
            idle_timeout_ms,
            log_level,
        })
    }

    /// Margin as a fraction (`PROFIT_MARGIN_PERCENT=20` → `0.20`), the unit
    /// `RateCard` expects.
    pub fn margin_fraction(&self) -> f64 {
        self.profit_margin_percent / 100.0
    }

    pub fn silence_duration(&self) -> Duration {
        Duration::from_millis(self.silence_duration_ms)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(String),
    #[error("invalid value for environment variable {0}: {1}")]
    Invalid(String, String),
}

fn require_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name).map_err(|_| ConfigError::Missing(name.to_string()))
}

fn parse_env_or<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid(name.to_string(), val)),
        Err(_) => Ok(default),
    }
}
