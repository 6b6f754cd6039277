use crate::error::AppError;
use dotenvy::dotenv;
use resilience::{BackoffConfig, RemoteCallConfig, TimeoutConfig};
use std::env;
use std::time::Duration;

/// Stream API endpoints
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    /// Used instead of `base_url` when `dev_mode` is on
    pub dev_base_url: Option<String>,
    pub dev_mode: bool,
    pub remote: RemoteCallConfig,
}

impl ApiConfig {
    /// Base URL the HTTP gateway should target
    pub fn effective_base_url(&self) -> &str {
        match (&self.dev_base_url, self.dev_mode) {
            (Some(dev), true) => dev.as_str(),
            _ => self.base_url.as_str(),
        }
    }
}

/// Chat channel endpoint and reconnect policy
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub ws_url: String,
    pub connect_timeout: TimeoutConfig,
    pub reconnect: BackoffConfig,
}

/// Session controller timings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Delay between channel connect and the ready notification
    pub preview_stop_delay: Duration,
    /// Delay between teardown and the terminal "ended" notification
    pub finish_settle_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            preview_stop_delay: Duration::from_millis(1000),
            finish_settle_delay: Duration::from_millis(6000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub app_id: String,
    pub api: ApiConfig,
    pub chat: ChatConfig,
    pub session: SessionConfig,
}

impl Config {
    fn parse_bool(value: &str) -> bool {
        value.eq_ignore_ascii_case("true") || value == "1"
    }

    fn parse_u64(name: &str, default: u64) -> Result<u64, AppError> {
        match env::var(name) {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|e| AppError::Config(format!("{name}: {e}"))),
            Err(_) => Ok(default),
        }
    }

    fn millis(timeout: &TimeoutConfig) -> u64 {
        u64::try_from(timeout.duration.as_millis()).unwrap_or(u64::MAX)
    }

    fn required(name: &str) -> Result<String, AppError> {
        env::var(name)
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Config(format!("{name} missing")))
    }

    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let base_url = Self::required("STUDIO_API_BASE_URL")?;
        let dev_base_url = env::var("STUDIO_DEV_API_BASE_URL")
            .ok()
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .filter(|v| !v.is_empty());
        let dev_mode = env::var("STUDIO_DEV_MODE")
            .map(|v| Self::parse_bool(&v))
            .unwrap_or(false);
        let remote = resilience::remote_api_config();
        let request_timeout_ms =
            Self::parse_u64("STUDIO_REQUEST_TIMEOUT_MS", Self::millis(&remote.timeout))?;

        let ws_url = Self::required("STUDIO_CHAT_WS_URL")?;
        let channel = resilience::chat_channel_config();
        let connect_timeout_ms =
            Self::parse_u64("STUDIO_CONNECT_TIMEOUT_MS", Self::millis(&channel.connect_timeout))?;
        let max_attempts = Self::parse_u64(
            "STUDIO_RECONNECT_MAX_ATTEMPTS",
            u64::from(channel.reconnect.max_attempts),
        )?;

        let preview_stop_ms = Self::parse_u64("STUDIO_PREVIEW_STOP_MS", 1_000)?;
        let finish_settle_ms = Self::parse_u64("STUDIO_FINISH_SETTLE_MS", 6_000)?;

        let app_id = env::var("STUDIO_APP_ID").unwrap_or_else(|_| "broadcaster".to_string());

        let mut reconnect = channel.reconnect;
        reconnect.max_attempts = u32::try_from(max_attempts)
            .map_err(|e| AppError::Config(format!("STUDIO_RECONNECT_MAX_ATTEMPTS: {e}")))?;

        Ok(Self {
            app_id,
            api: ApiConfig {
                base_url,
                dev_base_url,
                dev_mode,
                remote: RemoteCallConfig {
                    timeout: TimeoutConfig::from_millis(request_timeout_ms),
                },
            },
            chat: ChatConfig {
                ws_url,
                connect_timeout: TimeoutConfig::from_millis(connect_timeout_ms),
                reconnect,
            },
            session: SessionConfig {
                preview_stop_delay: Duration::from_millis(preview_stop_ms),
                finish_settle_delay: Duration::from_millis(finish_settle_ms),
            },
        })
    }
}
