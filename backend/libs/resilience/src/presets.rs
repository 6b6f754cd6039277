/// Preset configurations for the broadcaster's remote dependencies
use crate::backoff::BackoffConfig;
use crate::timeout::TimeoutConfig;
use std::time::Duration;

/// Configuration bundle for request/response remote calls
#[derive(Debug, Clone)]
pub struct RemoteCallConfig {
    pub timeout: TimeoutConfig,
}

/// Configuration bundle for the long-lived chat channel
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub connect_timeout: TimeoutConfig,
    pub reconnect: BackoffConfig,
}

/// Stream lifecycle REST API
///
/// - Timeout: 15s (status changes can be slow while the ingest is provisioned)
/// - No retry (status changes are not idempotent on the remote side)
pub fn remote_api_config() -> RemoteCallConfig {
    RemoteCallConfig {
        timeout: TimeoutConfig {
            duration: Duration::from_secs(15),
        },
    }
}

/// Chat channel (WebSocket)
///
/// - Connect timeout: 10s
/// - Reconnect: 5 attempts, 500ms initial, capped at 30s, with jitter
pub fn chat_channel_config() -> ChannelConfig {
    ChannelConfig {
        connect_timeout: TimeoutConfig {
            duration: Duration::from_secs(10),
        },
        reconnect: BackoffConfig {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            jitter: true,
        },
    }
}
