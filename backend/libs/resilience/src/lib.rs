/// Resilience patterns for the broadcaster session core
///
/// This library provides the failure-handling building blocks shared by the
/// remote API client and the chat channel:
/// - **Timeout**: Enforces a finite time limit on every remote call and connect attempt
/// - **Backoff**: Exponential reconnect delays with jitter and an attempt budget
/// - **Preset Configurations**: Pre-tuned settings for the stream API and the chat channel
///
/// # Example: Remote call with timeout
///
/// ```rust,no_run
/// use resilience::{presets, timeout::with_timeout};
///
/// #[tokio::main]
/// async fn main() {
///     let config = presets::remote_api_config();
///
///     let result = with_timeout(
///         config.timeout.duration,
///         async {
///             // Your HTTP request
///             Ok::<_, String>(())
///         }
///     ).await;
/// }
/// ```
///
/// # Example: Reconnect schedule
///
/// ```rust
/// use resilience::presets;
///
/// let config = presets::chat_channel_config();
/// let backoff = config.reconnect;
///
/// // First reconnect attempt waits roughly the initial backoff
/// let delay = backoff.delay_for_attempt(1);
/// assert!(delay <= backoff.max_backoff);
/// assert!(!backoff.is_exhausted(1));
/// ```

pub mod backoff;
pub mod presets;
pub mod timeout;

// Re-export main types for convenience
pub use backoff::BackoffConfig;
pub use presets::{chat_channel_config, remote_api_config, ChannelConfig, RemoteCallConfig};
pub use timeout::{TimeoutConfig, TimeoutError, with_timeout};
