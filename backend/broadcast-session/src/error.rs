use resilience::TimeoutError;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Coarse error kinds. The remote client and the chat connector only ever surface
/// one of these; the session controller maps a kind plus the current step to a
/// user-facing message through the error catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Fallback when nothing more specific applies
    Default,
    /// Remote rejected the request shape or fields
    Validation,
    /// Transport fault, timeout, undecodable response or server error
    Network,
    /// No identity established
    NotAuthenticated,
    /// Transient chat channel fault
    Channel,
    /// Encoder/camera could not be prepared
    UnsupportedDevice,
    /// Link allocation failed or produced no usable push endpoint
    CreateLink,
    /// Remote lifecycle status change was rejected
    ChangeStreamStatus,
}

impl ErrorKind {
    /// Stable code used by the error catalog
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Default => "DEFAULT_ERROR",
            ErrorKind::Validation => "CHECK_YOUR_FIELDS",
            ErrorKind::Network => "NETWORK_ERROR",
            ErrorKind::NotAuthenticated => "NOT_AUTHENTICATED",
            ErrorKind::Channel => "CHANNEL_ERROR",
            ErrorKind::UnsupportedDevice => "UNSUPPORTED_DEVICE",
            ErrorKind::CreateLink => "ERROR_CREATE_LINK",
            ErrorKind::ChangeStreamStatus => "ERROR_CHANGE_STREAM_STATUS",
        }
    }
}

#[derive(Debug, Error, Clone)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("startup failure: {0}")]
    StartUp(String),

    #[error("not authenticated")]
    NotAuthenticated,

    #[error("validation error: {0}")]
    Validation(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("channel error: {0}")]
    Channel(String),

    #[error("session controller is no longer running")]
    SessionClosed,
}

impl From<TimeoutError> for AppError {
    fn from(e: TimeoutError) -> Self {
        AppError::Network(e.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        AppError::Network(e.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for AppError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        AppError::Channel(e.to_string())
    }
}

impl AppError {
    /// Collapse into the coarse kind surfaced to the controller
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::Network(_) => ErrorKind::Network,
            AppError::NotAuthenticated => ErrorKind::NotAuthenticated,
            AppError::Channel(_) => ErrorKind::Channel,
            AppError::Config(_) | AppError::StartUp(_) | AppError::SessionClosed => {
                ErrorKind::Default
            }
        }
    }

    /// Map a non-success HTTP status (or envelope status) to an error
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        match status {
            401 | 403 => AppError::NotAuthenticated,
            400..=499 => AppError::Validation(format!("{} ({})", detail, status)),
            _ => AppError::Network(format!("{} ({})", detail, status)),
        }
    }
}
