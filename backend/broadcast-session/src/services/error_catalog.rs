/// User-facing descriptions for error kinds
///
/// The session controller picks an [`ErrorKind`]; the catalog renders the text.
use crate::error::ErrorKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorDescription {
    pub code: &'static str,
    pub description: String,
}

pub trait ErrorCatalog: Send + Sync {
    fn describe(&self, kind: ErrorKind) -> ErrorDescription;
}

/// English catalog used when the host application supplies none
#[derive(Debug, Clone, Default)]
pub struct DefaultErrorCatalog;

impl ErrorCatalog for DefaultErrorCatalog {
    fn describe(&self, kind: ErrorKind) -> ErrorDescription {
        let description = match kind {
            ErrorKind::Default => "Something went wrong. Please try again.",
            ErrorKind::Validation => "Please check your fields and try again.",
            ErrorKind::Network => "Network error. Check your connection and try again.",
            ErrorKind::NotAuthenticated => "You are not signed in. Please log in again.",
            ErrorKind::Channel => "Lost connection to the chat. Viewers may not see new messages.",
            ErrorKind::UnsupportedDevice => "Your device does not support streaming",
            ErrorKind::CreateLink => "Could not create a stream link. Please try again later.",
            ErrorKind::ChangeStreamStatus => "Could not change the stream status.",
        };

        ErrorDescription {
            code: kind.code(),
            description: description.to_string(),
        }
    }
}
