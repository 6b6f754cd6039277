//! Values published to observers of a broadcast session

use crate::error::{AppError, AppResult, ErrorKind};
use std::sync::atomic::{AtomicBool, Ordering};

/// Outcome of one remote call, observed as `Loading` followed by one terminal value
#[derive(Debug, Clone)]
pub enum Resource<T> {
    Loading,
    Success(T),
    Error(AppError),
}

impl<T> From<AppResult<T>> for Resource<T> {
    fn from(result: AppResult<T>) -> Self {
        match result {
            Ok(value) => Resource::Success(value),
            Err(e) => Resource::Error(e),
        }
    }
}

/// A published value that should trigger a UI action at most once.
///
/// Observers call [`Notification::content_if_not_handled`]; the first call wins,
/// later calls (e.g. a re-subscribed observer after a restart) get `None`.
#[derive(Debug)]
pub struct Notification<T> {
    content: T,
    handled: AtomicBool,
}

impl<T> Notification<T> {
    pub fn new(content: T) -> Self {
        Self {
            content,
            handled: AtomicBool::new(false),
        }
    }

    /// A notification that is already consumed, used for initial channel values
    pub fn handled(content: T) -> Self {
        Self {
            content,
            handled: AtomicBool::new(true),
        }
    }

    pub fn content_if_not_handled(&self) -> Option<&T> {
        if self.handled.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(&self.content)
        }
    }

    /// Read the content regardless of the consumed flag
    pub fn peek_content(&self) -> &T {
        &self.content
    }
}

/// Progress of `prepare_stream` as seen by the preparation screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrepareState {
    Idle,
    Loading,
    /// Channel connected; the caller should release the camera preview
    StopPreview,
    /// Session is live; the caller moves on to the broadcast screen
    Ready,
    Error { kind: ErrorKind, message: String },
}

impl PrepareState {
    pub fn is_error(&self) -> bool {
        matches!(self, PrepareState::Error { .. })
    }
}

/// State of the running broadcast as seen by the live screen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoStreamState {
    Idle,
    Loading,
    Streaming,
    Error { kind: ErrorKind, message: String },
    /// Terminal: the stream was completed and the session cleared
    Ended,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_is_consumed_once() {
        let notification = Notification::new(PrepareState::Ready);
        assert_eq!(notification.content_if_not_handled(), Some(&PrepareState::Ready));
        assert_eq!(notification.content_if_not_handled(), None);
        assert_eq!(notification.peek_content(), &PrepareState::Ready);
    }

    #[test]
    fn test_initial_notification_is_already_handled() {
        let notification = Notification::handled(VideoStreamState::Idle);
        assert_eq!(notification.content_if_not_handled(), None);
    }

    #[test]
    fn test_resource_from_result() {
        let ok: Resource<u8> = Ok(1).into();
        assert!(matches!(ok, Resource::Success(1)));

        let err: Resource<u8> = Err(AppError::Validation("title".into())).into();
        assert!(matches!(err, Resource::Error(AppError::Validation(_))));
    }
}
