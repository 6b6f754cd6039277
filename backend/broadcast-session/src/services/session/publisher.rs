use crate::models::{
    MessageModel, Notification, PrepareState, Product, TranslationLinks, VideoStreamState,
};
use crate::services::chat::ChannelState;
use std::sync::Arc;
use tokio::sync::watch;

/// One watch channel per published field.
///
/// Prepare and video state are wrapped in [`Notification`] so a re-subscribed
/// observer does not replay a one-shot UI action. The other fields are plain
/// last-value state.
///
/// Only the controller owns the senders. When it stops they are dropped and
/// every observer's `changed()` returns an error.
pub struct SessionPublisher {
    prepare_state: watch::Sender<Arc<Notification<PrepareState>>>,
    video_state: watch::Sender<Arc<Notification<VideoStreamState>>>,
    messages: watch::Sender<Arc<Vec<MessageModel>>>,
    viewer_count: watch::Sender<u32>,
    links: watch::Sender<Option<TranslationLinks>>,
    products: watch::Sender<Arc<Vec<Product>>>,
    channel_state: watch::Sender<ChannelState>,
}

impl SessionPublisher {
    pub fn new() -> Self {
        Self {
            prepare_state: watch::channel(Arc::new(Notification::handled(PrepareState::Idle))).0,
            video_state: watch::channel(Arc::new(Notification::handled(VideoStreamState::Idle))).0,
            messages: watch::channel(Arc::new(Vec::new())).0,
            viewer_count: watch::channel(0).0,
            links: watch::channel(None).0,
            products: watch::channel(Arc::new(Vec::new())).0,
            channel_state: watch::channel(ChannelState::Disconnected).0,
        }
    }

    pub(crate) fn prepare(&self, state: PrepareState) {
        self.prepare_state.send_replace(Arc::new(Notification::new(state)));
    }

    pub(crate) fn video(&self, state: VideoStreamState) {
        self.video_state.send_replace(Arc::new(Notification::new(state)));
    }

    /// Append to the log in place; the vector is only copied while an
    /// observer still holds a clone of the previous log.
    pub(crate) fn append_messages(&self, messages: Vec<MessageModel>) {
        self.messages
            .send_modify(|log| Arc::make_mut(log).extend(messages));
    }

    pub(crate) fn clear_messages(&self) {
        self.messages.send_replace(Arc::new(Vec::new()));
    }

    pub(crate) fn viewers(&self, count: u32) {
        self.viewer_count.send_replace(count);
    }

    pub(crate) fn links(&self, links: Option<TranslationLinks>) {
        self.links.send_replace(links);
    }

    pub(crate) fn products(&self, products: &[Product]) {
        self.products.send_replace(Arc::new(products.to_vec()));
    }

    pub(crate) fn channel(&self, state: ChannelState) {
        self.channel_state.send_replace(state);
    }

    /// Receivers for handing out; they hold no sender
    pub fn observers(&self) -> SessionObservers {
        SessionObservers {
            prepare_state: self.prepare_state.subscribe(),
            video_state: self.video_state.subscribe(),
            messages: self.messages.subscribe(),
            viewer_count: self.viewer_count.subscribe(),
            links: self.links.subscribe(),
            products: self.products.subscribe(),
            channel_state: self.channel_state.subscribe(),
        }
    }
}

impl Default for SessionPublisher {
    fn default() -> Self {
        Self::new()
    }
}

/// Read side of a [`SessionPublisher`]
#[derive(Clone)]
pub struct SessionObservers {
    prepare_state: watch::Receiver<Arc<Notification<PrepareState>>>,
    video_state: watch::Receiver<Arc<Notification<VideoStreamState>>>,
    messages: watch::Receiver<Arc<Vec<MessageModel>>>,
    viewer_count: watch::Receiver<u32>,
    links: watch::Receiver<Option<TranslationLinks>>,
    products: watch::Receiver<Arc<Vec<Product>>>,
    channel_state: watch::Receiver<ChannelState>,
}

/// Clone `receiver` with its current value marked as seen
fn fresh<T>(receiver: &watch::Receiver<T>) -> watch::Receiver<T> {
    let mut receiver = receiver.clone();
    receiver.borrow_and_update();
    receiver
}

impl SessionObservers {
    pub fn prepare_state(&self) -> watch::Receiver<Arc<Notification<PrepareState>>> {
        fresh(&self.prepare_state)
    }

    pub fn video_state(&self) -> watch::Receiver<Arc<Notification<VideoStreamState>>> {
        fresh(&self.video_state)
    }

    pub fn messages(&self) -> watch::Receiver<Arc<Vec<MessageModel>>> {
        fresh(&self.messages)
    }

    pub fn viewer_count(&self) -> watch::Receiver<u32> {
        fresh(&self.viewer_count)
    }

    pub fn links(&self) -> watch::Receiver<Option<TranslationLinks>> {
        fresh(&self.links)
    }

    pub fn products(&self) -> watch::Receiver<Arc<Vec<Product>>> {
        fresh(&self.products)
    }

    pub fn channel_state(&self) -> watch::Receiver<ChannelState> {
        fresh(&self.channel_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn message(text: &str) -> MessageModel {
        MessageModel {
            sender: "ann".into(),
            text: text.into(),
            timestamp: "12:00".into(),
        }
    }

    #[test]
    fn test_initial_notifications_are_already_handled() {
        let publisher = SessionPublisher::new();
        let observers = publisher.observers();
        assert!(observers.prepare_state().borrow().content_if_not_handled().is_none());
        assert_eq!(*observers.viewer_count().borrow(), 0);
    }

    #[test]
    fn test_each_publish_is_a_fresh_notification() {
        let publisher = SessionPublisher::new();
        let observers = publisher.observers();
        let mut prepare = observers.prepare_state();

        publisher.prepare(PrepareState::Error {
            kind: ErrorKind::Network,
            message: "down".into(),
        });
        assert!(prepare.has_changed().unwrap());
        let current = prepare.borrow_and_update().clone();
        assert!(current.content_if_not_handled().unwrap().is_error());
        assert!(current.content_if_not_handled().is_none());

        // A late subscriber sees the consumed flag
        let late = observers.prepare_state();
        assert!(!late.has_changed().unwrap());
        assert!(late.borrow().content_if_not_handled().is_none());
        assert!(late.borrow().peek_content().is_error());
    }

    #[test]
    fn test_appending_messages_reuses_the_log() {
        let publisher = SessionPublisher::new();
        let mut messages = publisher.observers().messages();

        publisher.append_messages(vec![message("hi")]);
        let first = Arc::as_ptr(&*messages.borrow_and_update());
        publisher.append_messages(vec![message("again"), message("bye")]);

        assert!(messages.has_changed().unwrap());
        let log = messages.borrow_and_update();
        assert_eq!(Arc::as_ptr(&*log), first);
        assert_eq!(log.len(), 3);
        assert_eq!(log[2].text, "bye");
    }

    #[test]
    fn test_held_log_is_not_mutated() {
        let publisher = SessionPublisher::new();
        let messages = publisher.observers().messages();

        publisher.append_messages(vec![message("hi")]);
        let held = messages.borrow().clone();
        publisher.append_messages(vec![message("again")]);

        assert_eq!(held.len(), 1);
        assert_eq!(messages.borrow().len(), 2);

        publisher.clear_messages();
        assert!(messages.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_observers_close_with_publisher() {
        let publisher = SessionPublisher::new();
        let observers = publisher.observers();
        let mut video = observers.video_state();

        drop(publisher);
        assert!(video.changed().await.is_err());
    }
}
