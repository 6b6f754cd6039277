use super::publisher::SessionObservers;
use crate::error::{AppError, AppResult};
use crate::models::{
    MessageModel, Notification, PrepareState, Product, TranslationLinks, VideoStreamState,
};
use crate::services::chat::ChannelState;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};

#[derive(Debug)]
pub(crate) enum Command {
    PrepareStream(String),
    ConnectivityChanged(bool),
    FinishStream,
    SelectProduct(i64),
    StreamingStarted,
    StreamingFailed,
    DevicePrepareFailed,
    RequestStreamLinks,
    RequestProducts,
    ClearVideoState,
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable front of a running [`super::SessionController`].
///
/// Commands are queued and processed in order by the controller task. Once every
/// handle is gone the controller tears the session down. The state receivers
/// close when the controller stops.
#[derive(Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<Command>,
    observers: SessionObservers,
}

impl SessionHandle {
    pub(crate) fn new(
        commands: mpsc::UnboundedSender<Command>,
        observers: SessionObservers,
    ) -> Self {
        Self {
            commands,
            observers,
        }
    }

    fn send(&self, command: Command) -> AppResult<()> {
        self.commands
            .send(command)
            .map_err(|_| AppError::SessionClosed)
    }

    /// Start a broadcast for `stream_id`; progress is published on the prepare state
    pub fn prepare_stream(&self, stream_id: impl Into<String>) -> AppResult<()> {
        self.send(Command::PrepareStream(stream_id.into()))
    }

    pub fn on_connectivity_changed(&self, is_up: bool) -> AppResult<()> {
        self.send(Command::ConnectivityChanged(is_up))
    }

    pub fn finish_stream(&self) -> AppResult<()> {
        self.send(Command::FinishStream)
    }

    /// Highlight the product at `position` in the catalog
    pub fn select_product(&self, position: i64) -> AppResult<()> {
        self.send(Command::SelectProduct(position))
    }

    /// Encoder reported that pushing started
    pub fn on_streaming_started(&self) -> AppResult<()> {
        self.send(Command::StreamingStarted)
    }

    /// Encoder reported a push failure
    pub fn on_streaming_failed(&self) -> AppResult<()> {
        self.send(Command::StreamingFailed)
    }

    pub fn on_device_prepare_failed(&self) -> AppResult<()> {
        self.send(Command::DevicePrepareFailed)
    }

    pub fn request_stream_links(&self) -> AppResult<()> {
        self.send(Command::RequestStreamLinks)
    }

    pub fn request_products(&self) -> AppResult<()> {
        self.send(Command::RequestProducts)
    }

    pub fn clear_video_stream_state(&self) -> AppResult<()> {
        self.send(Command::ClearVideoState)
    }

    /// Tear the session down and wait until the remote cleanup has run
    pub async fn shutdown(&self) -> AppResult<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.send(Command::Shutdown(ack_tx))?;
        ack_rx.await.map_err(|_| AppError::SessionClosed)
    }

    pub fn prepare_state(&self) -> watch::Receiver<Arc<Notification<PrepareState>>> {
        self.observers.prepare_state()
    }

    pub fn video_state(&self) -> watch::Receiver<Arc<Notification<VideoStreamState>>> {
        self.observers.video_state()
    }

    pub fn messages(&self) -> watch::Receiver<Arc<Vec<MessageModel>>> {
        self.observers.messages()
    }

    pub fn viewer_count(&self) -> watch::Receiver<u32> {
        self.observers.viewer_count()
    }

    pub fn links(&self) -> watch::Receiver<Option<TranslationLinks>> {
        self.observers.links()
    }

    pub fn products(&self) -> watch::Receiver<Arc<Vec<Product>>> {
        self.observers.products()
    }

    pub fn channel_state(&self) -> watch::Receiver<ChannelState> {
        self.observers.channel_state()
    }
}
