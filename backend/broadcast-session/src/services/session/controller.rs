/// Session Controller
///
/// Runs as one task that owns the [`StreamSession`]. Commands from
/// [`SessionHandle`]s, chat channel notifications and timers are merged in a
/// single `select!` loop, so session fields are only ever mutated sequentially.
///
/// Timers (preview release, reconnect backoff, finish settle) are deadlines
/// inside the loop; channel events keep merging while they are pending.
use super::handle::{Command, SessionHandle};
use super::publisher::SessionPublisher;
use crate::config::SessionConfig;
use crate::error::{AppError, AppResult, ErrorKind};
use crate::identity::IdentityProvider;
use crate::models::{
    ChannelEvent, ChatRoomRequest, PrepareState, Product, Resource, StreamSession,
    StreamStatus, VideoStreamState,
};
use crate::services::chat::{ChannelNotification, ChannelState, ChatChannelConnector};
use crate::services::error_catalog::ErrorCatalog;
use crate::services::stream_api::client::terminal;
use crate::services::stream_api::{ResourceStream, StatusTransitionClient};
use futures::StreamExt;
use resilience::BackoffConfig;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

/// Remote step a failure happened in; decides the user-facing error kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    FetchStream,
    CreateLink,
    GoOnline,
    OpenChatRoom,
    Complete,
}

impl Step {
    fn error_kind(self, error: &AppError) -> ErrorKind {
        match (self, error.kind()) {
            (_, ErrorKind::NotAuthenticated) => ErrorKind::NotAuthenticated,
            (Step::CreateLink, _) => ErrorKind::CreateLink,
            (Step::GoOnline | Step::Complete, _) => ErrorKind::ChangeStreamStatus,
            (Step::FetchStream | Step::OpenChatRoom, kind) => kind,
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => futures::future::pending::<()>().await,
    }
}

pub struct SessionController {
    client: StatusTransitionClient,
    connector: ChatChannelConnector,
    notifications: Option<mpsc::UnboundedReceiver<ChannelNotification>>,
    identity: Arc<dyn IdentityProvider>,
    catalog: Arc<dyn ErrorCatalog>,
    config: SessionConfig,
    reconnect: BackoffConfig,
    publisher: SessionPublisher,

    session: Option<StreamSession>,
    /// Last known connectivity; assumed up until told otherwise
    is_connected: bool,
    /// `Ready` was published for the current session
    live: bool,
    /// The last channel drop was a fault, not a requested disconnect
    channel_faulted: bool,
    reconnect_attempt: u32,

    ready_at: Option<Instant>,
    reconnect_at: Option<Instant>,
    ended_at: Option<Instant>,

    torn_down: bool,
}

impl SessionController {
    /// Build a controller around its single chat connector.
    ///
    /// `channel` is the pair returned by [`ChatChannelConnector::new`]; taking the
    /// receiver here makes the controller the only consumer of channel events.
    pub fn new(
        client: StatusTransitionClient,
        channel: (ChatChannelConnector, mpsc::UnboundedReceiver<ChannelNotification>),
        identity: Arc<dyn IdentityProvider>,
        catalog: Arc<dyn ErrorCatalog>,
        config: SessionConfig,
        reconnect: BackoffConfig,
    ) -> Self {
        let (connector, notifications) = channel;
        Self {
            client,
            connector,
            notifications: Some(notifications),
            identity,
            catalog,
            config,
            reconnect,
            publisher: SessionPublisher::new(),
            session: None,
            is_connected: true,
            live: false,
            channel_faulted: false,
            reconnect_attempt: 0,
            ready_at: None,
            reconnect_at: None,
            ended_at: None,
            torn_down: false,
        }
    }

    /// Start the controller task
    pub fn spawn(self) -> (SessionHandle, JoinHandle<()>) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let handle = SessionHandle::new(commands_tx, self.publisher.observers());
        let task = tokio::spawn(self.run(commands_rx));
        (handle, task)
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        let Some(mut notifications) = self.notifications.take() else {
            error!("Session controller started without a channel receiver");
            return;
        };
        info!("Session controller started");

        loop {
            let ready_at = self.ready_at;
            let reconnect_at = self.reconnect_at;
            let ended_at = self.ended_at;

            tokio::select! {
                biased;

                Some(notification) = notifications.recv() => {
                    self.on_channel_notification(notification);
                }
                command = commands.recv() => match command {
                    Some(command) => {
                        if !self.handle(command).await {
                            break;
                        }
                    }
                    None => {
                        info!("All session handles dropped");
                        let _ = self.begin_teardown();
                        break;
                    }
                },
                _ = wait_until(ready_at) => self.on_preview_released(),
                _ = wait_until(reconnect_at) => self.on_reconnect_due(),
                _ = wait_until(ended_at) => self.on_settled(),
            }
        }

        info!("Session controller stopped");
    }

    /// Returns `false` once the controller should stop
    async fn handle(&mut self, command: Command) -> bool {
        debug!(?command, "Session command");
        match command {
            Command::PrepareStream(stream_id) => self.prepare_stream(stream_id).await,
            Command::ConnectivityChanged(is_up) => self.on_connectivity_changed(is_up),
            Command::FinishStream => self.finish_stream().await,
            Command::SelectProduct(position) => self.select_product(position),
            Command::StreamingStarted => self.on_streaming_started(),
            Command::StreamingFailed => self.on_streaming_failed().await,
            Command::DevicePrepareFailed => self.fail_prepare(ErrorKind::UnsupportedDevice),
            Command::RequestStreamLinks => self.request_stream_links(),
            Command::RequestProducts => self.publisher.products(self.products()),
            Command::ClearVideoState => self.publisher.video(VideoStreamState::Idle),
            Command::Shutdown(ack) => {
                if let Some(cleanup) = self.begin_teardown() {
                    if let Err(e) = cleanup.await {
                        warn!(error = %e, "Session cleanup task failed");
                    }
                }
                let _ = ack.send(());
                return false;
            }
        }
        true
    }

    // ---- helpers ----

    fn active_session_id(&self) -> Option<String> {
        self.session
            .as_ref()
            .filter(|session| session.is_active())
            .map(|session| session.id.clone())
    }

    /// Session this controller moved to `Online`, whether or not its chat room opened
    fn online_session(&self) -> Option<&StreamSession> {
        self.session
            .as_ref()
            .filter(|session| session.status == StreamStatus::Online)
    }

    fn is_active(&self) -> bool {
        self.session.as_ref().map(StreamSession::is_active).unwrap_or(false)
    }

    fn products(&self) -> &[Product] {
        self.session
            .as_ref()
            .map(|session| session.products.as_slice())
            .unwrap_or(&[])
    }

    fn chat_room_request(&self, stream_id: &str) -> ChatRoomRequest {
        ChatRoomRequest {
            user_id: self.identity.user_id(),
            stream_id: stream_id.to_string(),
            application: self.identity.application(),
        }
    }

    fn describe(&self, kind: ErrorKind) -> String {
        self.catalog.describe(kind).description
    }

    fn fail_prepare(&self, kind: ErrorKind) {
        self.publisher.prepare(PrepareState::Error {
            kind,
            message: self.describe(kind),
        });
    }

    fn fail_video(&self, kind: ErrorKind) {
        self.publisher.video(VideoStreamState::Error {
            kind,
            message: self.describe(kind),
        });
    }

    fn fail_step(&self, step: Step, error: &AppError) {
        let kind = step.error_kind(error);
        warn!(?step, error = %error, code = kind.code(), "Session step failed");
        self.fail_prepare(kind);
    }

    /// Drain a remote call, mirroring `Loading` onto the prepare state
    async fn observe<T>(&self, mut resources: ResourceStream<T>) -> AppResult<T> {
        while let Some(resource) = resources.next().await {
            match resource {
                Resource::Loading => self.publisher.prepare(PrepareState::Loading),
                Resource::Success(value) => return Ok(value),
                Resource::Error(e) => return Err(e),
            }
        }
        Err(AppError::Network("remote call produced no result".to_string()))
    }

    // ---- prepare ----

    async fn prepare_stream(&mut self, stream_id: String) {
        if self.is_active() {
            warn!(stream_id = %stream_id, "A stream is already live, prepare ignored");
            return;
        }
        if !self.identity.is_authenticated() {
            warn!(stream_id = %stream_id, "Refusing to prepare without an identity");
            self.fail_prepare(ErrorKind::NotAuthenticated);
            return;
        }

        info!(stream_id = %stream_id, "Preparing stream");
        if self.ended_at.is_some() {
            self.on_settled();
        }
        self.connector.disconnect();
        self.live = false;
        self.channel_faulted = false;
        self.reconnect_attempt = 0;
        self.ready_at = None;
        self.reconnect_at = None;
        self.session = Some(StreamSession::new(stream_id.as_str()));

        let auth = self.identity.basic_token();
        let response = match self
            .observe(self.client.fetch_stream_data(&auth, &stream_id))
            .await
        {
            Ok(response) => response,
            Err(e) => return self.fail_step(Step::FetchStream, &e),
        };

        let needs_links = match self.session.as_mut() {
            Some(session) => {
                session.apply(response);
                if session.remote_status != StreamStatus::Planned {
                    debug!(
                        stream_id = %stream_id,
                        remote_status = %session.remote_status,
                        "Remote already past planned"
                    );
                }
                self.publisher.products(&session.products);
                self.publisher.links(session.links.clone());
                session.needs_links()
            }
            None => return,
        };

        if needs_links {
            debug!(stream_id = %stream_id, "No usable push endpoint, creating stream link");
            let links = match self
                .observe(self.client.create_stream_link(&auth, &stream_id))
                .await
            {
                Ok(links) => links,
                Err(e) => return self.fail_step(Step::CreateLink, &e),
            };

            let usable = links.has_push_endpoint();
            if let Some(session) = self.session.as_mut() {
                session.links = Some(links.clone());
            }
            self.publisher.links(Some(links));

            if !usable {
                warn!(stream_id = %stream_id, "Created stream link has no push endpoint");
                self.fail_prepare(ErrorKind::CreateLink);
                return;
            }
        }

        self.transition_to_online(&stream_id).await;
    }

    /// Status change, then chat room, then channel; a failing step stops the chain
    async fn transition_to_online(&mut self, stream_id: &str) {
        let auth = self.identity.basic_token();

        if let Err(e) = self
            .observe(self.client.change_stream_status(&auth, stream_id, StreamStatus::Online))
            .await
        {
            return self.fail_step(Step::GoOnline, &e);
        }
        if let Some(session) = self.session.as_mut() {
            session.status = StreamStatus::Online;
        }
        info!(stream_id = %stream_id, "Stream is online");

        let request = self.chat_room_request(stream_id);
        if let Err(e) = self.observe(self.client.open_chat_room(&auth, request)).await {
            return self.fail_step(Step::OpenChatRoom, &e);
        }
        if let Some(session) = self.session.as_mut() {
            session.chat_room_open = true;
        }

        if self.is_connected {
            self.connector.connect(stream_id);
        } else {
            info!(stream_id = %stream_id, "Offline, chat channel connect deferred");
        }
    }

    // ---- channel ----

    fn on_channel_notification(&mut self, notification: ChannelNotification) {
        match notification {
            ChannelNotification::State(state) => self.on_channel_state(state),
            ChannelNotification::Message(event) => self.on_channel_event(event),
        }
    }

    fn on_channel_state(&mut self, state: ChannelState) {
        self.publisher.channel(state);
        match state {
            ChannelState::Connecting => {
                if !self.live {
                    self.publisher.prepare(PrepareState::Loading);
                }
            }
            ChannelState::Connected => {
                self.reconnect_attempt = 0;
                self.channel_faulted = false;
                if self.is_active() && !self.live && self.ready_at.is_none() {
                    self.publisher.prepare(PrepareState::StopPreview);
                    self.ready_at = Some(Instant::now() + self.config.preview_stop_delay);
                }
            }
            ChannelState::Error => self.channel_faulted = true,
            ChannelState::Disconnected => {
                if std::mem::take(&mut self.channel_faulted) {
                    self.schedule_reconnect();
                }
            }
        }
    }

    fn on_channel_event(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Empty => {}
            ChannelEvent::NewViewer { count } => self.publisher.viewers(count),
            ChannelEvent::NewMessages { messages } => self.publisher.append_messages(messages),
        }
    }

    fn schedule_reconnect(&mut self) {
        if !self.is_active() || !self.is_connected {
            debug!("Channel dropped while inactive or offline, no reconnect");
            return;
        }

        self.reconnect_attempt += 1;
        if self.reconnect.is_exhausted(self.reconnect_attempt) {
            error!(
                attempts = self.reconnect_attempt - 1,
                "Chat channel could not be recovered"
            );
            if self.live {
                self.fail_video(ErrorKind::Channel);
            } else {
                self.fail_prepare(ErrorKind::Channel);
            }
            return;
        }

        let delay = self.reconnect.delay_for_attempt(self.reconnect_attempt);
        info!(
            attempt = self.reconnect_attempt,
            delay_ms = delay.as_millis() as u64,
            "Scheduling chat channel reconnect"
        );
        self.reconnect_at = Some(Instant::now() + delay);
    }

    fn on_reconnect_due(&mut self) {
        self.reconnect_at = None;
        self.reconnect_channel();
    }

    /// Connect again when live, online and the channel is idle
    fn reconnect_channel(&mut self) -> bool {
        match self.active_session_id() {
            Some(stream_id)
                if self.is_connected && self.connector.state() == ChannelState::Disconnected =>
            {
                self.connector.connect(&stream_id)
            }
            _ => false,
        }
    }

    fn on_preview_released(&mut self) {
        self.ready_at = None;
        if self.is_active() {
            self.live = true;
            self.publisher.prepare(PrepareState::Ready);
        }
    }

    // ---- connectivity and encoder signals ----

    fn on_connectivity_changed(&mut self, is_up: bool) {
        let was_up = std::mem::replace(&mut self.is_connected, is_up);
        info!(is_up, was_up, "Connectivity changed");
        if !self.is_active() {
            return;
        }

        if !is_up {
            self.reconnect_at = None;
            self.channel_faulted = false;
            self.connector.disconnect();
        } else if !was_up {
            self.reconnect_attempt = 0;
            self.reconnect_channel();
        }
    }

    fn on_streaming_started(&self) {
        if !self.is_active() {
            debug!("Encoder started without a live stream");
        }
        self.publisher.video(VideoStreamState::Streaming);
    }

    async fn on_streaming_failed(&mut self) {
        warn!("Encoder reported a push failure");
        self.reconnect_at = None;
        self.channel_faulted = false;
        self.connector.disconnect();
        if self.is_connected {
            self.fail_video(ErrorKind::Default);
            self.finish_stream().await;
        }
    }

    // ---- products and links ----

    fn select_product(&self, position: i64) {
        let product = usize::try_from(position)
            .ok()
            .and_then(|index| self.products().get(index));
        match product {
            Some(product) => {
                if !self.connector.highlight(&product.id.to_string()) {
                    debug!(product_id = product.id, "Channel not connected, highlight dropped");
                }
            }
            None => debug!(position, "Product position out of range"),
        }
    }

    fn request_stream_links(&self) {
        match self.session.as_ref().and_then(|session| session.links.clone()) {
            Some(links) => self.publisher.links(Some(links)),
            None => self.fail_video(ErrorKind::CreateLink),
        }
    }

    // ---- finish and teardown ----

    /// Completes a stream this controller took online, even if its chat room
    /// never opened; the room is only closed when it was opened.
    async fn finish_stream(&mut self) {
        let Some((stream_id, room_open)) = self
            .online_session()
            .map(|session| (session.id.clone(), session.chat_room_open))
        else {
            debug!("No live stream to finish");
            return;
        };
        info!(stream_id = %stream_id, room_open, "Finishing stream");

        if let Some(session) = self.session.as_mut() {
            session.status = StreamStatus::Completed;
        }
        self.ready_at = None;
        self.reconnect_at = None;
        self.channel_faulted = false;
        self.connector.disconnect();
        self.publisher.video(VideoStreamState::Loading);

        let auth = self.identity.basic_token();
        if room_open {
            let request = self.chat_room_request(&stream_id);
            if let Err(e) = terminal(self.client.close_chat_room(&auth, request)).await {
                warn!(stream_id = %stream_id, error = %e, "Failed to close chat room");
            }
        }
        if let Err(e) = terminal(self.client.change_stream_status(
            &auth,
            &stream_id,
            StreamStatus::Completed,
        ))
        .await
        {
            warn!(stream_id = %stream_id, error = %e, "Failed to complete stream");
            self.fail_video(Step::Complete.error_kind(&e));
        }

        self.session = None;
        self.live = false;
        self.publisher.links(None);
        self.ended_at = Some(Instant::now() + self.config.finish_settle_delay);
    }

    fn on_settled(&mut self) {
        self.ended_at = None;
        self.publisher.video(VideoStreamState::Ended);
        self.publisher.clear_messages();
        info!("Stream ended");
    }

    /// Disconnect now and run the remote cleanup on a detached task.
    ///
    /// Only what this session changed remotely is undone: the chat room when it
    /// was opened, the status when it was moved online. The calls run on their
    /// own task so dropping the controller cannot cancel them.
    fn begin_teardown(&mut self) -> Option<JoinHandle<()>> {
        if self.torn_down {
            return None;
        }
        self.torn_down = true;
        self.ready_at = None;
        self.reconnect_at = None;
        self.connector.disconnect();

        let session = self
            .session
            .take()
            .filter(|session| session.status == StreamStatus::Online)?;
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!(stream_id = %session.id, "No runtime left, remote cleanup skipped");
                return None;
            }
        };

        let client = self.client.clone();
        let auth = self.identity.basic_token();
        let request = self.chat_room_request(&session.id);
        info!(stream_id = %session.id, "Tearing down session");

        Some(runtime.spawn(async move {
            if session.chat_room_open {
                if let Err(e) = terminal(client.close_chat_room(&auth, request)).await {
                    warn!(stream_id = %session.id, error = %e, "Teardown: chat room close failed");
                }
            }
            if let Err(e) = terminal(client.change_stream_status(
                &auth,
                &session.id,
                StreamStatus::Completed,
            ))
            .await
            {
                warn!(stream_id = %session.id, error = %e, "Teardown: status change failed");
            }
            debug!(stream_id = %session.id, "Teardown finished");
        }))
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if !self.torn_down {
            debug!("Session controller dropped");
            let _ = self.begin_teardown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_maps_to_user_kind() {
        let network = AppError::Network("down".into());
        assert_eq!(Step::FetchStream.error_kind(&network), ErrorKind::Network);
        assert_eq!(Step::CreateLink.error_kind(&network), ErrorKind::CreateLink);
        assert_eq!(Step::GoOnline.error_kind(&network), ErrorKind::ChangeStreamStatus);
        assert_eq!(Step::Complete.error_kind(&network), ErrorKind::ChangeStreamStatus);

        let validation = AppError::Validation("bad".into());
        assert_eq!(Step::OpenChatRoom.error_kind(&validation), ErrorKind::Validation);
    }

    #[test]
    fn test_not_authenticated_wins_over_step() {
        let error = AppError::NotAuthenticated;
        assert_eq!(Step::CreateLink.error_kind(&error), ErrorKind::NotAuthenticated);
        assert_eq!(Step::GoOnline.error_kind(&error), ErrorKind::NotAuthenticated);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_none_never_fires() {
        let fired = tokio::time::timeout(std::time::Duration::from_secs(3600), wait_until(None)).await;
        assert!(fired.is_err());
    }
}
