//! Shared fakes for the session controller integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use broadcast_session::config::SessionConfig;
use broadcast_session::error::{AppError, AppResult};
use broadcast_session::identity::StaticIdentity;
use broadcast_session::models::{
    ChatRoomRequest, MessageModel, PrepareState, Product, PushLinks, StreamResponse,
    StreamStatus, StreamSummary, TranslationLinks, VideoStreamState,
};
use broadcast_session::services::chat::{
    ChannelLink, ChannelState, ChatChannelConnector, ChatTransport, InboundFrame,
};
use broadcast_session::services::error_catalog::DefaultErrorCatalog;
use broadcast_session::services::stream_api::{StatusTransitionClient, StreamGateway};
use broadcast_session::{SessionController, SessionHandle};
use parking_lot::Mutex;
use resilience::{BackoffConfig, RemoteCallConfig, TimeoutConfig};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

pub const STREAM_ID: &str = "42";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    FetchList,
    FetchStream(String),
    CreateLink(String),
    ChangeStatus(String, StreamStatus),
    OpenRoom(String),
    CloseRoom(String),
}

pub fn usable_links() -> TranslationLinks {
    TranslationLinks {
        push: PushLinks {
            rtmp: Some("rtmp://ingest.test/live/42".into()),
            rtmps: None,
        },
        ..Default::default()
    }
}

pub fn empty_links() -> TranslationLinks {
    TranslationLinks {
        push: PushLinks {
            rtmp: Some(String::new()),
            rtmps: None,
        },
        ..Default::default()
    }
}

pub fn product(id: i64, name: &str) -> Product {
    Product {
        id,
        name: name.to_string(),
        price: 10.0,
        discount_price: None,
        image_url: None,
    }
}

/// Gateway that records every call in order and answers from its script
pub struct RecordingGateway {
    calls: Mutex<Vec<Call>>,
    stream_links: Mutex<Option<TranslationLinks>>,
    created_links: Mutex<TranslationLinks>,
    products: Mutex<Vec<Product>>,
    remote_status: Mutex<StreamStatus>,
    failures: Mutex<HashMap<&'static str, AppError>>,
}

impl Default for RecordingGateway {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            stream_links: Mutex::new(Some(usable_links())),
            created_links: Mutex::new(usable_links()),
            products: Mutex::new(vec![product(100, "Lamp"), product(200, "Chair")]),
            remote_status: Mutex::new(StreamStatus::Planned),
            failures: Mutex::new(HashMap::new()),
        }
    }
}

impl RecordingGateway {
    pub fn with_stream_links(self, links: Option<TranslationLinks>) -> Self {
        *self.stream_links.lock() = links;
        self
    }

    pub fn with_created_links(self, links: TranslationLinks) -> Self {
        *self.created_links.lock() = links;
        self
    }

    /// Status reported by `fetch_stream_data`
    pub fn with_remote_status(self, status: StreamStatus) -> Self {
        *self.remote_status.lock() = status;
        self
    }

    /// Make `operation` (gateway method name) fail with `error`
    pub fn failing(self, operation: &'static str, error: AppError) -> Self {
        self.failures.lock().insert(operation, error);
        self
    }

    /// Let every operation succeed from now on
    pub fn recover(&self) {
        self.failures.lock().clear();
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls.lock().iter().filter(|c| *c == call).count()
    }

    fn record(&self, operation: &'static str, call: Call) -> AppResult<()> {
        self.calls.lock().push(call);
        match self.failures.lock().get(operation) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StreamGateway for RecordingGateway {
    async fn fetch_stream_list(&self, _app_id: &str, _streamer_id: &str) -> AppResult<Vec<StreamSummary>> {
        self.record("fetch_stream_list", Call::FetchList)?;
        Ok(Vec::new())
    }

    async fn fetch_stream_data(&self, _auth: &str, stream_id: &str) -> AppResult<StreamResponse> {
        self.record("fetch_stream_data", Call::FetchStream(stream_id.to_string()))?;
        Ok(StreamResponse {
            id: stream_id.to_string(),
            title: Some("Evening sale".into()),
            status: *self.remote_status.lock(),
            translation_links: self.stream_links.lock().clone(),
            products: self.products.lock().clone(),
        })
    }

    async fn create_stream_link(&self, _auth: &str, stream_id: &str) -> AppResult<TranslationLinks> {
        self.record("create_stream_link", Call::CreateLink(stream_id.to_string()))?;
        Ok(self.created_links.lock().clone())
    }

    async fn change_stream_status(&self, _auth: &str, stream_id: &str, status: StreamStatus) -> AppResult<()> {
        self.record(
            "change_stream_status",
            Call::ChangeStatus(stream_id.to_string(), status),
        )
    }

    async fn open_chat_room(&self, _auth: &str, request: &ChatRoomRequest) -> AppResult<()> {
        self.record("open_chat_room", Call::OpenRoom(request.stream_id.clone()))
    }

    async fn close_chat_room(&self, _auth: &str, request: &ChatRoomRequest) -> AppResult<()> {
        self.record("close_chat_room", Call::CloseRoom(request.stream_id.clone()))
    }
}

struct RemoteEnd {
    sent: mpsc::UnboundedReceiver<String>,
    inbound: mpsc::UnboundedSender<InboundFrame>,
}

/// Chat transport whose remote side is driven by the test
#[derive(Default)]
pub struct ScriptedTransport {
    opens: AtomicUsize,
    refuse_remaining: AtomicUsize,
    refuse_all: AtomicBool,
    ends: Mutex<Vec<RemoteEnd>>,
}

impl ScriptedTransport {
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn refuse_next(&self, count: usize) {
        self.refuse_remaining.store(count, Ordering::SeqCst);
    }

    pub fn refuse_all(&self) {
        self.refuse_all.store(true, Ordering::SeqCst);
    }

    /// Deliver a text frame on the most recent link
    pub fn push(&self, payload: &str) -> bool {
        match self.ends.lock().last() {
            Some(end) => end.inbound.send(InboundFrame::Text(payload.to_string())).is_ok(),
            None => false,
        }
    }

    pub fn close_remote(&self) {
        if let Some(end) = self.ends.lock().last() {
            let _ = end.inbound.send(InboundFrame::Closed);
        }
    }

    /// Whether the connector still holds the most recent link
    pub fn latest_link_open(&self) -> bool {
        self.ends
            .lock()
            .last()
            .map(|end| !end.inbound.is_closed())
            .unwrap_or(false)
    }

    /// Drain every frame the connector sent so far, across all links
    pub fn sent_frames(&self) -> Vec<serde_json::Value> {
        let mut frames = Vec::new();
        for end in self.ends.lock().iter_mut() {
            while let Ok(raw) = end.sent.try_recv() {
                if let Ok(frame) = serde_json::from_str(&raw) {
                    frames.push(frame);
                }
            }
        }
        frames
    }
}

#[async_trait]
impl ChatTransport for ScriptedTransport {
    async fn open(&self, _session_id: &str) -> AppResult<ChannelLink> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.refuse_all.load(Ordering::SeqCst) {
            return Err(AppError::Channel("connection refused".into()));
        }
        let refused = self
            .refuse_remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(AppError::Channel("connection refused".into()));
        }

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        self.ends.lock().push(RemoteEnd {
            sent: outbound_rx,
            inbound: inbound_tx,
        });
        Ok(ChannelLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}

pub fn test_backoff() -> BackoffConfig {
    BackoffConfig {
        max_attempts: 3,
        initial_backoff: Duration::from_millis(100),
        max_backoff: Duration::from_secs(1),
        backoff_multiplier: 2.0,
        jitter: false,
    }
}

pub fn signed_in() -> StaticIdentity {
    StaticIdentity::new("u-1", "secret", "Basic dS0xOnNlY3JldA==", "shop")
}

pub struct Harness {
    pub gateway: Arc<RecordingGateway>,
    pub transport: Arc<ScriptedTransport>,
    pub session: SessionHandle,
    pub task: JoinHandle<()>,
}

impl Harness {
    pub fn start(gateway: RecordingGateway) -> Self {
        Self::start_with(gateway, signed_in())
    }

    pub fn start_with(gateway: RecordingGateway, identity: StaticIdentity) -> Self {
        let gateway = Arc::new(gateway);
        let transport = Arc::new(ScriptedTransport::default());
        let identity = Arc::new(identity);

        let client = StatusTransitionClient::new(
            gateway.clone(),
            RemoteCallConfig {
                timeout: TimeoutConfig::from_millis(5_000),
            },
        );
        let channel =
            ChatChannelConnector::new(transport.clone(), identity.clone(), Duration::from_secs(5));
        let controller = SessionController::new(
            client,
            channel,
            identity,
            Arc::new(DefaultErrorCatalog),
            SessionConfig::default(),
            test_backoff(),
        );
        let (session, task) = controller.spawn();

        Self {
            gateway,
            transport,
            session,
            task,
        }
    }

    /// Prepare the default stream and wait past the preview delay
    pub async fn go_live(&self) {
        self.session
            .prepare_stream(STREAM_ID)
            .expect("controller running");
        advance(Duration::from_secs(2)).await;
        assert_eq!(self.prepare_state(), PrepareState::Ready);
    }

    pub fn prepare_state(&self) -> PrepareState {
        self.session.prepare_state().borrow().peek_content().clone()
    }

    pub fn video_state(&self) -> VideoStreamState {
        self.session.video_state().borrow().peek_content().clone()
    }

    pub fn channel_state(&self) -> ChannelState {
        *self.session.channel_state().borrow()
    }

    pub fn messages(&self) -> Vec<MessageModel> {
        self.session.messages().borrow().as_ref().clone()
    }

    pub fn viewer_count(&self) -> u32 {
        *self.session.viewer_count().borrow()
    }

    pub fn highlights(&self) -> Vec<String> {
        self.transport
            .sent_frames()
            .into_iter()
            .filter(|frame| frame["event"] == "highlight_product")
            .filter_map(|frame| frame["data"]["productId"].as_str().map(str::to_string))
            .collect()
    }
}

/// Let every task run, moving the paused clock forward by `by`
pub async fn advance(by: Duration) {
    tokio::time::sleep(by).await;
}

/// Let every task run without crossing any controller timer
pub async fn settle() {
    advance(Duration::from_millis(10)).await;
}
