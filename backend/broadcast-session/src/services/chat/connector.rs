/// Chat Channel Connector
///
/// State machine over one chat channel:
/// - Disconnected → Connecting on `connect`
/// - Connecting → Connected once the transport acknowledged, then authenticate
/// - Connecting | Connected → Error → Disconnected on any transport failure
/// - any state → Disconnected on `disconnect`
///
/// The connector never reconnects on its own. Notifications go to the single
/// receiver handed out by [`ChatChannelConnector::new`].
use super::parser::parse_channel_payload;
use super::transport::{ChatTransport, InboundFrame, OutboundFrame};
use crate::error::AppError;
use crate::identity::IdentityProvider;
use crate::models::ChannelEvent;
use parking_lot::Mutex;
use resilience::with_timeout;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
    /// Transient: always followed by `Disconnected`
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelNotification {
    State(ChannelState),
    Message(ChannelEvent),
}

struct ConnectorState {
    state: ChannelState,
    /// Bumped on every connect/disconnect so a stale channel task cannot publish
    epoch: u64,
    outbound: Option<mpsc::UnboundedSender<String>>,
    task: Option<JoinHandle<()>>,
}

struct Shared {
    transport: Arc<dyn ChatTransport>,
    identity: Arc<dyn IdentityProvider>,
    connect_timeout: Duration,
    notifications: mpsc::UnboundedSender<ChannelNotification>,
    inner: Mutex<ConnectorState>,
}

impl Shared {
    fn transition(&self, inner: &mut ConnectorState, next: ChannelState) {
        if inner.state == next {
            return;
        }
        debug!("Chat channel state: {:?} → {:?}", inner.state, next);
        inner.state = next;
        let _ = self.notifications.send(ChannelNotification::State(next));
    }

    fn send_frame(&self, inner: &ConnectorState, frame: OutboundFrame) -> bool {
        if inner.state != ChannelState::Connected {
            debug!("Ignoring outbound frame while {:?}: {:?}", inner.state, frame);
            return false;
        }
        match &inner.outbound {
            Some(outbound) => outbound.send(frame.to_json()).is_ok(),
            None => false,
        }
    }

    fn auth_frame(&self) -> OutboundFrame {
        OutboundFrame::Auth {
            user_id: self.identity.user_id(),
            password: self.identity.credential(),
        }
    }

    /// Report a transport failure for the channel opened under `epoch`
    fn fail(&self, epoch: u64, error: AppError) {
        let mut inner = self.inner.lock();
        if inner.epoch != epoch {
            return;
        }
        warn!("Chat channel failed: {}", error);
        inner.outbound = None;
        inner.task = None;
        self.transition(&mut inner, ChannelState::Error);
        self.transition(&mut inner, ChannelState::Disconnected);
    }
}

pub struct ChatChannelConnector {
    shared: Arc<Shared>,
}

impl ChatChannelConnector {
    /// Create a connector and the receiver for its notifications.
    ///
    /// There is exactly one receiver; whoever holds it owns the connector's events.
    pub fn new(
        transport: Arc<dyn ChatTransport>,
        identity: Arc<dyn IdentityProvider>,
        connect_timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<ChannelNotification>) {
        let (notifications, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            transport,
            identity,
            connect_timeout,
            notifications,
            inner: Mutex::new(ConnectorState {
                state: ChannelState::Disconnected,
                epoch: 0,
                outbound: None,
                task: None,
            }),
        });
        (Self { shared }, receiver)
    }

    pub fn state(&self) -> ChannelState {
        self.shared.inner.lock().state
    }

    /// Start connecting to `session_id`'s room.
    ///
    /// Returns `false` without doing anything unless the channel is Disconnected.
    pub fn connect(&self, session_id: &str) -> bool {
        let mut inner = self.shared.inner.lock();
        if inner.state != ChannelState::Disconnected {
            debug!("Connect ignored, channel is {:?}", inner.state);
            return false;
        }

        inner.epoch += 1;
        let epoch = inner.epoch;
        self.shared.transition(&mut inner, ChannelState::Connecting);

        let shared = self.shared.clone();
        let session_id = session_id.to_string();
        inner.task = Some(tokio::spawn(run_channel(shared, epoch, session_id)));
        true
    }

    /// Close the channel from any state. Never fails.
    pub fn disconnect(&self) {
        let mut inner = self.shared.inner.lock();
        inner.epoch += 1;
        if let Some(task) = inner.task.take() {
            task.abort();
        }
        inner.outbound = None;
        self.shared.transition(&mut inner, ChannelState::Disconnected);
    }

    /// Re-send the authentication frame; no-op unless Connected
    pub fn authenticate(&self) -> bool {
        let inner = self.shared.inner.lock();
        self.shared.send_frame(&inner, self.shared.auth_frame())
    }

    /// Mark a product as currently featured; no-op unless Connected
    pub fn highlight(&self, product_id: &str) -> bool {
        let inner = self.shared.inner.lock();
        self.shared.send_frame(
            &inner,
            OutboundFrame::HighlightProduct {
                product_id: product_id.to_string(),
            },
        )
    }
}

impl Drop for ChatChannelConnector {
    fn drop(&mut self) {
        let mut inner = self.shared.inner.lock();
        inner.epoch += 1;
        if let Some(task) = inner.task.take() {
            task.abort();
        }
        inner.outbound = None;
    }
}

async fn run_channel(shared: Arc<Shared>, epoch: u64, session_id: String) {
    let opened = with_timeout(shared.connect_timeout, shared.transport.open(&session_id)).await;
    let mut link = match opened {
        Ok(Ok(link)) => link,
        Ok(Err(e)) => return shared.fail(epoch, e),
        Err(elapsed) => return shared.fail(epoch, AppError::Channel(elapsed.to_string())),
    };

    {
        let mut inner = shared.inner.lock();
        if inner.epoch != epoch {
            return;
        }
        inner.outbound = Some(link.outbound.clone());
        shared.transition(&mut inner, ChannelState::Connected);
        info!("Chat channel ready: session_id={}", session_id);
        shared.send_frame(&inner, shared.auth_frame());
    }

    loop {
        match link.inbound.recv().await {
            Some(InboundFrame::Text(payload)) => {
                let event = parse_channel_payload(&payload);
                let inner = shared.inner.lock();
                if inner.epoch != epoch {
                    return;
                }
                let _ = shared.notifications.send(ChannelNotification::Message(event));
            }
            Some(InboundFrame::Failed(reason)) => {
                return shared.fail(epoch, AppError::Channel(reason));
            }
            Some(InboundFrame::Closed) | None => {
                return shared.fail(epoch, AppError::Channel("closed by remote".to_string()));
            }
        }
    }
}
