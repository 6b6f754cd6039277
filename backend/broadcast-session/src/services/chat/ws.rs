/// WebSocket chat transport
///
/// Connects to `{ws_url}?streamId={session_id}` and bridges the socket to a pair of
/// channels: one writer task owns the sink, one reader task owns the stream.
use super::transport::{ChannelLink, ChatTransport, InboundFrame};
use crate::error::{AppError, AppResult};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct WsChatTransport {
    ws_url: String,
}

impl WsChatTransport {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
        }
    }

    fn url_for(&self, session_id: &str) -> String {
        let separator = if self.ws_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}streamId={}",
            self.ws_url,
            separator,
            urlencoding::encode(session_id)
        )
    }
}

enum Outgoing {
    Text(String),
    Pong(Vec<u8>),
}

#[async_trait]
impl ChatTransport for WsChatTransport {
    async fn open(&self, session_id: &str) -> AppResult<ChannelLink> {
        let url = self.url_for(session_id);
        let (ws, _response) = connect_async(url.as_str()).await.map_err(|e| {
            warn!("Chat channel connect to {} failed: {}", url, e);
            AppError::Channel(format!("connect failed: {e}"))
        })?;
        info!("Chat channel connected: session_id={}", session_id);

        let (mut sink, mut stream) = ws.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<InboundFrame>();
        let (pong_tx, mut pong_rx) = mpsc::unbounded_channel::<Vec<u8>>();

        tokio::spawn(async move {
            loop {
                let next = tokio::select! {
                    text = outbound_rx.recv() => text.map(Outgoing::Text),
                    Some(payload) = pong_rx.recv() => Some(Outgoing::Pong(payload)),
                };
                let message = match next {
                    Some(Outgoing::Text(text)) => Message::Text(text),
                    Some(Outgoing::Pong(payload)) => Message::Pong(payload),
                    None => break,
                };
                if let Err(e) = sink.send(message).await {
                    warn!("Chat channel write failed: {}", e);
                    break;
                }
            }
            let _ = sink.close().await;
            debug!("Chat channel writer finished");
        });

        tokio::spawn(async move {
            loop {
                let frame = tokio::select! {
                    _ = inbound_tx.closed() => break,
                    frame = stream.next() => frame,
                };
                let forwarded = match frame {
                    Some(Ok(Message::Text(text))) => InboundFrame::Text(text),
                    Some(Ok(Message::Ping(payload))) => {
                        let _ = pong_tx.send(payload);
                        continue;
                    }
                    Some(Ok(Message::Close(frame))) => {
                        debug!("Chat channel closed by server: {:?}", frame);
                        InboundFrame::Closed
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => InboundFrame::Failed(e.to_string()),
                    None => InboundFrame::Closed,
                };
                let terminal = !matches!(forwarded, InboundFrame::Text(_));
                if inbound_tx.send(forwarded).is_err() || terminal {
                    break;
                }
            }
            debug!("Chat channel reader finished");
        });

        Ok(ChannelLink {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
