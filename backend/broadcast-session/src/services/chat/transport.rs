use crate::error::AppResult;
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;

/// What the transport reports upward for one open channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Text(String),
    /// Remote closed the channel
    Closed,
    /// Transport-level failure
    Failed(String),
}

/// Signals sent from the broadcaster to the chat server
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum OutboundFrame {
    Auth {
        #[serde(rename = "userId")]
        user_id: String,
        password: String,
    },
    HighlightProduct {
        #[serde(rename = "productId")]
        product_id: String,
    },
}

impl OutboundFrame {
    pub fn to_json(&self) -> String {
        // Serializing a plain enum of strings cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// An open channel. Dropping the link closes the underlying connection.
pub struct ChannelLink {
    pub outbound: mpsc::UnboundedSender<String>,
    pub inbound: mpsc::UnboundedReceiver<InboundFrame>,
}

/// Opens chat channels; resolves once the remote acknowledged the connection
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open(&self, session_id: &str) -> AppResult<ChannelLink>;
}
