use serde::{Deserialize, Serialize};

/// Remote-facing lifecycle stage of a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    Planned,
    Online,
    Completed,
}

impl StreamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamStatus::Planned => "planned",
            StreamStatus::Online => "online",
            StreamStatus::Completed => "completed",
        }
    }
}

impl std::fmt::Display for StreamStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushLinks {
    #[serde(default)]
    pub rtmp: Option<String>,
    #[serde(default)]
    pub rtmps: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackLinks {
    #[serde(default)]
    pub hls: Option<String>,
    #[serde(default)]
    pub rtmp: Option<String>,
}

/// Push/playback endpoints allocated for a stream
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationLinks {
    #[serde(default)]
    pub push: PushLinks,
    #[serde(default)]
    pub playback: PlaybackLinks,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl TranslationLinks {
    /// A stream can only go online with at least one usable push endpoint
    pub fn has_push_endpoint(&self) -> bool {
        self.push_endpoint().is_some()
    }

    /// Preferred push endpoint: RTMPS over plain RTMP
    pub fn push_endpoint(&self) -> Option<&str> {
        non_empty(&self.push.rtmps).or_else(|| non_empty(&self.push.rtmp))
    }
}

/// Highlightable catalog item attached to a stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub discount_price: Option<f64>,
    #[serde(default, alias = "image")]
    pub image_url: Option<String>,
}

/// Stream metadata returned by `GET /streams/{id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamResponse {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "default_status")]
    pub status: StreamStatus,
    #[serde(default)]
    pub translation_links: Option<TranslationLinks>,
    #[serde(default)]
    pub products: Vec<Product>,
}

fn default_status() -> StreamStatus {
    StreamStatus::Planned
}

/// Entry of the broadcaster's stream list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSummary {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "default_status")]
    pub status: StreamStatus,
    #[serde(default)]
    pub scheduled_at: Option<chrono::DateTime<chrono::Utc>>,
}

/// Body of the chat room open/close calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoomRequest {
    pub user_id: String,
    pub stream_id: String,
    pub application: String,
}

/// The broadcast currently owned by the session controller.
///
/// `status` only moves when this session's own status change succeeds;
/// whatever the remote reported on fetch is kept in `remote_status`.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamSession {
    pub id: String,
    pub status: StreamStatus,
    pub remote_status: StreamStatus,
    pub links: Option<TranslationLinks>,
    pub products: Vec<Product>,
    /// The chat room was opened for this session
    pub chat_room_open: bool,
}

impl StreamSession {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            status: StreamStatus::Planned,
            remote_status: StreamStatus::Planned,
            links: None,
            products: Vec::new(),
            chat_room_open: false,
        }
    }

    /// Adopt the metadata fetched from the remote
    pub fn apply(&mut self, response: StreamResponse) {
        self.remote_status = response.status;
        self.links = response.translation_links;
        self.products = response.products;
    }

    /// Whether a link-creation step is required before going online
    pub fn needs_links(&self) -> bool {
        !self
            .links
            .as_ref()
            .map(TranslationLinks::has_push_endpoint)
            .unwrap_or(false)
    }

    /// Online and the chat room is open, so the channel may connect
    pub fn is_active(&self) -> bool {
        self.status == StreamStatus::Online && self.chat_room_open
    }
}
