use serde::{Deserialize, Serialize};

/// One chat log entry. Entries are appended, never edited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageModel {
    #[serde(alias = "name")]
    pub sender: String,
    #[serde(alias = "message")]
    pub text: String,
    #[serde(default, alias = "time")]
    pub timestamp: String,
}

/// Typed payload decoded from one inbound channel frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Recognized (or unrecognized) frame with nothing to act on
    Empty,
    NewViewer { count: u32 },
    NewMessages { messages: Vec<MessageModel> },
}
