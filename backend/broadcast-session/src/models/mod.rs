pub mod message;
pub mod state;
pub mod stream;

pub use message::{ChannelEvent, MessageModel};
pub use state::{Notification, PrepareState, Resource, VideoStreamState};
pub use stream::{
    ChatRoomRequest, PlaybackLinks, Product, PushLinks, StreamResponse, StreamSession,
    StreamStatus, StreamSummary, TranslationLinks,
};
