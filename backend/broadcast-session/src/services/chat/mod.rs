//! Real-time chat channel: wire frames, event parsing and the connection state machine

pub mod connector;
pub mod parser;
pub mod transport;
pub mod ws;

pub use connector::{ChannelNotification, ChannelState, ChatChannelConnector};
pub use parser::parse_channel_payload;
pub use transport::{ChannelLink, ChatTransport, InboundFrame, OutboundFrame};
pub use ws::WsChatTransport;
