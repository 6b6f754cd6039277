//! Remote calls that move a stream through its lifecycle and manage its chat room

pub mod client;
pub mod gateway;
pub mod http;

pub use client::{ResourceStream, StatusTransitionClient};
pub use gateway::StreamGateway;
pub use http::HttpStreamGateway;
