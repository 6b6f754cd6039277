pub mod chat;
pub mod error_catalog;
pub mod session;
pub mod stream_api;
