use crate::error::AppResult;
use crate::models::{ChatRoomRequest, StreamResponse, StreamStatus, StreamSummary, TranslationLinks};
use async_trait::async_trait;

/// Transport seam for the stream API.
///
/// Implementations perform exactly one request per call and never retry; any
/// non-success response or transport fault is returned as an `AppError`.
#[async_trait]
pub trait StreamGateway: Send + Sync {
    async fn fetch_stream_list(
        &self,
        app_id: &str,
        streamer_id: &str,
    ) -> AppResult<Vec<StreamSummary>>;

    async fn fetch_stream_data(&self, auth: &str, stream_id: &str) -> AppResult<StreamResponse>;

    async fn create_stream_link(&self, auth: &str, stream_id: &str) -> AppResult<TranslationLinks>;

    async fn change_stream_status(
        &self,
        auth: &str,
        stream_id: &str,
        status: StreamStatus,
    ) -> AppResult<()>;

    async fn open_chat_room(&self, auth: &str, request: &ChatRoomRequest) -> AppResult<()>;

    async fn close_chat_room(&self, auth: &str, request: &ChatRoomRequest) -> AppResult<()>;
}
