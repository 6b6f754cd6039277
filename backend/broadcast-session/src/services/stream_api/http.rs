/// HTTP implementation of the stream API gateway
///
/// Every response body is an envelope `{"status": <int>, "body": <payload>}`. A call
/// succeeds only when both the HTTP status is 2xx and the envelope status is 200.
use super::gateway::StreamGateway;
use crate::config::ApiConfig;
use crate::error::{AppError, AppResult};
use crate::models::{ChatRoomRequest, StreamResponse, StreamStatus, StreamSummary, TranslationLinks};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    status: u16,
    #[serde(default = "Option::default")]
    body: Option<T>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StreamListRequest<'a> {
    filters: StreamListFilters<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StreamListFilters<'a> {
    streamer_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateStreamLinkRequest<'a> {
    stream_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChangeStreamStatusRequest<'a> {
    stream_id: &'a str,
    status: StreamStatus,
}

#[derive(Clone)]
pub struct HttpStreamGateway {
    client: Client,
    base_url: String,
}

impl HttpStreamGateway {
    /// Gateway targeting the production or development base URL, per `config.dev_mode`
    pub fn new(config: &ApiConfig) -> AppResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::StartUp(format!("http client: {e}")))?;

        Ok(Self::with_client(client, config.effective_base_url()))
    }

    pub fn with_client(client: Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &str,
    ) -> AppResult<Option<T>> {
        let response = request.send().await.map_err(|e| {
            error!("Failed to send {} request: {}", operation, e);
            AppError::Network(format!("{operation} request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!(
                "Stream API {} returned error: status={}, body={}",
                operation, status, error_text
            );
            return Err(AppError::from_status(
                status.as_u16(),
                format!("{operation} failed: {error_text}"),
            ));
        }

        let envelope: ApiEnvelope<T> = response.json().await.map_err(|e| {
            error!("Stream API {} returned an undecodable body: {}", operation, e);
            AppError::Network(format!("{operation}: invalid response body: {e}"))
        })?;

        if envelope.status != 200 {
            warn!(
                "Stream API {} rejected: envelope status={}",
                operation, envelope.status
            );
            return Err(AppError::from_status(
                envelope.status,
                format!("{operation} rejected"),
            ));
        }

        debug!("Stream API {} succeeded", operation);
        Ok(envelope.body)
    }

    async fn send_required<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        operation: &str,
    ) -> AppResult<T> {
        self.send(request, operation)
            .await?
            .ok_or_else(|| AppError::Network(format!("{operation}: response body missing")))
    }
}

#[async_trait]
impl StreamGateway for HttpStreamGateway {
    async fn fetch_stream_list(
        &self,
        app_id: &str,
        streamer_id: &str,
    ) -> AppResult<Vec<StreamSummary>> {
        let url = self.url(&format!("/apps/{}/streams", urlencoding::encode(app_id)));
        let request = self.client.post(&url).json(&StreamListRequest {
            filters: StreamListFilters { streamer_id },
        });

        Ok(self
            .send::<Vec<StreamSummary>>(request, "fetch_stream_list")
            .await?
            .unwrap_or_default())
    }

    async fn fetch_stream_data(&self, auth: &str, stream_id: &str) -> AppResult<StreamResponse> {
        let url = self.url(&format!("/streams/{}", urlencoding::encode(stream_id)));
        let request = self.client.get(&url).header("Authorization", auth);

        self.send_required(request, "fetch_stream_data").await
    }

    async fn create_stream_link(&self, auth: &str, stream_id: &str) -> AppResult<TranslationLinks> {
        let request = self
            .client
            .post(self.url("/streams/links"))
            .header("Authorization", auth)
            .json(&CreateStreamLinkRequest { stream_id });

        self.send_required(request, "create_stream_link").await
    }

    async fn change_stream_status(
        &self,
        auth: &str,
        stream_id: &str,
        status: StreamStatus,
    ) -> AppResult<()> {
        let request = self
            .client
            .post(self.url("/streams/status"))
            .header("Authorization", auth)
            .json(&ChangeStreamStatusRequest { stream_id, status });

        self.send::<serde_json::Value>(request, "change_stream_status")
            .await
            .map(|_| ())
    }

    async fn open_chat_room(&self, auth: &str, request: &ChatRoomRequest) -> AppResult<()> {
        let request = self
            .client
            .post(self.url("/chat/rooms/open"))
            .header("Authorization", auth)
            .json(request);

        self.send::<serde_json::Value>(request, "open_chat_room")
            .await
            .map(|_| ())
    }

    async fn close_chat_room(&self, auth: &str, request: &ChatRoomRequest) -> AppResult<()> {
        let request = self
            .client
            .post(self.url("/chat/rooms/close"))
            .header("Authorization", auth)
            .json(request);

        self.send::<serde_json::Value>(request, "close_chat_room")
            .await
            .map(|_| ())
    }
}
