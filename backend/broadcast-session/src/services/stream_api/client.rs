/// Status Transition Client
///
/// Wraps a [`StreamGateway`] so that every remote operation is observed as a
/// tri-state stream: `Loading` first, then exactly one terminal `Success` or
/// `Error`. Each call is bounded by the configured timeout. Status changes are
/// serialized per client because the remote resource has no concurrency guard.
use super::gateway::StreamGateway;
use crate::error::{AppError, AppResult};
use crate::models::{
    ChatRoomRequest, Resource, StreamResponse, StreamStatus, StreamSummary, TranslationLinks,
};
use futures::stream::{self, BoxStream, StreamExt};
use resilience::{with_timeout, RemoteCallConfig};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub type ResourceStream<T> = BoxStream<'static, Resource<T>>;

#[derive(Clone)]
pub struct StatusTransitionClient {
    gateway: Arc<dyn StreamGateway>,
    timeout: Duration,
    status_lock: Arc<Mutex<()>>,
}

impl StatusTransitionClient {
    pub fn new(gateway: Arc<dyn StreamGateway>, config: RemoteCallConfig) -> Self {
        Self {
            gateway,
            timeout: config.timeout.duration,
            status_lock: Arc::new(Mutex::new(())),
        }
    }

    fn track<T, F>(&self, operation: &'static str, call: F) -> ResourceStream<T>
    where
        T: Send + 'static,
        F: Future<Output = AppResult<T>> + Send + 'static,
    {
        let timeout = self.timeout;
        let terminal = async move {
            let result = match with_timeout(timeout, call).await {
                Ok(result) => result,
                Err(elapsed) => Err(AppError::from(elapsed)),
            };
            match &result {
                Ok(_) => debug!("{} completed", operation),
                Err(e) => warn!("{} failed: {}", operation, e),
            }
            Resource::from(result)
        };

        stream::once(async { Resource::Loading })
            .chain(stream::once(terminal))
            .boxed()
    }

    pub fn fetch_stream_list(&self, app_id: &str, streamer_id: &str) -> ResourceStream<Vec<StreamSummary>> {
        let gateway = self.gateway.clone();
        let app_id = app_id.to_string();
        let streamer_id = streamer_id.to_string();
        self.track("fetch_stream_list", async move {
            gateway.fetch_stream_list(&app_id, &streamer_id).await
        })
    }

    pub fn fetch_stream_data(&self, auth: &str, stream_id: &str) -> ResourceStream<StreamResponse> {
        let gateway = self.gateway.clone();
        let auth = auth.to_string();
        let stream_id = stream_id.to_string();
        self.track("fetch_stream_data", async move {
            gateway.fetch_stream_data(&auth, &stream_id).await
        })
    }

    pub fn create_stream_link(&self, auth: &str, stream_id: &str) -> ResourceStream<TranslationLinks> {
        let gateway = self.gateway.clone();
        let auth = auth.to_string();
        let stream_id = stream_id.to_string();
        self.track("create_stream_link", async move {
            gateway.create_stream_link(&auth, &stream_id).await
        })
    }

    pub fn change_stream_status(
        &self,
        auth: &str,
        stream_id: &str,
        status: StreamStatus,
    ) -> ResourceStream<()> {
        let gateway = self.gateway.clone();
        let lock = self.status_lock.clone();
        let auth = auth.to_string();
        let stream_id = stream_id.to_string();
        self.track("change_stream_status", async move {
            let _guard = lock.lock().await;
            gateway.change_stream_status(&auth, &stream_id, status).await
        })
    }

    pub fn open_chat_room(&self, auth: &str, request: ChatRoomRequest) -> ResourceStream<()> {
        let gateway = self.gateway.clone();
        let auth = auth.to_string();
        self.track("open_chat_room", async move {
            gateway.open_chat_room(&auth, &request).await
        })
    }

    pub fn close_chat_room(&self, auth: &str, request: ChatRoomRequest) -> ResourceStream<()> {
        let gateway = self.gateway.clone();
        let auth = auth.to_string();
        self.track("close_chat_room", async move {
            gateway.close_chat_room(&auth, &request).await
        })
    }
}

/// Drain a resource stream and return its terminal value
pub async fn terminal<T>(mut resources: ResourceStream<T>) -> AppResult<T> {
    while let Some(resource) = resources.next().await {
        match resource {
            Resource::Loading => continue,
            Resource::Success(value) => return Ok(value),
            Resource::Error(e) => return Err(e),
        }
    }
    Err(AppError::Network("remote call produced no result".to_string()))
}
