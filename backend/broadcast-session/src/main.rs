//! Broadcast session driver
//!
//! Operator tool around the session core:
//! - `broadcast-session list` prints the broadcaster's streams
//! - `broadcast-session live <stream_id>` takes a stream live until Ctrl-C, then finishes it
//!
//! Environment (besides the `STUDIO_*` settings read by `Config::from_env`):
//! - STUDIO_LOGIN / STUDIO_PASSWORD: broadcaster credentials for basic auth
//! - STUDIO_USER_ID: broadcaster id used for the chat room and stream list

use anyhow::{anyhow, bail, Context};
use broadcast_session::identity::{IdentityProvider, StaticIdentity};
use broadcast_session::logging::init_tracing;
use broadcast_session::models::{Notification, PrepareState, VideoStreamState};
use broadcast_session::services::chat::{ChatChannelConnector, WsChatTransport};
use broadcast_session::services::error_catalog::DefaultErrorCatalog;
use broadcast_session::services::stream_api::client::terminal;
use broadcast_session::services::stream_api::{HttpStreamGateway, StatusTransitionClient};
use broadcast_session::{Config, SessionController, SessionHandle};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

const USAGE: &str = "usage: broadcast-session <list | live <stream_id>>";

fn identity_from_env(config: &Config) -> anyhow::Result<StaticIdentity> {
    let login = std::env::var("STUDIO_LOGIN").context("STUDIO_LOGIN not set")?;
    let password = std::env::var("STUDIO_PASSWORD").context("STUDIO_PASSWORD not set")?;
    let user_id = std::env::var("STUDIO_USER_ID").context("STUDIO_USER_ID not set")?;
    Ok(StaticIdentity::from_login(
        &login,
        &password,
        user_id,
        config.app_id.clone(),
    ))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = Config::from_env().context("Failed to load configuration")?;
    let identity = Arc::new(identity_from_env(&config)?);

    let gateway = Arc::new(HttpStreamGateway::new(&config.api)?);
    let client = StatusTransitionClient::new(gateway, config.api.remote.clone());

    let mut args = std::env::args().skip(1);
    match args.next().as_deref() {
        Some("list") => list_streams(&client, &config, identity.as_ref()).await,
        Some("live") => {
            let stream_id = args.next().ok_or_else(|| anyhow!(USAGE))?;
            run_live(client, &config, identity, stream_id).await
        }
        _ => bail!(USAGE),
    }
}

async fn list_streams(
    client: &StatusTransitionClient,
    config: &Config,
    identity: &dyn IdentityProvider,
) -> anyhow::Result<()> {
    let streams = terminal(client.fetch_stream_list(&config.app_id, &identity.user_id()))
        .await
        .context("Failed to fetch stream list")?;

    if streams.is_empty() {
        println!("No streams");
    }
    for stream in streams {
        let scheduled = stream
            .scheduled_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<12} {:<10} {:<17} {}",
            stream.id,
            stream.status.as_str(),
            scheduled,
            stream.title.unwrap_or_default()
        );
    }
    Ok(())
}

async fn run_live(
    client: StatusTransitionClient,
    config: &Config,
    identity: Arc<StaticIdentity>,
    stream_id: String,
) -> anyhow::Result<()> {
    let transport = Arc::new(WsChatTransport::new(config.chat.ws_url.clone()));
    let channel = ChatChannelConnector::new(
        transport,
        identity.clone(),
        config.chat.connect_timeout.duration,
    );
    let controller = SessionController::new(
        client,
        channel,
        identity,
        Arc::new(DefaultErrorCatalog),
        config.session.clone(),
        config.chat.reconnect.clone(),
    );
    let (session, task) = controller.spawn();

    let prepare = session.prepare_state();
    session.prepare_stream(stream_id.as_str())?;
    if !wait_until_ready(prepare).await {
        if let Err(e) = session.shutdown().await {
            warn!(error = %e, "Session already stopped");
        }
        bail!("Stream {} could not be prepared", stream_id);
    }

    if let Some(push) = session
        .links()
        .borrow()
        .as_ref()
        .and_then(|links| links.push_endpoint().map(str::to_string))
    {
        info!(stream_id = %stream_id, push = %push, "Stream is live, point the encoder at the push endpoint");
    }
    session.on_streaming_started()?;

    let watcher = tokio::spawn(report_activity(session.clone()));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Ctrl-C received, finishing stream");

    let video = session.video_state();
    session.finish_stream()?;
    wait_until_ended(video).await;
    watcher.abort();

    if let Err(e) = session.shutdown().await {
        warn!(error = %e, "Session already stopped");
    }
    if let Err(e) = task.await {
        warn!(error = %e, "Session task ended abnormally");
    }
    Ok(())
}

/// Follow the prepare state until the session is ready, failed or stopped
async fn wait_until_ready(
    mut prepare: watch::Receiver<Arc<Notification<PrepareState>>>,
) -> bool {
    loop {
        if prepare.changed().await.is_err() {
            return false;
        }
        let current = prepare.borrow_and_update().clone();
        match current.content_if_not_handled() {
            Some(PrepareState::Ready) => return true,
            Some(PrepareState::Error { kind, message }) => {
                error!(code = kind.code(), "{}", message);
                return false;
            }
            Some(PrepareState::StopPreview) => info!("Chat channel connected"),
            Some(state) => info!(?state, "Preparing"),
            None => {}
        }
    }
}

async fn wait_until_ended(mut video: watch::Receiver<Arc<Notification<VideoStreamState>>>) {
    while video.changed().await.is_ok() {
        let current = video.borrow_and_update().clone();
        match current.content_if_not_handled() {
            Some(VideoStreamState::Ended) => return,
            Some(VideoStreamState::Error { kind, message }) => {
                warn!(code = kind.code(), "{}", message)
            }
            _ => {}
        }
    }
}

async fn report_activity(session: SessionHandle) {
    let mut viewers = session.viewer_count();
    let mut messages = session.messages();
    let mut printed = 0usize;

    loop {
        tokio::select! {
            changed = viewers.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("viewers: {}", *viewers.borrow_and_update());
            }
            changed = messages.changed() => {
                if changed.is_err() {
                    break;
                }
                let log = messages.borrow_and_update().clone();
                for message in log.iter().skip(printed) {
                    println!("[{}] {}: {}", message.timestamp, message.sender, message.text);
                }
                printed = log.len();
            }
        }
    }
}
