use reqwest::Url;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

use grange_api::ApiClient;
use grange_push::{PushConfig, PushHub};
use grange_sync::session::{self, SessionConfig, SessionEvent};
use grange_sync::store::{Action, Store};
use grange_types::notices::ChatNotice;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "grange=debug".into()),
        )
        .init();

    // Config
    let api_url: Url = std::env::var("GRANGE_API_URL")
        .unwrap_or_else(|_| "https://coop.localhost/".into())
        .parse()?;
    let push_url: Url = std::env::var("GRANGE_PUSH_URL")
        .unwrap_or_else(|_| "wss://coop.localhost/push".into())
        .parse()?;
    let token = std::env::var("GRANGE_TOKEN").unwrap_or_default();
    if token.is_empty() {
        anyhow::bail!("GRANGE_TOKEN is not set");
    }
    let open_thread: Option<u64> = match std::env::var("GRANGE_OPEN_THREAD") {
        Ok(raw) => Some(raw.parse()?),
        Err(_) => None,
    };

    // Wiring
    let api = ApiClient::new(api_url, &token)?;
    let (hub, outbound) = PushHub::new();
    let conn = grange_push::spawn(PushConfig::new(push_url), hub.sink(), outbound);
    let store = Store::new();

    // Prime the unread list
    match api.list_unread_markers().await {
        Ok(markers) => {
            info!("{} unread markers on startup", markers.len());
            store.dispatch(Action::UnreadLoaded(markers)).await;
        }
        Err(e) => warn!("unread marker load failed: {}", e),
    }

    // Optionally keep one thread open, like a pinned chat window
    let (session, mut session_events, mut session_open) = match open_thread {
        Some(thread_id) => {
            info!("opening thread {}", thread_id);
            let (handle, events) = session::open(
                api.clone(),
                hub.clone(),
                store.clone(),
                thread_id,
                SessionConfig::default(),
            );
            (Some(handle), events, true)
        }
        None => {
            let (_tx, events) = mpsc::unbounded_channel();
            (None, events, false)
        }
    };

    let mut notices = hub.subscribe();
    info!("grange agent running");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            notice = notices.recv() => {
                match notice {
                    Ok(notice) => on_notice(&api, &store, notice).await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!("notice stream lagged by {}", n);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            event = session_events.recv(), if session_open => {
                match event {
                    Some(event) => log_session_event(&event),
                    None => session_open = false,
                }
            }
        }
    }

    info!("shutting down");
    if let Some(handle) = session {
        let _ = handle.close();
        handle.join().await;
    }
    drop(notices);
    drop(hub);
    let _ = conn.await;
    Ok(())
}

async fn on_notice(api: &ApiClient, store: &Store, notice: ChatNotice) {
    match notice {
        ChatNotice::Created { group_id, thread_id, .. } => {
            // A new message somewhere: refresh the marker list so unread
            // badges are current even for threads that are not open.
            match api.list_unread_markers().await {
                Ok(markers) => store.dispatch(Action::UnreadLoaded(markers)).await,
                Err(e) => warn!("unread marker refresh failed: {}", e),
            }
            info!(
                "thread {}: {} unread, group {}: {} unread",
                thread_id,
                store.thread_unread(group_id, thread_id).await,
                group_id,
                store.group_unread(group_id).await,
            );
        }
        ChatNotice::Read { .. } | ChatNotice::Deleted { .. } => {}
    }
}

fn log_session_event(event: &SessionEvent) {
    match event {
        SessionEvent::Loaded { thread, messages } => {
            info!("thread {} loaded with {} messages", thread.id, messages.len());
        }
        SessionEvent::MessagesAppended(batch) => {
            info!("{} new messages", batch.len());
        }
        SessionEvent::OlderMessagesLoaded(batch) => {
            info!("{} older messages", batch.len());
        }
        SessionEvent::MessageDeleted { message_id } => {
            info!("message {} deleted", message_id);
        }
        SessionEvent::ReceiptUpdated(receipt) => {
            info!("receipt update: {:?}", receipt);
        }
        SessionEvent::PhaseChanged(phase) => {
            info!("session phase: {:?}", phase);
        }
        SessionEvent::Error { message } => {
            warn!("session error: {}", message);
        }
    }
}
