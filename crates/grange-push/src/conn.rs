use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use reqwest::Url;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, warn};

use grange_types::notices::{CHAT_TOPIC, ChatNotice, PushFrame};

use crate::hub::NoticeSink;

/// Delay before reconnecting after a failed or dropped broker connection.
const RECONNECT_DELAY: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct PushConfig {
    pub url: Url,
    pub topic: String,
}

impl PushConfig {
    pub fn new(url: Url) -> Self {
        Self { url, topic: CHAT_TOPIC.to_string() }
    }
}

/// Spawn the broker connection task. It runs until the outbound queue is
/// closed (every `PushHub` handle dropped).
pub fn spawn(
    config: PushConfig,
    sink: NoticeSink,
    outbound: mpsc::UnboundedReceiver<ChatNotice>,
) -> JoinHandle<()> {
    tokio::spawn(run(config, sink, outbound))
}

/// Connect to the broker, subscribe to the chat topic, then relay frames
/// both ways. Reconnects with a fixed delay; the subscription is re-sent on
/// every new connection.
pub async fn run(
    config: PushConfig,
    sink: NoticeSink,
    mut outbound: mpsc::UnboundedReceiver<ChatNotice>,
) {
    loop {
        if outbound.is_closed() {
            return;
        }

        let Ok((mut socket, _)) = connect_async(config.url.as_str()).await else {
            warn!("push broker connect failed, retrying in 1 second");
            tokio::time::sleep(RECONNECT_DELAY).await;
            continue;
        };

        let subscribe = PushFrame::Subscribe { topic: config.topic.clone() };
        let frame = match serde_json::to_string(&subscribe) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("unencodable subscribe frame: {}", e);
                return;
            }
        };
        if socket.send(WsMessage::text(frame)).await.is_err() {
            warn!("push broker rejected subscription, reconnecting");
            tokio::time::sleep(RECONNECT_DELAY).await;
            continue;
        }

        debug!("subscribed to push topic {:?}", config.topic);

        loop {
            tokio::select! {
                incoming = socket.next() => {
                    match incoming {
                        Some(Ok(WsMessage::Text(text))) => {
                            match serde_json::from_str::<PushFrame>(&text) {
                                Ok(PushFrame::Event { topic, notice }) if topic == config.topic => {
                                    sink.deliver(notice);
                                }
                                Ok(_) => {}
                                Err(e) => warn!("undecodable push frame: {}", e),
                            }
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            warn!("push socket error: {}, reconnecting in 1 second", e);
                            tokio::time::sleep(RECONNECT_DELAY).await;
                            break;
                        }
                        None => {
                            warn!("push broker disconnected, reconnecting in 1 second");
                            tokio::time::sleep(RECONNECT_DELAY).await;
                            break;
                        }
                    }
                }
                queued = outbound.recv() => {
                    let Some(notice) = queued else {
                        // All hub handles dropped; shut the connection down.
                        let _ = socket.close(None).await;
                        return;
                    };
                    let frame = PushFrame::Publish {
                        topic: config.topic.clone(),
                        notice,
                    };
                    match serde_json::to_string(&frame) {
                        Ok(text) => {
                            if let Err(e) = socket.send(WsMessage::text(text)).await {
                                warn!("push publish failed: {}, reconnecting", e);
                                break;
                            }
                        }
                        Err(e) => warn!("unencodable push frame: {}", e),
                    }
                }
            }
        }
    }
}
