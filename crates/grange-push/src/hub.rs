use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};

use grange_types::notices::ChatNotice;

/// Fan-out point between the broker connection and everything that reacts
/// to chat notices. Works standalone: the connection task is just one
/// producer/consumer among others, so sessions can be exercised against a
/// hub with no socket behind it.
#[derive(Clone)]
pub struct PushHub {
    inner: Arc<HubInner>,
}

struct HubInner {
    /// Inbound notices, fanned out to every subscriber.
    inbound_tx: broadcast::Sender<ChatNotice>,

    /// Outbound queue, drained by the broker connection task.
    outbound_tx: mpsc::UnboundedSender<ChatNotice>,
}

impl PushHub {
    /// Returns the hub plus the outbound receiver the connection task (or a
    /// test) drains.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ChatNotice>) {
        let (inbound_tx, _) = broadcast::channel(256);
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let hub = Self {
            inner: Arc::new(HubInner { inbound_tx, outbound_tx }),
        };
        (hub, outbound_rx)
    }

    /// Subscribe to notices delivered by the broker.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatNotice> {
        self.inner.inbound_tx.subscribe()
    }

    /// Hand an inbound notice to all subscribers. Called by the connection
    /// task for each decoded broker frame.
    pub fn deliver(&self, notice: ChatNotice) {
        let _ = self.inner.inbound_tx.send(notice);
    }

    /// Deliver-only handle for the connection task. It does not keep the
    /// outbound queue alive, so the connection shuts down once every
    /// application-side hub handle is dropped.
    pub fn sink(&self) -> NoticeSink {
        NoticeSink { inbound_tx: self.inner.inbound_tx.clone() }
    }

    /// Queue a notice for publication on the broker.
    pub fn publish(&self, notice: ChatNotice) {
        let _ = self.inner.outbound_tx.send(notice);
    }

    /// Publish the read acknowledgement for a thread.
    pub fn publish_read(&self, group_id: u64, thread_id: u64) {
        self.publish(ChatNotice::Read { group_id, thread_id });
    }
}

/// See [`PushHub::sink`].
#[derive(Clone)]
pub struct NoticeSink {
    inbound_tx: broadcast::Sender<ChatNotice>,
}

impl NoticeSink {
    pub fn deliver(&self, notice: ChatNotice) {
        let _ = self.inbound_tx.send(notice);
    }
}
