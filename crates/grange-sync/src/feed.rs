use std::collections::HashSet;

use chrono::{DateTime, Utc};

use grange_types::models::Message;

/// In-memory message list for one open thread, fed from two directions:
/// poll/push fetches append newer messages, backward pagination prepends
/// older ones.
///
/// The watermark is the maximum creation timestamp ever held and only moves
/// forward; it is the `after` cursor for the next fetch. Deduplication does
/// not rely on it: every accepted identifier goes into a seen-set, so a
/// message delivered by both the push-triggered fetch and the interval fetch
/// renders once. Messages whose timestamp never exceeds the watermark are
/// still dropped server-side by the `after` filter; that clock-skew gap is
/// accepted.
#[derive(Debug, Default)]
pub struct MessageFeed {
    messages: Vec<Message>,
    seen: HashSet<u64>,
    watermark: Option<DateTime<Utc>>,
    previous_loaded: bool,
}

impl MessageFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// All held messages, ordered by creation time ascending.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Cursor for the next forward fetch.
    pub fn watermark(&self) -> Option<DateTime<Utc>> {
        self.watermark
    }

    /// Cursor for the next backward fetch.
    pub fn earliest(&self) -> Option<DateTime<Utc>> {
        self.messages.first().map(|m| m.created_at)
    }

    /// True once a backward fetch came back empty; no further backward
    /// fetches are issued after that.
    pub fn previous_loaded(&self) -> bool {
        self.previous_loaded
    }

    /// Merge a batch of newly fetched (or pushed) messages. Returns the
    /// messages actually accepted, in display order; already-seen
    /// identifiers are skipped.
    pub fn merge_newer(&mut self, batch: Vec<Message>) -> Vec<Message> {
        let mut accepted = Vec::new();
        for msg in batch {
            if !self.seen.insert(msg.id) {
                continue;
            }
            self.bump_watermark(msg.created_at);
            accepted.push(msg);
        }

        if !accepted.is_empty() {
            accepted.sort_by_key(|m| (m.created_at, m.id));
            self.messages.extend(accepted.iter().cloned());
            self.messages.sort_by_key(|m| (m.created_at, m.id));
        }
        accepted
    }

    /// Merge a backward-pagination page. An empty page marks the start of
    /// the thread as reached.
    pub fn merge_older(&mut self, batch: Vec<Message>) -> Vec<Message> {
        if batch.is_empty() {
            self.previous_loaded = true;
            return Vec::new();
        }

        let mut accepted: Vec<Message> =
            batch.into_iter().filter(|m| self.seen.insert(m.id)).collect();
        if !accepted.is_empty() {
            accepted.sort_by_key(|m| (m.created_at, m.id));
            self.messages.splice(0..0, accepted.iter().cloned());
            self.messages.sort_by_key(|m| (m.created_at, m.id));
        }
        accepted
    }

    /// Remove a message by identifier. Returns whether an entry was
    /// removed. The watermark stays put; it is a fetch cursor, not a view
    /// of the list.
    pub fn remove(&mut self, message_id: u64) -> bool {
        let before = self.messages.len();
        self.messages.retain(|m| m.id != message_id);
        self.messages.len() != before
    }

    fn bump_watermark(&mut self, ts: DateTime<Utc>) {
        if self.watermark.is_none_or(|w| ts > w) {
            self.watermark = Some(ts);
        }
    }
}
