use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single chat message. The client only ever holds read-only copies;
/// creation and deletion happen server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: u64,
    pub thread_id: u64,
    pub author_id: u64,
    pub body: MessageBody,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageBody {
    Text { text: String },
    /// Image payloads reference a file served by the file endpoint.
    Image { file_id: String },
}

/// A conversation belonging to a group: either free-form chat or a
/// poll-style question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: u64,
    pub group_id: u64,
    pub title: String,
    pub kind: ThreadKind,
    pub scope: ThreadScope,
    pub expires_at: Option<DateTime<Utc>>,
    pub poll: Option<PollInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadKind {
    Chat,
    Question,
}

/// Who is on the other side: a single recipient or the whole group.
/// Read receipts are reported differently for each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadScope {
    Direct,
    Group,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollInfo {
    pub options: Vec<String>,
}

/// Server-tracked record that a message has not been viewed by the current
/// user. The `id` is opaque and only used to delete the marker; the `path`
/// encodes which message it points at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnreadMarker {
    pub id: String,
    pub path: String,
}

impl UnreadMarker {
    /// Markers for a thread share the `chat-{group}-{thread}-` path prefix.
    pub fn in_thread(&self, group_id: u64, thread_id: u64) -> bool {
        self.path.starts_with(&MarkerPath::thread_prefix(group_id, thread_id))
    }

    /// Markers for a group share the `chat-{group}-` path prefix.
    pub fn in_group(&self, group_id: u64) -> bool {
        self.path.starts_with(&MarkerPath::group_prefix(group_id))
    }

    pub fn parsed(&self) -> Result<MarkerPath, MarkerPathError> {
        self.path.parse()
    }
}

/// Parsed form of a marker path: `chat-{group}-{thread}-{message}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkerPath {
    pub group_id: u64,
    pub thread_id: u64,
    pub message_id: u64,
}

#[derive(Debug, Error)]
#[error("malformed unread marker path: {0:?}")]
pub struct MarkerPathError(String);

impl MarkerPath {
    pub fn new(group_id: u64, thread_id: u64, message_id: u64) -> Self {
        Self { group_id, thread_id, message_id }
    }

    pub fn thread_prefix(group_id: u64, thread_id: u64) -> String {
        format!("chat-{}-{}-", group_id, thread_id)
    }

    pub fn group_prefix(group_id: u64) -> String {
        format!("chat-{}-", group_id)
    }
}

impl fmt::Display for MarkerPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chat-{}-{}-{}", self.group_id, self.thread_id, self.message_id)
    }
}

impl FromStr for MarkerPath {
    type Err = MarkerPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || MarkerPathError(s.to_string());

        let rest = s.strip_prefix("chat-").ok_or_else(malformed)?;
        let mut parts = rest.splitn(3, '-');
        let group_id = parts.next().and_then(|p| p.parse().ok()).ok_or_else(malformed)?;
        let thread_id = parts.next().and_then(|p| p.parse().ok()).ok_or_else(malformed)?;
        let message_id = parts.next().and_then(|p| p.parse().ok()).ok_or_else(malformed)?;

        Ok(Self { group_id, thread_id, message_id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marker(path: &str) -> UnreadMarker {
        UnreadMarker { id: format!("m-{}", path), path: path.to_string() }
    }

    #[test]
    fn parse_and_display_agree() {
        let path: MarkerPath = "chat-5-9-1".parse().unwrap();
        assert_eq!(path, MarkerPath::new(5, 9, 1));
        assert_eq!(path.to_string(), "chat-5-9-1");
    }

    #[test]
    fn rejects_malformed_paths() {
        assert!("chat-5-9".parse::<MarkerPath>().is_err());
        assert!("news-5-9-1".parse::<MarkerPath>().is_err());
        assert!("chat-a-b-c".parse::<MarkerPath>().is_err());
        assert!("".parse::<MarkerPath>().is_err());
    }

    #[test]
    fn thread_prefix_does_not_match_longer_ids() {
        // thread 9 must not match thread 99 of the same group
        assert!(marker("chat-5-9-1").in_thread(5, 9));
        assert!(!marker("chat-5-99-1").in_thread(5, 9));
        assert!(!marker("chat-55-9-1").in_thread(5, 9));
    }

    #[test]
    fn group_prefix_matches_all_threads_of_group() {
        assert!(marker("chat-5-9-1").in_group(5));
        assert!(marker("chat-5-12-4").in_group(5));
        assert!(!marker("chat-7-1-1").in_group(5));
        assert!(!marker("chat-51-1-1").in_group(5));
    }

    #[test]
    fn prefix_match_agrees_with_parsed_components() {
        for path in ["chat-5-9-1", "chat-5-99-3", "chat-7-1-1", "chat-51-2-8"] {
            let m = marker(path);
            let parsed = m.parsed().unwrap();
            assert_eq!(m.in_thread(5, 9), parsed.group_id == 5 && parsed.thread_id == 9);
            assert_eq!(m.in_group(5), parsed.group_id == 5);
        }
    }
}
