use serde::{Deserialize, Serialize};

/// Topic the chat subsystem publishes and subscribes on.
pub const CHAT_TOPIC: &str = "chatmessages";

/// Notifications carried over the push channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "UPPERCASE", rename_all_fields = "camelCase")]
pub enum ChatNotice {
    /// A new message was posted to a thread.
    Created {
        group_id: u64,
        thread_id: u64,
        message_id: u64,
    },

    /// A participant viewed a thread. Published by clients after the
    /// read-acknowledgement sequence; consumed to refresh receipts.
    Read { group_id: u64, thread_id: u64 },

    /// A message was deleted server-side.
    Deleted {
        group_id: u64,
        thread_id: u64,
        message_id: u64,
    },
}

impl ChatNotice {
    pub fn thread_id(&self) -> u64 {
        match self {
            Self::Created { thread_id, .. }
            | Self::Read { thread_id, .. }
            | Self::Deleted { thread_id, .. } => *thread_id,
        }
    }

    pub fn group_id(&self) -> u64 {
        match self {
            Self::Created { group_id, .. }
            | Self::Read { group_id, .. }
            | Self::Deleted { group_id, .. } => *group_id,
        }
    }

    /// The message the notice refers to, if the operation carries one.
    pub fn message_id(&self) -> Option<u64> {
        match self {
            Self::Created { message_id, .. } | Self::Deleted { message_id, .. } => {
                Some(*message_id)
            }
            Self::Read { .. } => None,
        }
    }
}

/// Frames exchanged with the message broker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PushFrame {
    /// Client asks the broker to deliver a topic's notices.
    Subscribe { topic: String },

    /// Client publishes a notice to a topic.
    Publish { topic: String, notice: ChatNotice },

    /// Broker delivers a notice published on a subscribed topic.
    Event { topic: String, notice: ChatNotice },
}
