//! Core inbox types: conversations and messages

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Stable conversation identifier
pub type ConversationId = String;

/// Message identifier, unique across all conversations
pub type MessageId = String;

/// A named thread of messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    /// Display name
    pub name: String,
    /// Timestamp of the most recent activity
    pub last_activity: DateTime<Utc>,
    /// One-line preview of the most recent message
    #[serde(default)]
    pub last_message: String,
    /// Cached count of unread incoming messages.
    ///
    /// Once messages for the conversation are loaded the store keeps this
    /// equal to the number of messages with `is_read == false`. Before that
    /// it holds whatever the loader supplied.
    #[serde(default)]
    pub unread_count: usize,
    #[serde(default)]
    pub is_online: bool,
    #[serde(skip)]
    pub is_typing: bool,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new(
        id: impl Into<ConversationId>,
        name: impl Into<String>,
        last_activity: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            last_activity,
            last_message: String::new(),
            unread_count: 0,
            is_online: false,
            is_typing: false,
        }
    }
}

/// Annotation applied to a message by the operator
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    #[default]
    None,
    Interesting,
    Prepared,
    Considered,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::None => "none",
            MessageStatus::Interesting => "interesting",
            MessageStatus::Prepared => "prepared",
            MessageStatus::Considered => "considered",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(MessageStatus::None),
            "interesting" => Ok(MessageStatus::Interesting),
            "prepared" => Ok(MessageStatus::Prepared),
            "considered" => Ok(MessageStatus::Considered),
            other => Err(Error::InvalidStatus(other.to_string())),
        }
    }
}

/// Type-specific message payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageBody {
    /// Plain text
    Text { content: String },
    /// Photo or other image
    Image {
        url: String,
        #[serde(default)]
        caption: Option<String>,
    },
    /// Voice note
    Voice { url: String, duration_secs: u32 },
    /// Attached file
    Document {
        file_name: String,
        file_size: String,
        url: String,
    },
}

impl MessageBody {
    /// Create a text body
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    /// Text content, if this is a text message
    pub fn as_text(&self) -> Option<&str> {
        match self {
            MessageBody::Text { content } => Some(content),
            _ => None,
        }
    }

    /// One-line textual rendering of the payload
    pub fn preview(&self) -> String {
        match self {
            MessageBody::Text { content } => content.clone(),
            MessageBody::Image { caption, .. } => match caption {
                Some(caption) if !caption.is_empty() => format!("[image] {}", caption),
                _ => "[image]".to_string(),
            },
            MessageBody::Voice { duration_secs, .. } => {
                format!("[voice {}:{:02}]", duration_secs / 60, duration_secs % 60)
            }
            MessageBody::Document {
                file_name,
                file_size,
                ..
            } => format!("[document] {} ({})", file_name, file_size),
        }
    }
}

/// One unit of conversation content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub body: MessageBody,
    pub timestamp: DateTime<Utc>,
    pub is_outgoing: bool,
    pub is_read: bool,
    #[serde(default)]
    pub status: MessageStatus,
    #[serde(default)]
    pub is_bookmarked: bool,
    /// Short reaction labels in the order they were added
    #[serde(default)]
    pub reactions: Vec<String>,
}

impl Message {
    /// An incoming message, initially unread
    pub fn incoming(id: impl Into<MessageId>, body: MessageBody, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            body,
            timestamp,
            is_outgoing: false,
            is_read: false,
            status: MessageStatus::None,
            is_bookmarked: false,
            reactions: Vec::new(),
        }
    }

    /// An outgoing message; always read
    pub fn outgoing(id: impl Into<MessageId>, body: MessageBody, timestamp: DateTime<Utc>) -> Self {
        Self {
            is_outgoing: true,
            is_read: true,
            ..Self::incoming(id, body, timestamp)
        }
    }

    /// Set the read flag (ignored for outgoing messages)
    pub fn with_read(mut self, is_read: bool) -> Self {
        self.is_read = is_read || self.is_outgoing;
        self
    }

    /// Whether this message counts toward the unread projection
    pub fn is_unread(&self) -> bool {
        !self.is_read
    }

    /// Enforce that outgoing messages are read
    pub(crate) fn normalize(&mut self) {
        if self.is_outgoing {
            self.is_read = true;
        }
    }
}
