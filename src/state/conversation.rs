//! Append-only conversation log.

use crate::attachment::Attachment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageAuthor {
    User,
    Agent,
    System,
}

impl fmt::Display for MessageAuthor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Agent => write!(f, "agent"),
            Self::System => write!(f, "system"),
        }
    }
}

/// Thumbs-up / thumbs-down rating on a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Good,
    Bad,
}

impl Feedback {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "good" | "up" | "+" => Some(Self::Good),
            "bad" | "down" | "-" => Some(Self::Bad),
            _ => None,
        }
    }
}

/// One entry in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub author: MessageAuthor,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
}

/// Ordered message log. Messages are never removed or edited; only
/// `feedback` can be set after the fact.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    messages: Vec<Message>,
}

impl ConversationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message stamped with the current time and return its id.
    pub fn append(
        &mut self,
        author: MessageAuthor,
        content: impl Into<String>,
        attachments: Vec<Attachment>,
    ) -> String {
        let timestamp = Utc::now();
        let id = message_id(timestamp);
        self.messages.push(Message {
            id: id.clone(),
            author,
            content: content.into(),
            timestamp,
            attachments,
            feedback: None,
        });
        id
    }

    /// Rate a message. Returns `false` if no message has this id.
    pub fn set_feedback(&mut self, id: &str, feedback: Feedback) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.feedback = Some(feedback);
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == id)
    }

    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Creation time in milliseconds plus a random suffix, so messages created
/// within the same millisecond still get distinct ids.
fn message_id(timestamp: DateTime<Utc>) -> String {
    format!(
        "{}-{:016x}",
        timestamp.timestamp_millis(),
        rand::random::<u64>()
    )
}
