use chrono::{DateTime, Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::chat::markup;

/// Trip details shown in the conversation header.
///
/// On the wire these are the top-level `name`, `from` and `to` fields of a
/// chat page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMetadata {
    #[serde(rename = "name", default)]
    pub display_name: String,
    #[serde(rename = "from", default)]
    pub origin: String,
    #[serde(rename = "to", default)]
    pub destination: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sender {
    #[serde(rename = "image", default)]
    pub avatar_url: String,
    #[serde(rename = "is_kyc_verified", default)]
    pub verified: bool,
    #[serde(rename = "self", default)]
    pub is_self: bool,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    /// Raw markup as delivered by the server. Never render this directly,
    /// use [`Message::plain_body`].
    #[serde(rename = "message")]
    pub body: String,
    pub sender: Sender,
    #[serde(rename = "time")]
    pub timestamp: String,
}

impl Message {
    pub fn plain_body(&self) -> String {
        markup::to_plain_text(&self.body)
    }

    /// Local wall-clock time of the message as `HH:MM`.
    ///
    /// Falls back to the raw timestamp when it cannot be parsed.
    pub fn display_time(&self) -> String {
        if let Ok(dt) = DateTime::parse_from_rfc3339(&self.timestamp) {
            return dt.with_timezone(&Local).format("%H:%M").to_string();
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%d %H:%M:%S") {
            return naive.format("%H:%M").to_string();
        }
        self.timestamp.clone()
    }
}

/// One decoded response of `GET <base>/chat?page=N`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatPage {
    #[serde(flatten)]
    pub metadata: ConversationMetadata,
    #[serde(rename = "chats", default)]
    pub messages: Vec<Message>,
}
