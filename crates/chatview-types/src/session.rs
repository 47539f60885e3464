//! Sessions and messages.
//!
//! Wire payloads are decoded through private `Wire*` structs so that
//! field aliases, missing message lists and malformed content are handled
//! in one place. A message whose content fails `content::parse` is still
//! kept (in order) with `MessageStatus::Unsupported`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::content::{self, Content, ContentFormatError};

/// Session identifier (opaque, assigned by the session API).
pub type SessionId = String;

/// Default title for sessions created without one.
pub const DEFAULT_SESSION_TITLE: &str = "New Chat";

/// Message identifier.
///
/// Server ids may be integers or strings; optimistic local messages use
/// `local-<uuid>` ids that never collide with server ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Fresh id for a message that only exists locally.
    pub fn local() -> Self {
        Self(format!("local-{}", Uuid::new_v4()))
    }

    pub fn is_local(&self) -> bool {
        self.0.starts_with("local-")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for MessageId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Str(String),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => MessageId::from(n),
            Raw::Str(s) => MessageId(s),
        })
    }
}

/// Message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    /// Legacy backends label replies `"ai"`.
    #[serde(alias = "ai")]
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Local delivery state of a message.
///
/// Only the optimistic assistant placeholder ever leaves `Pending`, and it
/// does so exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MessageStatus {
    /// Confirmed by the server (fetched, or a settled reply).
    #[default]
    Committed,
    /// Placeholder awaiting the assistant reply.
    Pending,
    /// Placeholder resolved to an error notice.
    Failed,
    /// Fetched content matched neither content shape.
    Unsupported(ContentFormatError),
}

/// One chat message.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "WireMessage")]
pub struct Message {
    pub id: MessageId,
    pub session_id: SessionId,
    pub role: Role,
    pub content: Content,
    pub created_at: DateTime<Utc>,
    pub status: MessageStatus,
}

impl Message {
    /// Optimistic user message.
    pub fn user(session_id: impl Into<SessionId>, text: impl Into<String>) -> Self {
        Self {
            id: MessageId::local(),
            session_id: session_id.into(),
            role: Role::User,
            content: Content::text(text),
            created_at: Utc::now(),
            status: MessageStatus::Committed,
        }
    }

    /// Assistant placeholder with empty content.
    pub fn pending_assistant(session_id: impl Into<SessionId>) -> Self {
        Self {
            id: MessageId::local(),
            session_id: session_id.into(),
            role: Role::Assistant,
            content: Content::text(""),
            created_at: Utc::now(),
            status: MessageStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == MessageStatus::Pending
    }
}

#[derive(Deserialize)]
struct WireMessage {
    id: MessageId,
    #[serde(default, alias = "sessionId", alias = "chat_session_id")]
    session_id: SessionId,
    role: Role,
    #[serde(default)]
    content: Value,
    #[serde(alias = "createdAt", deserialize_with = "crate::time::deserialize")]
    created_at: DateTime<Utc>,
}

impl From<WireMessage> for Message {
    fn from(wire: WireMessage) -> Self {
        let (content, status) = match content::parse(&wire.content) {
            Ok(content) => (content, MessageStatus::Committed),
            Err(err) => (Content::text(""), MessageStatus::Unsupported(err)),
        };
        Self {
            id: wire.id,
            session_id: wire.session_id,
            role: wire.role,
            content,
            created_at: wire.created_at,
            status,
        }
    }
}

/// A chat session.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "WireSession")]
pub struct Session {
    pub id: SessionId,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Ordered by creation time; never reshuffled once stored.
    pub messages: Vec<Message>,
}

impl Session {
    /// Session with no messages.
    pub fn new(
        id: impl Into<SessionId>,
        title: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            created_at,
            updated_at: None,
            messages: Vec::new(),
        }
    }

    /// Most recent activity timestamp.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }
}

fn default_title() -> String {
    DEFAULT_SESSION_TITLE.to_string()
}

#[derive(Deserialize)]
struct WireSession {
    id: SessionId,
    #[serde(default = "default_title")]
    title: String,
    #[serde(alias = "createdAt", deserialize_with = "crate::time::deserialize")]
    created_at: DateTime<Utc>,
    #[serde(
        default,
        alias = "updatedAt",
        deserialize_with = "crate::time::deserialize_optional"
    )]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    messages: Option<Vec<Message>>,
}

impl From<WireSession> for Session {
    fn from(wire: WireSession) -> Self {
        let mut messages = wire.messages.unwrap_or_default();
        for message in &mut messages {
            if message.session_id.is_empty() {
                message.session_id.clone_from(&wire.id);
            }
        }
        // Stable: equal timestamps keep server order.
        messages.sort_by_key(|m| m.created_at);
        Self {
            id: wire.id,
            title: wire.title,
            created_at: wire.created_at,
            updated_at: wire.updated_at,
            messages,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_session_decodes_backend_shape() {
        let session: Session = serde_json::from_value(json!({
            "id": "s1",
            "user_id": 1,
            "title": "Hello...",
            "created_at": "2024-01-01T10:00:00",
            "updated_at": null,
            "messages": [
                {"id": 2, "chat_session_id": "s1", "role": "ai",
                 "content": {"text": "hi!"}, "created_at": "2024-01-01T10:00:05"},
                {"id": 1, "chat_session_id": "s1", "role": "user",
                 "content": {"text": "hello"}, "created_at": "2024-01-01T10:00:01"}
            ]
        }))
        .unwrap();

        assert_eq!(session.id, "s1");
        assert!(session.updated_at.is_none());
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].role, Role::User);
        assert_eq!(session.messages[1].role, Role::Assistant);
        assert_eq!(session.messages[1].id, MessageId::from(2));
    }

    #[test]
    fn test_session_without_messages() {
        let session: Session = serde_json::from_value(json!({
            "id": "s2",
            "createdAt": "2024-01-01T10:00:00Z"
        }))
        .unwrap();
        assert_eq!(session.title, DEFAULT_SESSION_TITLE);
        assert!(session.messages.is_empty());
    }

    #[test]
    fn test_message_fills_session_id_from_parent() {
        let session: Session = serde_json::from_value(json!({
            "id": "s3",
            "created_at": "2024-01-01T10:00:00Z",
            "messages": [{"id": "m1", "role": "user", "content": {"text": "x"},
                          "created_at": "2024-01-01T10:00:00Z"}]
        }))
        .unwrap();
        assert_eq!(session.messages[0].session_id, "s3");
    }

    #[test]
    fn test_malformed_content_is_kept_as_unsupported() {
        let message: Message = serde_json::from_value(json!({
            "id": 9,
            "session_id": "s",
            "role": "assistant",
            "content": {"blocks": [{"block_type": "audio"}]},
            "created_at": "2024-01-01T10:00:00Z"
        }))
        .unwrap();
        assert!(matches!(message.status, MessageStatus::Unsupported(_)));
    }

    #[test]
    fn test_local_ids_are_distinct() {
        let a = Message::user("s", "x");
        let b = Message::pending_assistant("s");
        assert_ne!(a.id, b.id);
        assert!(a.id.is_local());
        assert!(b.is_pending());
        assert!(b.content.is_empty_text());
    }
}
