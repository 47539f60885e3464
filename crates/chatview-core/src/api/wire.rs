//! Request and response bodies of the session API.

use chatview_types::Session;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub(super) struct SessionList {
    #[serde(default)]
    pub sessions: Vec<Session>,
}

#[derive(Debug, Serialize)]
pub(super) struct CreateSessionRequest<'a> {
    pub title: &'a str,
}

#[derive(Debug, Serialize)]
pub(super) struct ChatRequest<'a> {
    pub query: &'a str,
    #[serde(rename = "chatId")]
    pub chat_id: &'a str,
}

/// Reply to a chat request.
///
/// `response` stays raw: it is either a content document or a plain
/// string, and is decoded by `chatview_types::parse_reply`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatReply {
    pub response: Value,
    #[serde(default, alias = "chatId")]
    pub chat_id: Option<String>,
}
