//! Session store.
//!
//! Single owner of session and message state. Display layers read through
//! `&SessionStore` or an owned `StoreSnapshot`; only the sync controller
//! mutates it.

use std::collections::HashMap;

use chatview_types::{Message, MessageId, Session, SessionId};
use chrono::{DateTime, Utc};

use crate::error::StoreError;

/// In-memory sessions, in display order.
#[derive(Debug, Default, Clone)]
pub struct SessionStore {
    order: Vec<SessionId>,
    sessions: HashMap<SessionId, Session>,
}

/// Sidebar row for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub id: SessionId,
    pub title: String,
    pub last_activity: DateTime<Utc>,
    pub message_count: usize,
}

/// Immutable view of the store's session list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreSnapshot {
    pub sessions: Vec<SessionSummary>,
}

impl StoreSnapshot {
    pub fn position(&self, session_id: &str) -> Option<usize> {
        self.sessions.iter().position(|s| s.id == session_id)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    /// Merges fetched sessions by id.
    ///
    /// Known sessions get their title and timestamps refreshed; a non-empty
    /// local message list is never replaced. New ids are appended in the
    /// order given.
    pub fn upsert_sessions(&mut self, sessions: impl IntoIterator<Item = Session>) {
        for incoming in sessions {
            match self.sessions.get_mut(&incoming.id) {
                Some(existing) => {
                    existing.title = incoming.title;
                    existing.created_at = incoming.created_at;
                    existing.updated_at = incoming.updated_at.or(existing.updated_at);
                    if existing.messages.is_empty() {
                        existing.messages = incoming.messages;
                    }
                }
                None => {
                    self.order.push(incoming.id.clone());
                    self.sessions.insert(incoming.id.clone(), incoming);
                }
            }
        }
    }

    /// Registers a session at the head of the list.
    ///
    /// An already-known id is moved to the front and replaced.
    pub fn insert_front(&mut self, session: Session) {
        self.order.retain(|id| *id != session.id);
        self.order.insert(0, session.id.clone());
        self.sessions.insert(session.id.clone(), session);
    }

    /// Replaces a session's messages wholesale.
    pub fn set_messages(
        &mut self,
        session_id: &str,
        messages: Vec<Message>,
    ) -> Result<(), StoreError> {
        let session = self.session_mut(session_id)?;
        session.messages = messages;
        Ok(())
    }

    /// Appends a message and returns its id.
    pub fn append_message(
        &mut self,
        session_id: &str,
        message: Message,
    ) -> Result<MessageId, StoreError> {
        let session = self.session_mut(session_id)?;
        let id = message.id.clone();
        session.messages.push(message);
        Ok(id)
    }

    /// Applies `mutate` to the session's last message.
    pub fn update_last_message(
        &mut self,
        session_id: &str,
        mutate: impl FnOnce(&mut Message),
    ) -> Result<(), StoreError> {
        let session = self.session_mut(session_id)?;
        let last = session
            .messages
            .last_mut()
            .ok_or_else(|| StoreError::EmptySession(session_id.to_string()))?;
        mutate(last);
        Ok(())
    }

    /// Applies `mutate` to the message with `message_id`.
    pub fn update_message(
        &mut self,
        session_id: &str,
        message_id: &MessageId,
        mutate: impl FnOnce(&mut Message),
    ) -> Result<(), StoreError> {
        let session = self.session_mut(session_id)?;
        let message = session
            .messages
            .iter_mut()
            .find(|m| m.id == *message_id)
            .ok_or_else(|| StoreError::UnknownMessage {
                session_id: session_id.to_string(),
                message_id: message_id.to_string(),
            })?;
        mutate(message);
        Ok(())
    }

    /// Records activity on a session.
    pub fn touch(&mut self, session_id: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        self.session_mut(session_id)?.updated_at = Some(at);
        Ok(())
    }

    /// Messages of a session in stored order; empty when unknown.
    pub fn ordered_messages(&self, session_id: &str) -> &[Message] {
        self.sessions
            .get(session_id)
            .map(|s| s.messages.as_slice())
            .unwrap_or(&[])
    }

    pub fn session(&self, session_id: &str) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    /// Sessions in display order.
    pub fn sessions(&self) -> impl Iterator<Item = &Session> {
        self.order.iter().filter_map(|id| self.sessions.get(id))
    }

    pub fn first_id(&self) -> Option<&SessionId> {
        self.order.first()
    }

    /// Removes a session deleted elsewhere.
    pub fn remove_session(&mut self, session_id: &str) -> Option<Session> {
        let removed = self.sessions.remove(session_id)?;
        self.order.retain(|id| id != session_id);
        Some(removed)
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            sessions: self
                .sessions()
                .map(|s| SessionSummary {
                    id: s.id.clone(),
                    title: s.title.clone(),
                    last_activity: s.last_activity(),
                    message_count: s.messages.len(),
                })
                .collect(),
        }
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.sessions.clear();
    }

    fn session_mut(&mut self, session_id: &str) -> Result<&mut Session, StoreError> {
        self.sessions
            .get_mut(session_id)
            .ok_or_else(|| StoreError::UnknownSession(session_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use chatview_types::{Content, MessageStatus};
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    fn session(id: &str, title: &str) -> Session {
        Session::new(id, title, at(0))
    }

    #[test]
    fn test_upsert_appends_new_ids_in_order() {
        let mut store = SessionStore::new();
        store.upsert_sessions([session("a", "A"), session("b", "B")]);
        store.upsert_sessions([session("c", "C"), session("a", "A2")]);

        let titles: Vec<_> = store.sessions().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, ["A2", "B", "C"]);
    }

    #[test]
    fn test_upsert_keeps_non_empty_local_messages() {
        let mut store = SessionStore::new();
        store.upsert_sessions([session("a", "A")]);
        store.append_message("a", Message::user("a", "hi")).unwrap();

        store.upsert_sessions([session("a", "Renamed")]);

        assert_eq!(store.ordered_messages("a").len(), 1);
        assert_eq!(store.session("a").unwrap().title, "Renamed");
    }

    #[test]
    fn test_insert_front_moves_to_head() {
        let mut store = SessionStore::new();
        store.upsert_sessions([session("a", "A"), session("b", "B")]);
        store.insert_front(session("n", "New Chat"));

        assert_eq!(store.first_id().map(String::as_str), Some("n"));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_append_to_unknown_session_fails() {
        let mut store = SessionStore::new();
        let err = store
            .append_message("ghost", Message::user("ghost", "x"))
            .unwrap_err();
        assert_eq!(err, StoreError::UnknownSession("ghost".into()));
    }

    #[test]
    fn test_update_last_message_on_empty_session_fails() {
        let mut store = SessionStore::new();
        store.upsert_sessions([session("a", "A")]);
        let err = store.update_last_message("a", |_| {}).unwrap_err();
        assert_eq!(err, StoreError::EmptySession("a".into()));
    }

    #[test]
    fn test_update_last_and_targeted_message() {
        let mut store = SessionStore::new();
        store.upsert_sessions([session("a", "A")]);
        let pending = store
            .append_message("a", Message::pending_assistant("a"))
            .unwrap();
        store.append_message("a", Message::user("a", "later")).unwrap();

        store
            .update_message("a", &pending, |m| {
                m.content = Content::text("done");
                m.status = MessageStatus::Committed;
            })
            .unwrap();
        store
            .update_last_message("a", |m| m.content = Content::text("edited"))
            .unwrap();

        let messages = store.ordered_messages("a");
        assert_eq!(messages[0].content, Content::text("done"));
        assert_eq!(messages[1].content, Content::text("edited"));
    }

    #[test]
    fn test_ordered_messages_of_unknown_session_is_empty() {
        let store = SessionStore::new();
        assert!(store.ordered_messages("nope").is_empty());
    }

    #[test]
    fn test_remove_and_snapshot() {
        let mut store = SessionStore::new();
        store.upsert_sessions([session("a", "A"), session("b", "B")]);
        store.append_message("b", Message::user("b", "x")).unwrap();
        store.touch("b", at(50)).unwrap();

        assert!(store.remove_session("a").is_some());
        assert!(store.remove_session("a").is_none());

        let snapshot = store.snapshot();
        assert_eq!(snapshot.sessions.len(), 1);
        assert_eq!(snapshot.sessions[0].message_count, 1);
        assert_eq!(snapshot.sessions[0].last_activity, at(50));
        assert_eq!(snapshot.position("b"), Some(0));
    }
}
