//! Sync controller reducer.
//!
//! Handles session discovery, lazy message loading, optimistic sends and
//! session creation. Every trigger runs to completion; the only suspension
//! points are the effects handed back to the runtime.

use std::collections::HashMap;

use chatview_types::{
    Content, DEFAULT_SESSION_TITLE, Message, MessageStatus, Session, SessionId, parse_reply,
};
use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::state::{DiscoveryState, LoadState, SendOutcome, SendState, SendTicket, TicketSeq};
use crate::api::{ApiResult, ChatReply};
use crate::error::{NetworkError, StoreError};
use crate::store::SessionStore;

/// Content of a placeholder whose send failed.
pub const SEND_FAILED_TEXT: &str = "Error: Could not get a response.";

/// Input to the controller: user intents and effect completions.
#[derive(Debug, Clone)]
pub enum SyncEvent {
    /// Discover the identity's sessions.
    Init,
    Select {
        session_id: SessionId,
    },
    Submit {
        text: String,
    },
    CreateSession {
        title: Option<String>,
    },
    /// Forget a session's loaded messages so its next selection re-fetches.
    Invalidate {
        session_id: SessionId,
    },
    /// The session was deleted elsewhere.
    SessionRemoved {
        session_id: SessionId,
    },
    SessionsListed {
        result: ApiResult<Vec<Session>>,
    },
    MessagesLoaded {
        session_id: SessionId,
        result: ApiResult<Session>,
    },
    ReplyReceived {
        ticket: SendTicket,
        result: ApiResult<ChatReply>,
    },
    SessionCreated {
        result: ApiResult<Session>,
    },
}

/// Network work requested by the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEffect {
    FetchSessions { identity: String },
    FetchMessages { session_id: SessionId },
    SendMessage { ticket: SendTicket, query: String },
    CreateSession { identity: String, title: String },
}

impl SyncEffect {
    /// Completion event for an effect that could not run to completion.
    pub fn failed(self, error: NetworkError) -> SyncEvent {
        match self {
            SyncEffect::FetchSessions { .. } => SyncEvent::SessionsListed { result: Err(error) },
            SyncEffect::FetchMessages { session_id } => SyncEvent::MessagesLoaded {
                session_id,
                result: Err(error),
            },
            SyncEffect::SendMessage { ticket, .. } => SyncEvent::ReplyReceived {
                ticket,
                result: Err(error),
            },
            SyncEffect::CreateSession { .. } => SyncEvent::SessionCreated { result: Err(error) },
        }
    }
}

/// Owns the session store and the per-session load and send state.
#[derive(Debug)]
pub struct SyncController {
    identity: String,
    store: SessionStore,
    selected: Option<SessionId>,
    loads: HashMap<SessionId, LoadState>,
    sends: HashMap<SessionId, SendState>,
    tickets: TicketSeq,
    discovery: DiscoveryState,
    creating: bool,
}

impl SyncController {
    pub fn new(identity: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            store: SessionStore::new(),
            selected: None,
            loads: HashMap::new(),
            sends: HashMap::new(),
            tickets: TicketSeq::default(),
            discovery: DiscoveryState::default(),
            creating: false,
        }
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn selected_session_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_session(&self) -> Option<&Session> {
        self.selected.as_deref().and_then(|id| self.store.session(id))
    }

    pub fn load_state(&self, session_id: &str) -> LoadState {
        self.loads.get(session_id).cloned().unwrap_or_default()
    }

    pub fn send_state(&self, session_id: &str) -> SendState {
        self.sends.get(session_id).cloned().unwrap_or_default()
    }

    pub fn is_sending(&self, session_id: &str) -> bool {
        self.sends.get(session_id).is_some_and(SendState::is_sending)
    }

    /// Whether the selected session has a send in flight.
    pub fn is_selected_sending(&self) -> bool {
        self.selected.as_deref().is_some_and(|id| self.is_sending(id))
    }

    pub fn discovery(&self) -> &DiscoveryState {
        &self.discovery
    }

    pub fn is_creating(&self) -> bool {
        self.creating
    }

    /// Drops all state, e.g. when switching identity.
    pub fn reset(&mut self) {
        self.store.clear();
        self.selected = None;
        self.loads.clear();
        self.sends.clear();
        self.discovery = DiscoveryState::NotStarted;
        self.creating = false;
    }

    /// Applies one event and returns the effects to run.
    pub fn handle(&mut self, event: SyncEvent) -> Vec<SyncEffect> {
        match event {
            SyncEvent::Init => self.on_init(),
            SyncEvent::Select { session_id } => self.on_select(session_id),
            SyncEvent::Submit { text } => self.on_submit(text),
            SyncEvent::CreateSession { title } => self.on_create(title),
            SyncEvent::Invalidate { session_id } => self.on_invalidate(&session_id),
            SyncEvent::SessionRemoved { session_id } => {
                self.on_session_removed(&session_id);
                vec![]
            }
            SyncEvent::SessionsListed { result } => self.on_sessions_listed(result),
            SyncEvent::MessagesLoaded { session_id, result } => {
                self.on_messages_loaded(session_id, result);
                vec![]
            }
            SyncEvent::ReplyReceived { ticket, result } => {
                self.on_reply(&ticket, result);
                vec![]
            }
            SyncEvent::SessionCreated { result } => {
                self.on_session_created(result);
                vec![]
            }
        }
    }

    fn on_init(&mut self) -> Vec<SyncEffect> {
        if self.discovery == DiscoveryState::Fetching {
            debug!("session discovery already in flight");
            return vec![];
        }
        self.discovery = DiscoveryState::Fetching;
        vec![SyncEffect::FetchSessions {
            identity: self.identity.clone(),
        }]
    }

    fn on_sessions_listed(&mut self, result: ApiResult<Vec<Session>>) -> Vec<SyncEffect> {
        match result {
            Ok(sessions) => {
                info!(count = sessions.len(), "sessions discovered");
                self.discovery = DiscoveryState::Done;
                self.store.upsert_sessions(sessions.into_iter().map(|mut s| {
                    s.messages.clear();
                    s
                }));
                if self.selected.is_none()
                    && let Some(first) = self.store.first_id().cloned()
                {
                    return self.on_select(first);
                }
                vec![]
            }
            Err(err) => {
                warn!(error = %err, "session discovery failed");
                self.discovery = DiscoveryState::Failed(err.to_string());
                vec![]
            }
        }
    }

    fn on_select(&mut self, session_id: SessionId) -> Vec<SyncEffect> {
        if !self.store.contains(&session_id) {
            warn!(session_id = %session_id, "ignoring selection of unknown session");
            return vec![];
        }
        self.selected = Some(session_id.clone());
        self.lazy_load(session_id)
    }

    fn lazy_load(&mut self, session_id: SessionId) -> Vec<SyncEffect> {
        if self.is_sending(&session_id) {
            debug!(session_id = %session_id, "send in flight, not reloading");
            return vec![];
        }
        let state = self.loads.entry(session_id.clone()).or_default();
        if !state.needs_fetch() {
            return vec![];
        }
        *state = LoadState::Loading;
        debug!(session_id = %session_id, "loading messages");
        vec![SyncEffect::FetchMessages { session_id }]
    }

    fn on_messages_loaded(&mut self, session_id: SessionId, result: ApiResult<Session>) {
        if !self.store.contains(&session_id) {
            debug!(session_id = %session_id, "dropping messages for removed session");
            self.loads.remove(&session_id);
            return;
        }
        match result {
            Ok(session) => {
                debug!(
                    session_id = %session_id,
                    count = session.messages.len(),
                    "messages loaded"
                );
                if let Err(err) = self.store.set_messages(&session_id, session.messages) {
                    report_store_error(&err);
                }
                self.loads.insert(session_id, LoadState::Loaded);
            }
            Err(err) => {
                warn!(session_id = %session_id, error = %err, "failed to load messages");
                self.loads
                    .insert(session_id, LoadState::Failed(err.to_string()));
            }
        }
    }

    fn on_submit(&mut self, text: String) -> Vec<SyncEffect> {
        if text.trim().is_empty() {
            return vec![];
        }
        let Some(session_id) = self.selected.clone() else {
            debug!("submit ignored: no session selected");
            return vec![];
        };
        if self.load_state(&session_id).is_loading() {
            debug!(session_id = %session_id, "submit ignored: session is loading");
            return vec![];
        }
        if self.is_sending(&session_id) {
            debug!(session_id = %session_id, "submit ignored: send in flight");
            return vec![];
        }

        let appended = self
            .store
            .append_message(&session_id, Message::user(session_id.clone(), text.clone()))
            .and_then(|_| {
                self.store
                    .append_message(&session_id, Message::pending_assistant(session_id.clone()))
            });
        let placeholder_id = match appended {
            Ok(id) => id,
            Err(err) => {
                report_store_error(&err);
                return vec![];
            }
        };

        let ticket = SendTicket {
            seq: self.tickets.next_seq(),
            session_id: session_id.clone(),
            placeholder_id,
        };
        self.sends
            .insert(session_id, SendState::Sending(ticket.clone()));
        vec![SyncEffect::SendMessage {
            ticket,
            query: text,
        }]
    }

    fn on_reply(&mut self, ticket: &SendTicket, result: ApiResult<ChatReply>) {
        let session_id = &ticket.session_id;
        let resolved = match result {
            Ok(reply) => {
                if let Some(chat_id) = reply.chat_id.as_deref()
                    && chat_id != session_id
                {
                    warn!(
                        session_id = %session_id,
                        chat_id,
                        "reply names a different session, applying to the sending session"
                    );
                }
                parse_reply(&reply.response).map_err(|e| e.to_string())
            }
            Err(err) => Err(err.to_string()),
        };

        let outcome = match resolved {
            Ok(content) => {
                let applied = self.resolve_placeholder(ticket, |m| {
                    m.content = content;
                    m.status = MessageStatus::Committed;
                });
                if applied && let Err(err) = self.store.touch(session_id, Utc::now()) {
                    report_store_error(&err);
                }
                SendOutcome::Success
            }
            Err(reason) => {
                warn!(session_id = %session_id, error = %reason, "send failed");
                self.resolve_placeholder(ticket, |m| {
                    m.content = Content::text(SEND_FAILED_TEXT);
                    m.status = MessageStatus::Failed;
                });
                SendOutcome::Error(reason)
            }
        };

        if self.store.contains(session_id) {
            self.sends
                .insert(session_id.clone(), SendState::Settled(outcome));
        } else {
            self.sends.remove(session_id);
        }
    }

    /// Applies `mutate` to the ticket's placeholder. Returns whether it was found.
    fn resolve_placeholder(
        &mut self,
        ticket: &SendTicket,
        mutate: impl FnOnce(&mut Message),
    ) -> bool {
        let session_id = &ticket.session_id;
        if !self.store.contains(session_id) {
            debug!(session_id = %session_id, "reply for removed session dropped");
            return false;
        }

        let placeholder_is_last = self
            .store
            .ordered_messages(session_id)
            .last()
            .is_some_and(|m| m.id == ticket.placeholder_id);
        let result = if placeholder_is_last {
            self.store.update_last_message(session_id, mutate)
        } else {
            debug!(session_id = %session_id, "placeholder is not the last message");
            self.store
                .update_message(session_id, &ticket.placeholder_id, mutate)
        };

        match result {
            Ok(()) => true,
            Err(StoreError::UnknownMessage { .. }) => {
                warn!(session_id = %session_id, "placeholder no longer present");
                false
            }
            Err(err) => {
                report_store_error(&err);
                false
            }
        }
    }

    fn on_create(&mut self, title: Option<String>) -> Vec<SyncEffect> {
        if self.creating {
            debug!("session creation already in flight");
            return vec![];
        }
        self.creating = true;
        let title = title
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_SESSION_TITLE.to_string());
        vec![SyncEffect::CreateSession {
            identity: self.identity.clone(),
            title,
        }]
    }

    fn on_session_created(&mut self, result: ApiResult<Session>) {
        self.creating = false;
        match result {
            Ok(session) => {
                let session_id = session.id.clone();
                info!(session_id = %session_id, "session created");
                self.store.insert_front(session);
                self.loads.insert(session_id.clone(), LoadState::Loaded);
                self.selected = Some(session_id);
            }
            Err(err) => warn!(error = %err, "failed to create session"),
        }
    }

    fn on_invalidate(&mut self, session_id: &str) -> Vec<SyncEffect> {
        if !self.store.contains(session_id) {
            return vec![];
        }
        if self.load_state(session_id).is_loading() || self.is_sending(session_id) {
            debug!(session_id, "invalidate ignored: session busy");
            return vec![];
        }
        self.loads.insert(session_id.to_string(), LoadState::Unloaded);
        if self.selected.as_deref() == Some(session_id) {
            return self.lazy_load(session_id.to_string());
        }
        vec![]
    }

    fn on_session_removed(&mut self, session_id: &str) {
        self.store.remove_session(session_id);
        self.loads.remove(session_id);
        self.sends.remove(session_id);
        if self.selected.as_deref() == Some(session_id) {
            self.selected = None;
        }
    }
}

fn report_store_error(err: &StoreError) {
    error!(error = %err, "session store invariant violated");
    debug_assert!(false, "session store invariant violated: {err}");
}

#[cfg(test)]
mod tests {
    use chatview_types::{Block, Role, TextBlock};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::*;
    use crate::error::NetworkErrorKind;

    fn session(id: &str) -> Session {
        Session::new(id, format!("title {id}"), Utc.timestamp_opt(1_700_000_000, 0).unwrap())
    }

    fn loaded_session(id: &str, texts: &[&str]) -> Session {
        let mut s = session(id);
        s.messages = texts.iter().map(|t| Message::user(id, *t)).collect();
        s
    }

    /// Controller with sessions `a` and `b` discovered and `a` loaded and selected.
    fn ready() -> SyncController {
        let mut c = SyncController::new("1");
        c.handle(SyncEvent::Init);
        c.handle(SyncEvent::SessionsListed {
            result: Ok(vec![session("a"), session("b")]),
        });
        c.handle(SyncEvent::MessagesLoaded {
            session_id: "a".into(),
            result: Ok(loaded_session("a", &["old"])),
        });
        c
    }

    fn submit(c: &mut SyncController, text: &str) -> SendTicket {
        let effects = c.handle(SyncEvent::Submit { text: text.into() });
        match effects.as_slice() {
            [SyncEffect::SendMessage { ticket, .. }] => ticket.clone(),
            other => panic!("expected one send, got {other:?}"),
        }
    }

    fn reply(text: &str, chat_id: &str) -> ApiResult<ChatReply> {
        Ok(ChatReply {
            response: json!(text),
            chat_id: Some(chat_id.to_string()),
        })
    }

    #[test]
    fn test_init_fetches_and_selects_first_session() {
        let mut c = SyncController::new("7");
        assert_eq!(
            c.handle(SyncEvent::Init),
            vec![SyncEffect::FetchSessions {
                identity: "7".into()
            }]
        );
        assert!(c.handle(SyncEvent::Init).is_empty());

        let effects = c.handle(SyncEvent::SessionsListed {
            result: Ok(vec![loaded_session("a", &["x"]), session("b")]),
        });

        assert_eq!(c.selected_session_id(), Some("a"));
        assert_eq!(
            effects,
            vec![SyncEffect::FetchMessages {
                session_id: "a".into()
            }]
        );
        // Listed messages are stripped; the lazy-load supplies them.
        assert!(c.store().ordered_messages("a").is_empty());
        assert_eq!(c.load_state("a"), LoadState::Loading);
        assert_eq!(c.load_state("b"), LoadState::Unloaded);
    }

    #[test]
    fn test_discovery_failure_leaves_store_empty() {
        let mut c = SyncController::new("1");
        c.handle(SyncEvent::Init);
        let effects = c.handle(SyncEvent::SessionsListed {
            result: Err(NetworkError::transport("connection refused")),
        });

        assert!(effects.is_empty());
        assert!(c.store().is_empty());
        assert!(matches!(c.discovery(), DiscoveryState::Failed(_)));
        assert_eq!(c.selected_session_id(), None);
    }

    #[test]
    fn test_loading_guard_emits_single_fetch() {
        let mut c = ready();
        let first = c.handle(SyncEvent::Select {
            session_id: "b".into(),
        });
        c.handle(SyncEvent::Select {
            session_id: "a".into(),
        });
        let again = c.handle(SyncEvent::Select {
            session_id: "b".into(),
        });

        assert_eq!(first.len(), 1);
        assert!(again.is_empty());
        assert_eq!(c.load_state("b"), LoadState::Loading);
    }

    #[test]
    fn test_loaded_session_is_not_refetched() {
        let mut c = ready();
        c.handle(SyncEvent::Select {
            session_id: "b".into(),
        });
        let effects = c.handle(SyncEvent::Select {
            session_id: "a".into(),
        });
        assert!(effects.is_empty());
        assert_eq!(c.store().ordered_messages("a").len(), 1);
    }

    #[test]
    fn test_failed_load_is_retried_on_reselect() {
        let mut c = ready();
        c.handle(SyncEvent::Select {
            session_id: "b".into(),
        });
        c.handle(SyncEvent::MessagesLoaded {
            session_id: "b".into(),
            result: Err(NetworkError::http_status(500, "")),
        });
        assert!(matches!(c.load_state("b"), LoadState::Failed(_)));
        assert!(c.store().ordered_messages("b").is_empty());

        c.handle(SyncEvent::Select {
            session_id: "a".into(),
        });
        let retry = c.handle(SyncEvent::Select {
            session_id: "b".into(),
        });
        assert_eq!(
            retry,
            vec![SyncEffect::FetchMessages {
                session_id: "b".into()
            }]
        );
    }

    #[test]
    fn test_invalidate_refetches_selected_session() {
        let mut c = ready();
        let effects = c.handle(SyncEvent::Invalidate {
            session_id: "a".into(),
        });
        assert_eq!(
            effects,
            vec![SyncEffect::FetchMessages {
                session_id: "a".into()
            }]
        );

        // Unselected: marked, fetched on next selection.
        c.handle(SyncEvent::Invalidate {
            session_id: "b".into(),
        });
        assert_eq!(c.load_state("b"), LoadState::Unloaded);
    }

    #[test]
    fn test_submit_appends_user_and_pending_placeholder() {
        let mut c = ready();
        let effects = c.handle(SyncEvent::Submit {
            text: "  hello  ".into(),
        });

        let [SyncEffect::SendMessage { ticket, query }] = effects.as_slice() else {
            panic!("expected send effect, got {effects:?}");
        };
        assert_eq!(query, "  hello  ");
        assert_eq!(ticket.session_id, "a");

        let messages = c.store().ordered_messages("a");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, Content::text("  hello  "));
        assert_eq!(messages[2].role, Role::Assistant);
        assert!(messages[2].is_pending());
        assert_eq!(messages[2].id, ticket.placeholder_id);
        assert!(c.is_selected_sending());
    }

    #[test]
    fn test_submit_rejections_leave_store_untouched() {
        let mut c = ready();
        assert!(c.handle(SyncEvent::Submit { text: "   ".into() }).is_empty());
        assert!(c.handle(SyncEvent::Submit { text: String::new() }).is_empty());

        submit(&mut c, "first");
        let before = c.store().ordered_messages("a").len();
        assert!(c.handle(SyncEvent::Submit { text: "second".into() }).is_empty());
        assert_eq!(c.store().ordered_messages("a").len(), before);

        c.handle(SyncEvent::Select {
            session_id: "b".into(),
        });
        assert!(c.handle(SyncEvent::Submit { text: "while loading".into() }).is_empty());
        assert!(c.store().ordered_messages("b").is_empty());

        let mut empty = SyncController::new("1");
        assert!(empty.handle(SyncEvent::Submit { text: "hi".into() }).is_empty());
    }

    #[test]
    fn test_successful_reply_commits_placeholder() {
        let mut c = ready();
        let ticket = submit(&mut c, "hi");
        c.handle(SyncEvent::ReplyReceived {
            ticket,
            result: Ok(ChatReply {
                response: json!({"blocks": [{"block_type": "text", "text": "**hey**"}]}),
                chat_id: Some("a".into()),
            }),
        });

        let last = c.store().ordered_messages("a").last().unwrap().clone();
        assert_eq!(last.status, MessageStatus::Committed);
        assert_eq!(
            last.content,
            Content::Blocks {
                blocks: vec![Block::Text(TextBlock {
                    title: None,
                    text: "**hey**".into()
                })]
            }
        );
        assert!(!c.is_sending("a"));
        assert_eq!(c.send_state("a"), SendState::Settled(SendOutcome::Success));
        assert!(c.store().session("a").unwrap().updated_at.is_some());
    }

    #[test]
    fn test_reply_applies_to_sending_session_after_switch() {
        let mut c = ready();
        let ticket = submit(&mut c, "hi");
        c.handle(SyncEvent::Select {
            session_id: "b".into(),
        });
        c.handle(SyncEvent::ReplyReceived {
            ticket,
            result: reply("for a", "a"),
        });

        assert_eq!(
            c.store().ordered_messages("a").last().unwrap().content,
            Content::text("for a")
        );
        assert!(c.store().ordered_messages("b").is_empty());
        assert_eq!(c.selected_session_id(), Some("b"));
    }

    #[test]
    fn test_mismatched_chat_id_is_ignored() {
        let mut c = ready();
        let ticket = submit(&mut c, "hi");
        c.handle(SyncEvent::ReplyReceived {
            ticket,
            result: reply("ok", "somewhere-else"),
        });
        assert_eq!(
            c.store().ordered_messages("a").last().unwrap().content,
            Content::text("ok")
        );
    }

    #[test]
    fn test_failed_send_marks_placeholder_and_keeps_user_message() {
        let mut c = ready();
        let ticket = submit(&mut c, "hi");
        c.handle(SyncEvent::ReplyReceived {
            ticket,
            result: Err(NetworkError::timeout("Request timed out")),
        });

        let messages = c.store().ordered_messages("a");
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].content, Content::text("hi"));
        assert_eq!(messages[2].content, Content::text(SEND_FAILED_TEXT));
        assert_eq!(messages[2].status, MessageStatus::Failed);
        assert!(!c.is_sending("a"));

        // Sending is possible again.
        submit(&mut c, "retry");
    }

    #[test]
    fn test_malformed_reply_content_is_a_failure() {
        let mut c = ready();
        let ticket = submit(&mut c, "hi");
        c.handle(SyncEvent::ReplyReceived {
            ticket,
            result: Ok(ChatReply {
                response: json!({"blocks": [{"block_type": "video"}]}),
                chat_id: None,
            }),
        });

        let last = c.store().ordered_messages("a").last().unwrap();
        assert_eq!(last.status, MessageStatus::Failed);
        assert!(matches!(c.send_state("a"), SendState::Settled(SendOutcome::Error(_))));
    }

    #[test]
    fn test_reply_for_removed_session_is_dropped() {
        let mut c = ready();
        let ticket = submit(&mut c, "hi");
        c.handle(SyncEvent::SessionRemoved {
            session_id: "a".into(),
        });
        assert_eq!(c.selected_session_id(), None);

        c.handle(SyncEvent::ReplyReceived {
            ticket,
            result: reply("late", "a"),
        });
        assert!(c.store().session("a").is_none());
        assert_eq!(c.send_state("a"), SendState::Idle);
    }

    #[test]
    fn test_create_session_dedupes_and_selects_result() {
        let mut c = ready();
        let effects = c.handle(SyncEvent::CreateSession { title: None });
        assert_eq!(
            effects,
            vec![SyncEffect::CreateSession {
                identity: "1".into(),
                title: DEFAULT_SESSION_TITLE.into()
            }]
        );
        assert!(c.handle(SyncEvent::CreateSession { title: None }).is_empty());

        let effects = c.handle(SyncEvent::SessionCreated {
            result: Ok(session("n")),
        });
        assert!(effects.is_empty());
        assert_eq!(c.store().first_id().map(String::as_str), Some("n"));
        assert_eq!(c.selected_session_id(), Some("n"));
        assert_eq!(c.load_state("n"), LoadState::Loaded);
        assert!(!c.is_creating());
    }

    #[test]
    fn test_create_session_failure_creates_nothing() {
        let mut c = ready();
        c.handle(SyncEvent::CreateSession {
            title: Some("  Plans ".into()),
        });
        c.handle(SyncEvent::SessionCreated {
            result: Err(NetworkError::http_status(500, "")),
        });
        assert_eq!(c.store().len(), 2);
        assert_eq!(c.selected_session_id(), Some("a"));
        assert!(!c.is_creating());
    }

    #[test]
    fn test_failed_effect_maps_to_completion_event() {
        let ticket = SendTicket {
            seq: 3,
            session_id: "a".into(),
            placeholder_id: "p".into(),
        };
        let event = SyncEffect::SendMessage {
            ticket: ticket.clone(),
            query: "q".into(),
        }
        .failed(NetworkError::transport("task panicked"));
        let SyncEvent::ReplyReceived { ticket: t, result } = event else {
            panic!("expected reply event");
        };
        assert_eq!(t, ticket);
        assert_eq!(result.unwrap_err().kind, NetworkErrorKind::Transport);
    }
}
