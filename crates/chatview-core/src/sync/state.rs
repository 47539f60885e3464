//! Per-session lifecycle state tracked by the controller.

use chatview_types::{MessageId, SessionId};

/// Message load state of one session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    /// Last lazy-load failed; selecting again retries.
    Failed(String),
}

impl LoadState {
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }

    /// Whether selecting the session should fetch its messages.
    pub fn needs_fetch(&self) -> bool {
        matches!(self, LoadState::Unloaded | LoadState::Failed(_))
    }
}

/// Identifies one in-flight send.
///
/// The reply is always applied to `session_id`, whatever is selected by
/// the time it arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendTicket {
    pub seq: u64,
    pub session_id: SessionId,
    pub placeholder_id: MessageId,
}

#[derive(Debug, Default)]
pub struct TicketSeq {
    next: u64,
}

impl TicketSeq {
    pub fn next_seq(&mut self) -> u64 {
        let seq = self.next;
        self.next = self.next.wrapping_add(1);
        seq
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Success,
    Error(String),
}

/// Send state of one session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SendState {
    #[default]
    Idle,
    Sending(SendTicket),
    Settled(SendOutcome),
}

impl SendState {
    pub fn is_sending(&self) -> bool {
        matches!(self, SendState::Sending(_))
    }
}

/// Session discovery progress.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DiscoveryState {
    #[default]
    NotStarted,
    Fetching,
    Done,
    Failed(String),
}
