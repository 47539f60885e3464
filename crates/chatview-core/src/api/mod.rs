//! Session API.
//!
//! `SessionApi` is the seam between the sync controller's effects and the
//! network; `HttpSessionApi` is the production implementation and tests
//! substitute in-memory fakes or wiremock servers.

mod http;
mod wire;

use std::future::Future;

use chatview_types::Session;

pub use self::http::{HttpSessionApi, USER_AGENT};
pub use self::wire::ChatReply;
use crate::error::NetworkError;

/// Result type for session API calls.
pub type ApiResult<T> = std::result::Result<T, NetworkError>;

/// Remote session service.
pub trait SessionApi: Send + Sync {
    /// `GET {base}/sessions/{identity}`.
    fn list_sessions(&self, identity: &str) -> impl Future<Output = ApiResult<Vec<Session>>> + Send;

    /// `GET {base}/sessions/{session_id}`, with messages.
    fn fetch_session(&self, session_id: &str) -> impl Future<Output = ApiResult<Session>> + Send;

    /// `POST {base}/sessions/{identity}` with `{ "title" }`.
    fn create_session(
        &self,
        identity: &str,
        title: &str,
    ) -> impl Future<Output = ApiResult<Session>> + Send;

    /// `POST {base}/chat` with `{ "query", "chatId" }`.
    fn send_message(
        &self,
        session_id: &str,
        query: &str,
    ) -> impl Future<Output = ApiResult<ChatReply>> + Send;
}
