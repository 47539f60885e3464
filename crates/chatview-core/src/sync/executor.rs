//! Effect execution.

use tracing::debug;

use super::controller::{SyncEffect, SyncEvent};
use crate::api::SessionApi;

/// Runs one effect and returns the event that completes it.
///
/// Never fails: network errors travel inside the completion event.
pub async fn execute_effect<A: SessionApi>(api: &A, effect: SyncEffect) -> SyncEvent {
    match effect {
        SyncEffect::FetchSessions { identity } => {
            debug!(identity = %identity, "fetching sessions");
            SyncEvent::SessionsListed {
                result: api.list_sessions(&identity).await,
            }
        }
        SyncEffect::FetchMessages { session_id } => {
            let result = api.fetch_session(&session_id).await;
            SyncEvent::MessagesLoaded { session_id, result }
        }
        SyncEffect::SendMessage { ticket, query } => {
            let result = api.send_message(&ticket.session_id, &query).await;
            SyncEvent::ReplyReceived { ticket, result }
        }
        SyncEffect::CreateSession { identity, title } => SyncEvent::SessionCreated {
            result: api.create_session(&identity, &title).await,
        },
    }
}
