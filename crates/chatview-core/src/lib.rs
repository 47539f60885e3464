//! Core runtime for chatview.
//!
//! - `config`: `$CHATVIEW_HOME/config.toml` loading and defaults
//! - `logging`: tracing subscriber setup
//! - `error`: network and store error types
//! - `api`: the session API trait and its HTTP client
//! - `store`: single owner of session and message state
//! - `sync`: the sync controller reducer and its effect executor

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod store;
pub mod sync;

pub use api::{ApiResult, ChatReply, HttpSessionApi, SessionApi};
pub use config::Config;
pub use error::{NetworkError, NetworkErrorKind, StoreError};
pub use store::{SessionStore, SessionSummary, StoreSnapshot};
pub use sync::{
    DiscoveryState, LoadState, SEND_FAILED_TEXT, SendOutcome, SendState, SendTicket,
    SyncController, SyncEffect, SyncEvent, execute_effect,
};
