//! Sync controller.
//!
//! `SyncController::handle` is a reducer: it applies a `SyncEvent` to the
//! store and returns `SyncEffect`s describing the network calls to make.
//! `execute_effect` performs one effect against a `SessionApi` and yields
//! the completion event, which the runtime feeds back into `handle`.

mod controller;
mod executor;
mod state;

pub use controller::{SEND_FAILED_TEXT, SyncController, SyncEffect, SyncEvent};
pub use executor::execute_effect;
pub use state::{DiscoveryState, LoadState, SendOutcome, SendState, SendTicket, TicketSeq};
