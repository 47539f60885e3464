//! UI effect types.
//!
//! Effects are commands returned by the reducer that the runtime executes.
//! The reducer never performs I/O itself.

use chatview_core::SyncEffect;

#[derive(Debug, PartialEq, Eq)]
pub enum UiEffect {
    Quit,
    /// Network work for the sync controller; its completion comes back as
    /// `UiEvent::Sync`.
    Sync(SyncEffect),
}
