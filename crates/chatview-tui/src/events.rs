//! UI events consumed by the reducer.

use chatview_core::SyncEvent;

#[derive(Debug)]
pub enum UiEvent {
    /// Periodic tick; drives the spinner and triggers a redraw.
    Tick,
    /// Current terminal size, delivered before other events each loop.
    Frame { width: u16, height: u16 },
    Terminal(crossterm::event::Event),
    /// A sync intent or effect completion.
    Sync(SyncEvent),
}
