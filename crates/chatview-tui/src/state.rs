//! TUI state.
//!
//! Session and message state lives in the `SyncController` (which owns the
//! store); everything here is view state. The content renderer sits behind a
//! `RefCell` so the pure render pass can fill its cache.

use std::cell::RefCell;

use chatview_core::{Config, SyncController};
use chatview_render::{ContentRenderer, RenderOptions};

use crate::input::InputState;

/// Transcript scroll position, counted in lines up from the bottom.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TranscriptScroll {
    from_bottom: usize,
}

impl TranscriptScroll {
    pub fn offset_from_bottom(self) -> usize {
        self.from_bottom
    }

    pub fn is_following(self) -> bool {
        self.from_bottom == 0
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.from_bottom = self.from_bottom.saturating_add(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.from_bottom = self.from_bottom.saturating_sub(lines);
    }

    pub fn follow(&mut self) {
        self.from_bottom = 0;
    }

    /// Caps the offset once the transcript height is known.
    pub fn clamp(&mut self, total_lines: usize, viewport: usize) {
        self.from_bottom = self.from_bottom.min(total_lines.saturating_sub(viewport));
    }
}

pub struct AppState {
    pub sync: SyncController,
    pub renderer: RefCell<ContentRenderer>,
    pub input: InputState,
    pub scroll: TranscriptScroll,
    /// One-line notice shown in the status line until the next key press.
    pub notice: Option<String>,
    /// Session the transcript was last showing; scroll resets on change.
    pub shown_session: Option<String>,
    pub base_url: String,
    pub should_quit: bool,
    pub spinner_frame: usize,
    pub width: u16,
    pub height: u16,
}

impl AppState {
    pub fn new(config: &Config) -> Self {
        let options = RenderOptions {
            chart_width: config.render.chart_width,
            max_eval_steps: config.render.max_eval_steps,
        };
        Self {
            sync: SyncController::new(config.identity.clone()),
            renderer: RefCell::new(ContentRenderer::new(options)),
            input: InputState::default(),
            scroll: TranscriptScroll::default(),
            notice: None,
            shown_session: None,
            base_url: config.base_url.clone(),
            should_quit: false,
            spinner_frame: 0,
            width: 0,
            height: 0,
        }
    }

    /// Session ids in sidebar order.
    pub fn session_ids(&self) -> Vec<String> {
        self.sync.store().sessions().map(|s| s.id.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scroll_clamps_and_follows() {
        let mut scroll = TranscriptScroll::default();
        assert!(scroll.is_following());
        scroll.scroll_up(50);
        scroll.clamp(30, 10);
        assert_eq!(scroll.offset_from_bottom(), 20);
        scroll.scroll_down(25);
        assert!(scroll.is_following());
    }
}
