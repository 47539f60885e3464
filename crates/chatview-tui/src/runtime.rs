//! TUI runtime: owns the terminal, runs the event loop, executes effects.
//!
//! The reducer in `update` stays pure. Effects that touch the network are
//! spawned as tokio tasks that post their completion event to the inbox,
//! which the loop drains every iteration.

use std::io::Stdout;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chatview_core::{NetworkError, SessionApi, SyncEffect, SyncEvent, execute_effect};
use crossterm::event;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::state::AppState;
use crate::{render, terminal, update};

/// Tick cadence while something is in flight (spinner animation).
pub const FRAME_DURATION: Duration = Duration::from_millis(80);

/// Tick cadence when idle.
pub const IDLE_POLL_DURATION: Duration = Duration::from_millis(250);

pub struct TuiRuntime<A: SessionApi + 'static> {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    pub state: AppState,
    api: Arc<A>,
    inbox_tx: mpsc::UnboundedSender<UiEvent>,
    inbox_rx: mpsc::UnboundedReceiver<UiEvent>,
    last_tick: Instant,
}

impl<A: SessionApi + 'static> TuiRuntime<A> {
    /// Enters the alternate screen. Must be called inside a tokio runtime.
    pub fn new(state: AppState, api: A) -> Result<Self> {
        terminal::install_panic_hook();
        let terminal = terminal::setup_terminal().context("Failed to setup terminal")?;
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();

        Ok(Self {
            terminal,
            state,
            api: Arc::new(api),
            inbox_tx,
            inbox_rx,
            last_tick: Instant::now(),
        })
    }

    /// Runs until the user quits, then restores the terminal.
    pub fn run(&mut self) -> Result<()> {
        self.dispatch_event(UiEvent::Sync(SyncEvent::Init));
        let result = self.event_loop();
        let restored = terminal::restore_terminal();
        result.and(restored)
    }

    fn event_loop(&mut self) -> Result<()> {
        let mut dirty = true;

        while !self.state.should_quit {
            let mut events = self.collect_events()?;

            let size = self.terminal.size()?;
            events.insert(
                0,
                UiEvent::Frame {
                    width: size.width,
                    height: size.height,
                },
            );

            for event in events {
                // Frame events alone never change what is on screen.
                if !matches!(event, UiEvent::Frame { .. }) {
                    dirty = true;
                }
                let effects = update::update(&mut self.state, event);
                self.execute_effects(effects);
            }

            if dirty {
                self.terminal.draw(|frame| render::render(&self.state, frame))?;
                dirty = false;
            }
        }

        Ok(())
    }

    fn is_busy(&self) -> bool {
        let sync = &self.state.sync;
        sync.is_creating()
            || matches!(sync.discovery(), chatview_core::DiscoveryState::Fetching)
            || sync
                .store()
                .sessions()
                .any(|s| sync.is_sending(&s.id) || sync.load_state(&s.id).is_loading())
    }

    fn collect_events(&mut self) -> Result<Vec<UiEvent>> {
        let mut events = Vec::new();
        let tick_interval = if self.is_busy() {
            FRAME_DURATION
        } else {
            IDLE_POLL_DURATION
        };

        while let Ok(ev) = self.inbox_rx.try_recv() {
            events.push(ev);
        }

        let poll_duration = if events.is_empty() {
            tick_interval.saturating_sub(self.last_tick.elapsed())
        } else {
            Duration::ZERO
        };

        if event::poll(poll_duration)? {
            events.push(UiEvent::Terminal(event::read()?));
            while event::poll(Duration::ZERO)? {
                events.push(UiEvent::Terminal(event::read()?));
            }
        }

        if self.last_tick.elapsed() >= tick_interval {
            events.push(UiEvent::Tick);
            self.last_tick = Instant::now();
        }

        Ok(events)
    }

    fn execute_effects(&mut self, effects: Vec<UiEffect>) {
        for effect in effects {
            self.execute_effect(effect);
        }
    }

    fn dispatch_event(&mut self, event: UiEvent) {
        let effects = update::update(&mut self.state, event);
        self.execute_effects(effects);
    }

    fn execute_effect(&mut self, effect: UiEffect) {
        match effect {
            UiEffect::Quit => self.state.should_quit = true,
            UiEffect::Sync(effect) => {
                spawn_effect(Arc::clone(&self.api), effect, self.inbox_tx.clone());
            }
        }
    }
}

/// Runs a sync effect on its own task and posts exactly one completion.
///
/// A task that panics still completes: the effect is reported as a
/// transport failure so no session stays in flight.
pub fn spawn_effect<A: SessionApi + 'static>(
    api: Arc<A>,
    effect: SyncEffect,
    tx: mpsc::UnboundedSender<UiEvent>,
) {
    let fallback = effect.clone();
    let task = tokio::spawn(async move { execute_effect(&*api, effect).await });
    tokio::spawn(async move {
        let event = match task.await {
            Ok(event) => event,
            Err(e) => {
                tracing::error!(error = %e, ?fallback, "sync effect task failed");
                fallback.failed(NetworkError::transport(format!("request task failed: {e}")))
            }
        };
        // The receiver is gone only after the loop exits.
        let _ = tx.send(UiEvent::Sync(event));
    });
}
