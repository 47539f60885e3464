//! TUI reducer (update function).
//!
//! All state mutations happen here. The runtime calls `update(app, event)`
//! and executes the returned effects.

use std::collections::HashSet;

use chatview_core::SyncEvent;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::effects::UiEffect;
use crate::events::UiEvent;
use crate::state::AppState;

/// Rows taken by everything but the transcript (input box and status line).
const CHROME_HEIGHT: u16 = 4;

pub fn update(app: &mut AppState, event: UiEvent) -> Vec<UiEffect> {
    match event {
        UiEvent::Tick => {
            app.spinner_frame = app.spinner_frame.wrapping_add(1);
            vec![]
        }
        UiEvent::Frame { width, height } => {
            app.width = width;
            app.height = height;
            vec![]
        }
        UiEvent::Terminal(event) => handle_terminal_event(app, event),
        UiEvent::Sync(event) => dispatch(app, event),
    }
}

/// Runs a sync event through the controller.
fn dispatch(app: &mut AppState, event: SyncEvent) -> Vec<UiEffect> {
    let effects: Vec<UiEffect> = app.sync.handle(event).into_iter().map(UiEffect::Sync).collect();
    prune_renders(app);
    let selected = app.sync.selected_session_id().map(str::to_string);
    if selected != app.shown_session {
        app.shown_session = selected;
        app.scroll.follow();
    }
    effects
}

/// Drops renders of messages the store no longer holds, such as local
/// placeholders replaced by a re-fetch.
fn prune_renders(app: &mut AppState) {
    let renderer = app.renderer.get_mut();
    if renderer.cached_len() == 0 {
        return;
    }
    let live: HashSet<&str> = app
        .sync
        .store()
        .sessions()
        .flat_map(|session| session.messages.iter().map(|m| m.id.as_str()))
        .collect();
    renderer.retain_messages(|id| live.contains(id));
}

fn handle_terminal_event(app: &mut AppState, event: Event) -> Vec<UiEffect> {
    match event {
        Event::Key(key) if key.kind != KeyEventKind::Release => handle_key(app, key),
        Event::Paste(text) => {
            app.input.insert_str(&text);
            vec![]
        }
        _ => vec![],
    }
}

fn page_size(app: &AppState) -> usize {
    usize::from(app.height.saturating_sub(CHROME_HEIGHT).max(2) - 1)
}

fn handle_key(app: &mut AppState, key: KeyEvent) -> Vec<UiEffect> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    app.notice = None;

    match key.code {
        KeyCode::Esc => vec![UiEffect::Quit],
        KeyCode::Char('c') if ctrl => vec![UiEffect::Quit],
        KeyCode::Enter => submit(app),
        KeyCode::Tab => cycle_session(app, 1),
        KeyCode::BackTab => cycle_session(app, -1),
        KeyCode::Char('n') if ctrl => cycle_session(app, 1),
        KeyCode::Char('p') if ctrl => cycle_session(app, -1),
        KeyCode::Char('o') if ctrl => dispatch(app, SyncEvent::CreateSession { title: None }),
        KeyCode::Char('r') if ctrl => reload(app),
        KeyCode::Char('u') if ctrl => {
            app.input.kill_to_start();
            vec![]
        }
        KeyCode::Char('a') if ctrl => {
            app.input.move_home();
            vec![]
        }
        KeyCode::Char('e') if ctrl => {
            app.input.move_end();
            vec![]
        }
        KeyCode::Char(c) if !ctrl => {
            app.input.insert_char(c);
            vec![]
        }
        KeyCode::Backspace => {
            app.input.backspace();
            vec![]
        }
        KeyCode::Delete => {
            app.input.delete();
            vec![]
        }
        KeyCode::Left => {
            app.input.move_left();
            vec![]
        }
        KeyCode::Right => {
            app.input.move_right();
            vec![]
        }
        KeyCode::Home => {
            app.input.move_home();
            vec![]
        }
        KeyCode::End => {
            app.input.move_end();
            vec![]
        }
        KeyCode::Up => {
            app.scroll.scroll_up(1);
            vec![]
        }
        KeyCode::Down => {
            app.scroll.scroll_down(1);
            vec![]
        }
        KeyCode::PageUp => {
            app.scroll.scroll_up(page_size(app));
            vec![]
        }
        KeyCode::PageDown => {
            app.scroll.scroll_down(page_size(app));
            vec![]
        }
        _ => vec![],
    }
}

/// Sends the input line. The line is kept when the controller declines it.
fn submit(app: &mut AppState) -> Vec<UiEffect> {
    let text = app.input.text().to_string();
    if text.trim().is_empty() {
        return vec![];
    }
    let effects = dispatch(app, SyncEvent::Submit { text });
    if effects.is_empty() {
        app.notice = Some(submit_refusal(app).to_string());
    } else {
        app.input.clear();
        app.scroll.follow();
    }
    effects
}

fn submit_refusal(app: &AppState) -> &'static str {
    match app.sync.selected_session_id() {
        None => "No chat selected. Press Ctrl-O to start one.",
        Some(id) if app.sync.load_state(id).is_loading() => "Messages are still loading.",
        Some(id) if app.sync.is_sending(id) => "Waiting for the previous reply.",
        Some(_) => "Message not sent.",
    }
}

fn cycle_session(app: &mut AppState, delta: isize) -> Vec<UiEffect> {
    let ids = app.session_ids();
    if ids.is_empty() {
        return vec![];
    }
    let len = ids.len() as isize;
    let next = match app
        .sync
        .selected_session_id()
        .and_then(|id| ids.iter().position(|s| s == id))
    {
        Some(current) => (current as isize + delta).rem_euclid(len) as usize,
        None => 0,
    };
    let session_id = ids[next].clone();
    dispatch(app, SyncEvent::Select { session_id })
}

fn reload(app: &mut AppState) -> Vec<UiEffect> {
    let Some(session_id) = app.sync.selected_session_id().map(str::to_string) else {
        return vec![];
    };
    if app.sync.load_state(&session_id).is_loading() || app.sync.is_sending(&session_id) {
        app.notice = Some("Chat is busy; try again in a moment.".to_string());
        return vec![];
    }
    dispatch(app, SyncEvent::Invalidate { session_id })
}
