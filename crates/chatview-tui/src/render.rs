//! Pure view functions for the TUI.
//!
//! Functions here read `&AppState` and draw to a ratatui `Frame`. The only
//! interior mutation is the content renderer's cache and drawing surfaces.

use chatview_core::{DiscoveryState, LoadState};
use chatview_render::{StyledLine, StyledSpan, lines_to_text};
use chatview_types::{Message, Role};
use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use unicode_width::UnicodeWidthStr;

use crate::state::AppState;
use crate::theme::convert_line;

const SIDEBAR_MAX_WIDTH: u16 = 28;
const INPUT_HEIGHT: u16 = 3;
const STATUS_HEIGHT: u16 = 1;
/// Horizontal padding on each side of the transcript.
const TRANSCRIPT_MARGIN: u16 = 1;
const SPINNER_FRAMES: &[&str] = &["◐", "◓", "◑", "◒"];

pub fn render(app: &AppState, frame: &mut Frame) {
    let area = frame.area();
    let sidebar_width = SIDEBAR_MAX_WIDTH.min(area.width / 3);
    let [sidebar, main] =
        Layout::horizontal([Constraint::Length(sidebar_width), Constraint::Min(10)]).areas(area);
    let [transcript, input, status] = Layout::vertical([
        Constraint::Min(1),
        Constraint::Length(INPUT_HEIGHT),
        Constraint::Length(STATUS_HEIGHT),
    ])
    .areas(main);

    if sidebar_width > 0 {
        render_sidebar(app, frame, sidebar);
    }
    render_transcript(app, frame, transcript);
    render_input(app, frame, input);
    render_status(app, frame, status);
}

fn spinner(app: &AppState) -> &'static str {
    SPINNER_FRAMES[app.spinner_frame % SPINNER_FRAMES.len()]
}

fn render_sidebar(app: &AppState, frame: &mut Frame, area: Rect) {
    let block = Block::default().borders(Borders::RIGHT).title(" Chats ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let snapshot = app.sync.store().snapshot();
    let selected = app.sync.selected_session_id();
    let text_width = usize::from(inner.width).saturating_sub(4);

    let lines: Vec<Line<'static>> = snapshot
        .sessions
        .iter()
        .map(|session| {
            let is_selected = selected == Some(session.id.as_str());
            let marker = if is_selected { "▸ " } else { "  " };
            let status = match app.sync.load_state(&session.id) {
                LoadState::Loading => spinner(app),
                LoadState::Failed(_) => "!",
                _ if app.sync.is_sending(&session.id) => "…",
                _ => " ",
            };
            let style = if is_selected {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            Line::from(vec![
                Span::styled(marker, style),
                Span::styled(truncate(&session.title, text_width), style),
                Span::styled(format!(" {status}"), Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    // Keep the selection visible.
    let height = usize::from(inner.height);
    let position = selected.and_then(|id| snapshot.position(id)).unwrap_or(0);
    let skip = (position + 1).saturating_sub(height);
    let visible: Vec<Line<'static>> = lines.into_iter().skip(skip).take(height).collect();
    frame.render_widget(Paragraph::new(visible), inner);
}

fn render_transcript(app: &AppState, frame: &mut Frame, area: Rect) {
    let inner = Rect {
        x: area.x + TRANSCRIPT_MARGIN.min(area.width),
        width: area.width.saturating_sub(TRANSCRIPT_MARGIN * 2),
        ..area
    };
    let lines = transcript_lines(app, usize::from(inner.width));
    let height = usize::from(inner.height);
    let total = lines.len();

    let offset = app
        .scroll
        .offset_from_bottom()
        .min(total.saturating_sub(height));
    let start = total.saturating_sub(height + offset);
    let visible: Vec<Line<'static>> = lines
        .into_iter()
        .skip(start)
        .take(height)
        .map(convert_line)
        .collect();

    // Bottom-align short transcripts.
    let padding = height.saturating_sub(visible.len()) as u16;
    let area = Rect {
        y: inner.y + padding,
        height: inner.height - padding,
        ..inner
    };
    frame.render_widget(Paragraph::new(visible), area);
}

/// Transcript of the selected session as styled lines, or an empty-state
/// notice.
pub fn transcript_lines(app: &AppState, width: usize) -> Vec<StyledLine> {
    use chatview_render::Style as S;

    let Some(session) = app.sync.selected_session() else {
        let notice = match app.sync.discovery() {
            DiscoveryState::NotStarted | DiscoveryState::Fetching => "Loading chats…".to_string(),
            DiscoveryState::Failed(reason) => format!("Could not load chats: {reason}"),
            DiscoveryState::Done => "No chats yet. Press Ctrl-O to start one.".to_string(),
        };
        return vec![StyledLine::styled(notice, S::Muted)];
    };

    if session.messages.is_empty() {
        let notice = match app.sync.load_state(&session.id) {
            LoadState::Unloaded | LoadState::Loading => "Loading messages…".to_string(),
            LoadState::Failed(reason) => {
                format!("Could not load messages: {reason}. Press Ctrl-R to retry.")
            }
            LoadState::Loaded => "No messages yet. Say hello.".to_string(),
        };
        return vec![StyledLine::styled(notice, S::Muted)];
    }

    let mut renderer = app.renderer.borrow_mut();
    let mut lines = Vec::new();
    for (i, message) in session.messages.iter().enumerate() {
        if i > 0 {
            lines.push(StyledLine::empty());
        }
        lines.push(message_header(message));
        lines.extend(renderer.render_message(message, width).to_lines());
    }
    lines
}

fn message_header(message: &Message) -> StyledLine {
    use chatview_render::Style as S;

    let (label, style) = match message.role {
        Role::User => ("You", S::User),
        Role::Assistant => ("Assistant", S::Strong),
    };
    let time = message.created_at.format("%H:%M").to_string();
    StyledLine {
        spans: vec![
            StyledSpan::new(label, style),
            StyledSpan::new(format!(" {time}"), S::Muted),
        ],
    }
}

fn render_input(app: &AppState, frame: &mut Frame, area: Rect) {
    let sending = app.sync.is_selected_sending();
    let title = if sending {
        format!(" {} sending… ", spinner(app))
    } else {
        " Message ".to_string()
    };
    let block = Block::bordered().title(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let (visible, cursor) = app.input.viewport(usize::from(inner.width));
    frame.render_widget(Paragraph::new(visible), inner);
    if inner.width > 0 && inner.height > 0 {
        let x = inner.x + (cursor as u16).min(inner.width - 1);
        frame.set_cursor_position((x, inner.y));
    }
}

fn render_status(app: &AppState, frame: &mut Frame, area: Rect) {
    let line = match &app.notice {
        Some(notice) => Line::from(Span::styled(
            notice.clone(),
            Style::default().fg(Color::Yellow),
        )),
        None => {
            let title = app
                .sync
                .selected_session()
                .map_or("no chat", |s| s.title.as_str());
            Line::from(vec![
                Span::styled(
                    format!("{title} · {} ", app.base_url),
                    Style::default().fg(Color::Gray),
                ),
                Span::styled(
                    "Enter send · Tab switch · Ctrl-O new · Ctrl-R reload · Esc quit",
                    Style::default().fg(Color::DarkGray),
                ),
            ])
        }
    };
    frame.render_widget(Paragraph::new(line), area);
}

/// Truncates to `max` display columns with an ellipsis.
fn truncate(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        out.push(c);
        used += w;
    }
    out.push('…');
    out
}

/// Plain text of the selected transcript, for tests and debugging.
pub fn transcript_text(app: &AppState, width: usize) -> String {
    lines_to_text(&transcript_lines(app, width))
}

#[cfg(test)]
mod tests {
    use chatview_core::{Config, SyncEvent};
    use chatview_types::{Message, Session};
    use chrono::{TimeZone, Utc};
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use serde_json::json;

    use super::*;

    fn session(id: &str, title: &str) -> Session {
        Session::new(id, title, Utc.timestamp_opt(1_700_000_000, 0).unwrap())
    }

    fn app_with(messages: Vec<Message>) -> AppState {
        let mut app = AppState::new(&Config::default());
        app.sync.handle(SyncEvent::Init);
        app.sync.handle(SyncEvent::SessionsListed {
            result: Ok(vec![session("a", "Budget"), session("b", "Trip")]),
        });
        let mut loaded = session("a", "Budget");
        loaded.messages = messages;
        app.sync.handle(SyncEvent::MessagesLoaded {
            session_id: "a".into(),
            result: Ok(loaded),
        });
        app
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let area = buffer.area;
        let mut out = String::new();
        for y in 0..area.height {
            for x in 0..area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_empty_states() {
        let app = AppState::new(&Config::default());
        assert_eq!(transcript_text(&app, 40), "Loading chats…");

        let mut app = AppState::new(&Config::default());
        app.sync.handle(SyncEvent::Init);
        app.sync
            .handle(SyncEvent::SessionsListed { result: Ok(vec![]) });
        assert_eq!(
            transcript_text(&app, 40),
            "No chats yet. Press Ctrl-O to start one."
        );

        let app = app_with(Vec::new());
        assert_eq!(transcript_text(&app, 40), "No messages yet. Say hello.");
    }

    #[test]
    fn test_transcript_renders_messages() {
        let mut reply = Message::user("a", "");
        reply.role = Role::Assistant;
        reply.content = chatview_types::parse(&json!({"blocks": [
            {"block_type": "text", "text": "**Total**: 12"},
            {"block_type": "react", "code": "export default function App() { return <ul><li>rent</li></ul>; }"},
        ]}))
        .expect("content");
        let app = app_with(vec![Message::user("a", "how much?"), reply]);

        let text = transcript_text(&app, 40);
        assert!(text.contains("You"), "{text}");
        assert!(text.contains("how much?"), "{text}");
        assert!(text.contains("Assistant"), "{text}");
        assert!(text.contains("Total: 12"), "{text}");
        assert!(text.contains("• rent"), "{text}");
    }

    #[test]
    fn test_pending_reply_shows_thinking() {
        let mut app = app_with(Vec::new());
        app.sync.handle(SyncEvent::Submit {
            text: "hello".into(),
        });
        let text = transcript_text(&app, 40);
        assert!(text.contains("hello"));
        assert!(text.ends_with("Thinking…"), "{text}");
        assert!(app.sync.is_selected_sending());
    }

    #[test]
    fn test_full_frame() {
        let app = app_with(vec![Message::user("a", "hi")]);
        let mut terminal = Terminal::new(TestBackend::new(90, 12)).expect("terminal");
        terminal.draw(|frame| render(&app, frame)).expect("draw");
        let screen = buffer_text(&terminal);
        assert!(screen.contains("Chats"), "{screen}");
        assert!(screen.contains("▸ Budget"), "{screen}");
        assert!(screen.contains("Trip"), "{screen}");
        assert!(screen.contains("Message"), "{screen}");
        assert!(screen.contains("hi"), "{screen}");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long title", 6), "a lon…");
    }
}
