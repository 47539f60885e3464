//! Session command handlers.

use anyhow::{Context, Result};
use chatview_core::{Config, HttpSessionApi, SessionApi, SessionStore};
use chatview_render::{StyledLine, lines_to_text};
use chatview_types::{DEFAULT_SESSION_TITLE, Role};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

pub async fn list(config: &Config) -> Result<()> {
    let api = HttpSessionApi::from_config(config)?;
    let sessions = api
        .list_sessions(&config.identity)
        .await
        .with_context(|| format!("list sessions for identity '{}'", config.identity))?;

    let mut store = SessionStore::new();
    store.upsert_sessions(sessions);
    let snapshot = store.snapshot();
    if snapshot.sessions.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }
    for session in snapshot.sessions {
        println!(
            "{}  {}  {}",
            session.id,
            session.title,
            session.last_activity.format(TIMESTAMP_FORMAT)
        );
    }
    Ok(())
}

pub async fn show(config: &Config, id: &str, width: usize) -> Result<()> {
    let api = HttpSessionApi::from_config(config)?;
    let session = api
        .fetch_session(id)
        .await
        .with_context(|| format!("load session '{id}'"))?;

    println!("{} ({})", session.title, session.id);
    if session.messages.is_empty() {
        println!("No messages.");
        return Ok(());
    }

    let mut renderer = super::renderer(config);
    let mut lines = Vec::new();
    for message in &session.messages {
        let label = match message.role {
            Role::User => "You",
            Role::Assistant => "Assistant",
        };
        lines.push(StyledLine::empty());
        lines.push(StyledLine::styled(
            format!("{label} · {}", message.created_at.format(TIMESTAMP_FORMAT)),
            chatview_render::Style::Strong,
        ));
        lines.extend(renderer.render_message(message, width).to_lines());
    }
    println!("{}", lines_to_text(&lines));
    Ok(())
}

pub async fn new(config: &Config, title: Option<&str>) -> Result<()> {
    let title = title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_SESSION_TITLE);
    let api = HttpSessionApi::from_config(config)?;
    let session = api
        .create_session(&config.identity, title)
        .await
        .context("create session")?;
    println!("{}", session.id);
    Ok(())
}
