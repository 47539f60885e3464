//! One-shot send.

use anyhow::{Context, Result};
use chatview_core::{Config, HttpSessionApi, SessionApi};
use chatview_render::lines_to_text;
use tracing::warn;

pub async fn run(config: &Config, session_id: &str, text: &str, width: usize) -> Result<()> {
    if text.trim().is_empty() {
        anyhow::bail!("Message text is empty");
    }

    let api = HttpSessionApi::from_config(config)?;
    let reply = api
        .send_message(session_id, text)
        .await
        .with_context(|| format!("send message to session '{session_id}'"))?;

    if let Some(chat_id) = reply.chat_id.as_deref()
        && chat_id != session_id
    {
        warn!(expected = session_id, got = chat_id, "reply carries a different chat id");
    }

    let content =
        chatview_types::parse_reply(&reply.response).context("reply is not valid content")?;
    let rendered = super::renderer(config).render_content(session_id, &content, width);
    println!("{}", lines_to_text(&rendered.to_lines()));
    Ok(())
}
