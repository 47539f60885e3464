//! Interactive chat command.

use anyhow::{Context, Result};
use chatview_core::Config;

pub async fn run(config: &Config) -> Result<()> {
    chatview_tui::run_interactive_chat(config)
        .await
        .context("interactive chat failed")
}
