//! Full-screen chat client.
//!
//! Elm-style split:
//! - `state`: view state around the sync controller
//! - `events` / `effects`: what flows into and out of the reducer
//! - `update`: the reducer
//! - `render`: pure drawing from `&AppState`
//! - `runtime`: event loop, terminal ownership, effect execution

pub mod effects;
pub mod events;
pub mod input;
pub mod render;
pub mod runtime;
pub mod state;
pub mod terminal;
pub mod theme;
pub mod update;

use std::io::{IsTerminal, Write, stderr};

use anyhow::Result;
use chatview_core::{Config, HttpSessionApi};
pub use runtime::TuiRuntime;
use state::AppState;

/// Runs the interactive chat client until the user quits.
pub async fn run_interactive_chat(config: &Config) -> Result<()> {
    if !stderr().is_terminal() {
        anyhow::bail!(
            "Chat mode requires a terminal.\n\
             Use `chatview sessions` or `chatview send` for non-interactive use."
        );
    }

    let api = HttpSessionApi::from_config(config)?;
    tracing::info!(base_url = %config.base_url, identity = %config.identity, "starting chat");

    let mut runtime = TuiRuntime::new(AppState::new(config), api)?;
    runtime.run()?;

    writeln!(stderr(), "Goodbye!")?;
    Ok(())
}
