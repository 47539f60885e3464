//! Command handlers.

pub mod chat;
pub mod config;
pub mod render;
pub mod send;
pub mod sessions;

use chatview_core::Config;
use chatview_render::{ContentRenderer, RenderOptions};

/// Content renderer configured from `[render]`.
fn renderer(config: &Config) -> ContentRenderer {
    ContentRenderer::new(RenderOptions {
        chart_width: config.render.chart_width,
        max_eval_steps: config.render.max_eval_steps,
    })
}
