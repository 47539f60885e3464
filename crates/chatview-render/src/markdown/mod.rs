//! Markdown prose rendering.
//!
//! - `parse`: pulldown-cmark events to styled lines
//! - `highlight`: keyword/string/number/comment classes for fenced code
//! - `wrap`: width-aware wrapping with hanging indents

mod highlight;
mod parse;
pub mod wrap;

pub use highlight::{Highlighter, Lang};
pub(crate) use parse::draw_table;
pub use parse::render_markdown;
