//! Message content rendering for chatview.
//!
//! Turns message content into UI-agnostic styled lines:
//!
//! - `markdown`: prose blocks (pulldown-cmark, highlighting, wrapping)
//! - `sandbox`: transpiles and evaluates generated component code
//! - `component`: lays out the component trees the sandbox resolves
//! - `chart` / `surface`: text charts and the per-message drawing surface
//! - `renderer`: `ContentRenderer`, the entry point tying these together
//!
//! Frontends map `style::Style` to their own colors.

pub mod chart;
pub mod component;
pub mod markdown;
pub mod renderer;
pub mod sandbox;
pub mod style;
pub mod surface;

pub use chart::{ChartKind, ChartSpec, Dataset};
pub use renderer::{ContentRenderer, ErrorKind, RenderOptions, RenderUnit, RenderedMessage};
pub use style::{Style, StyledLine, StyledSpan, lines_to_text};
pub use surface::{Drawing, SurfaceRegistry, SurfaceSnapshot};
