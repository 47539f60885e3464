//! Message content to styled output.
//!
//! `ContentRenderer` is the only entry point the UI and CLI use. It renders
//! prose through markdown, runs code blocks through the sandbox, lays out
//! their component trees and draws their charts on the message's surface.
//! Failures stay local to the block that produced them.

use std::collections::HashMap;
use std::fmt;

use chatview_types::{Block, CodeBlock, Content, Message, MessageStatus, Role, TextBlock};
use serde_json::Value;

use crate::component::{LayoutItem, layout};
use crate::markdown::render_markdown;
use crate::sandbox::{self, ComponentOutput, Limits, SandboxError};
use crate::style::{Style, StyledLine, StyledSpan};
use crate::surface::{SurfaceRegistry, SurfaceSnapshot};

/// Rendering knobs, filled from the `[render]` config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Maximum width of a drawn chart.
    pub chart_width: usize,
    /// Evaluation step budget per code block.
    pub max_eval_steps: u64,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            chart_width: 40,
            max_eval_steps: Limits::default().max_steps,
        }
    }
}

/// Which stage of a code block failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transpile,
    Execution,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Transpile => "transpile error",
            ErrorKind::Execution => "execution error",
        })
    }
}

/// One piece of rendered message output, in display order.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderUnit {
    /// Markdown prose.
    Prose(Vec<StyledLine>),
    /// Laid-out output of a code block (including its title/description).
    Component(Vec<StyledLine>),
    /// Chart by index into the message's surface snapshot.
    Chart(usize),
    /// A code block that failed; later blocks still render.
    Error {
        block_index: usize,
        kind: ErrorKind,
        message: String,
    },
    /// Assistant reply still in flight.
    Pending,
    /// Content matched neither content shape.
    Unsupported(String),
}

/// Output of rendering one message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedMessage {
    pub units: Vec<RenderUnit>,
    /// Charts drawn for this message, if any code block drew one.
    pub surface: Option<SurfaceSnapshot>,
}

impl RenderedMessage {
    fn single(unit: RenderUnit) -> Self {
        Self {
            units: vec![unit],
            surface: None,
        }
    }

    /// Flattens units into display lines, one blank line between units.
    pub fn to_lines(&self) -> Vec<StyledLine> {
        let mut lines = Vec::new();
        for (i, unit) in self.units.iter().enumerate() {
            if i > 0 {
                lines.push(StyledLine::empty());
            }
            match unit {
                RenderUnit::Prose(unit_lines) | RenderUnit::Component(unit_lines) => {
                    lines.extend(unit_lines.iter().cloned());
                }
                RenderUnit::Chart(index) => {
                    match self.surface.as_ref().and_then(|s| s.get(*index)) {
                        Some(drawing) => lines.extend(drawing.lines.iter().cloned()),
                        None => lines.push(StyledLine::styled("(chart unavailable)", Style::Muted)),
                    }
                }
                RenderUnit::Error {
                    block_index,
                    kind,
                    message,
                } => lines.push(StyledLine {
                    spans: vec![
                        StyledSpan::new(
                            format!("⚠ block {} {kind}: ", block_index + 1),
                            Style::ErrorLabel,
                        ),
                        StyledSpan::new(message.clone(), Style::ErrorText),
                    ],
                }),
                RenderUnit::Pending => {
                    lines.push(StyledLine::styled("Thinking…", Style::Pending));
                }
                RenderUnit::Unsupported(reason) => lines.push(StyledLine {
                    spans: vec![
                        StyledSpan::new("[unsupported content] ", Style::ErrorLabel),
                        StyledSpan::new(reason.clone(), Style::Muted),
                    ],
                }),
            }
        }
        lines
    }

    /// Number of charts on the message's surface.
    pub fn chart_count(&self) -> usize {
        self.surface.as_ref().map_or(0, |s| s.drawings.len())
    }
}

/// Inputs a cached render depends on.
#[derive(Debug, Clone, PartialEq)]
struct Fingerprint {
    content: Content,
    status: MessageStatus,
    role: Role,
    width: usize,
}

/// Renders message content; owns the drawing surfaces.
///
/// Never touches session state: it sees only the message it is given.
#[derive(Debug, Default)]
pub struct ContentRenderer {
    options: RenderOptions,
    surfaces: SurfaceRegistry,
    cache: HashMap<String, (Fingerprint, RenderedMessage)>,
}

impl ContentRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn surfaces(&self) -> &SurfaceRegistry {
        &self.surfaces
    }

    /// Drops cached output (for instance after a resize).
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Forgets cached output and surfaces of messages `keep` rejects.
    pub fn retain_messages(&mut self, keep: impl Fn(&str) -> bool) {
        let before = self.cache.len();
        self.cache.retain(|id, _| keep(id.as_str()));
        self.surfaces.retain(&keep);
        let dropped = before - self.cache.len();
        if dropped > 0 {
            tracing::debug!(dropped, "pruned renders of departed messages");
        }
    }

    /// Number of messages with cached output.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }

    /// Renders one message at `width`.
    ///
    /// Output is cached per message id until its content, status or the width
    /// changes.
    pub fn render_message(&mut self, message: &Message, width: usize) -> RenderedMessage {
        let key = message.id.as_str();
        let fingerprint = Fingerprint {
            content: message.content.clone(),
            status: message.status.clone(),
            role: message.role,
            width,
        };
        if let Some((cached, rendered)) = self.cache.get(key)
            && *cached == fingerprint
        {
            return rendered.clone();
        }

        let rendered = match &message.status {
            MessageStatus::Pending => {
                self.surfaces.release(key);
                RenderedMessage::single(RenderUnit::Pending)
            }
            MessageStatus::Unsupported(err) => {
                self.surfaces.release(key);
                RenderedMessage::single(RenderUnit::Unsupported(err.to_string()))
            }
            MessageStatus::Failed => {
                self.render_styled(key, &message.content, width, Style::Failed)
            }
            MessageStatus::Committed => {
                let base = match message.role {
                    Role::User => Style::User,
                    Role::Assistant => Style::Assistant,
                };
                self.render_styled(key, &message.content, width, base)
            }
        };
        self.cache
            .insert(key.to_string(), (fingerprint, rendered.clone()));
        rendered
    }

    /// Renders assistant content for `message_key` at `width`.
    pub fn render_content(
        &mut self,
        message_key: &str,
        content: &Content,
        width: usize,
    ) -> RenderedMessage {
        self.render_styled(message_key, content, width, Style::Assistant)
    }

    /// Parses raw wire content, then renders it. Content that matches neither
    /// shape becomes a single unsupported-content unit.
    pub fn render_raw(
        &mut self,
        message_key: &str,
        raw: &Value,
        width: usize,
    ) -> RenderedMessage {
        match chatview_types::parse(raw) {
            Ok(content) => self.render_content(message_key, &content, width),
            Err(err) => {
                tracing::warn!(message_id = message_key, error = %err, "unsupported content");
                self.surfaces.release(message_key);
                RenderedMessage::single(RenderUnit::Unsupported(err.to_string()))
            }
        }
    }

    fn render_styled(
        &mut self,
        key: &str,
        content: &Content,
        width: usize,
        base: Style,
    ) -> RenderedMessage {
        self.surfaces.begin_pass(key);
        let mut units = Vec::new();
        match content {
            Content::Text { text } => {
                units.push(RenderUnit::Prose(render_markdown(text, width, base)));
            }
            Content::Blocks { blocks } => {
                for (index, block) in blocks.iter().enumerate() {
                    match block {
                        Block::Text(block) => units.push(text_block(block, width, base)),
                        Block::Code(block) => self.code_block(key, index, block, width, &mut units),
                    }
                }
            }
        }
        RenderedMessage {
            units,
            surface: self.surfaces.snapshot(key),
        }
    }

    fn code_block(
        &mut self,
        key: &str,
        index: usize,
        block: &CodeBlock,
        width: usize,
        units: &mut Vec<RenderUnit>,
    ) {
        let mut header = Vec::new();
        if let Some(title) = block.title.as_deref().filter(|t| !t.trim().is_empty()) {
            header.push(StyledLine::styled(title.trim(), Style::BlockTitle));
        }
        if let Some(description) = block.description.as_deref().filter(|d| !d.trim().is_empty()) {
            header.push(StyledLine::styled(description.trim(), Style::BlockDescription));
        }

        let limits = Limits {
            max_steps: self.options.max_eval_steps,
            ..Limits::default()
        };
        let output = match sandbox::run(&block.code, limits) {
            Ok(output) => output,
            Err(err) => {
                tracing::warn!(message_id = key, block = index, error = %err, "code block failed");
                if !header.is_empty() {
                    units.push(RenderUnit::Component(header));
                }
                let (kind, message) = match err {
                    SandboxError::Transpile(e) => (ErrorKind::Transpile, e.to_string()),
                    SandboxError::Execution(e) => (ErrorKind::Execution, e.message),
                };
                units.push(RenderUnit::Error {
                    block_index: index,
                    kind,
                    message,
                });
                return;
            }
        };
        self.place_output(key, output, header, width, units);
    }

    /// Emits a block's laid-out lines and charts in order.
    ///
    /// Charts from chart components sit where their element was; charts drawn
    /// on the canvas go at the first `<canvas>`, or after the block when it
    /// rendered none.
    fn place_output(
        &mut self,
        key: &str,
        output: ComponentOutput,
        header: Vec<StyledLine>,
        width: usize,
        units: &mut Vec<RenderUnit>,
    ) {
        let chart_width = self.options.chart_width.min(width).max(1);
        let items = layout(&output.nodes, width);
        let inline: Vec<usize> = items
            .iter()
            .filter_map(|item| match item {
                LayoutItem::Chart(i) => Some(*i),
                _ => None,
            })
            .collect();
        let mut canvas_charts: Vec<usize> = (0..output.charts.len())
            .filter(|i| !inline.contains(i))
            .collect();

        let mut pending = header;
        for item in items {
            match item {
                LayoutItem::Lines(lines) => pending.extend(lines),
                LayoutItem::Chart(i) => {
                    flush_component(&mut pending, units);
                    if let Some(spec) = output.charts.get(i) {
                        let drawn = self.surfaces.draw(key, spec.clone(), chart_width);
                        units.push(RenderUnit::Chart(drawn));
                    }
                }
                LayoutItem::Canvas => {
                    if canvas_charts.is_empty() {
                        continue;
                    }
                    flush_component(&mut pending, units);
                    for i in std::mem::take(&mut canvas_charts) {
                        let drawn = self.surfaces.draw(key, output.charts[i].clone(), chart_width);
                        units.push(RenderUnit::Chart(drawn));
                    }
                }
            }
        }
        flush_component(&mut pending, units);
        for i in canvas_charts {
            let drawn = self.surfaces.draw(key, output.charts[i].clone(), chart_width);
            units.push(RenderUnit::Chart(drawn));
        }
    }
}

fn flush_component(pending: &mut Vec<StyledLine>, units: &mut Vec<RenderUnit>) {
    if !pending.is_empty() {
        units.push(RenderUnit::Component(std::mem::take(pending)));
    }
}

fn text_block(block: &TextBlock, width: usize, base: Style) -> RenderUnit {
    let mut lines = Vec::new();
    if let Some(title) = block.title.as_deref().filter(|t| !t.trim().is_empty()) {
        lines.push(StyledLine::styled(title.trim(), Style::BlockTitle));
    }
    lines.extend(render_markdown(&block.text, width, base));
    RenderUnit::Prose(lines)
}
