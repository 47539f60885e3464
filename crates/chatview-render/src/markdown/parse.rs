use comfy_table::{ContentArrangement, Table};
use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use unicode_width::UnicodeWidthStr;

use super::highlight::{Highlighter, Lang};
use super::wrap::{WrapOptions, wrap_styled_spans};
use crate::style::{Style, StyledLine, StyledSpan};

/// Renders markdown text into styled lines.
///
/// - Parses markdown using pulldown-cmark
/// - Converts events to styled spans on top of `base` (the role style)
/// - Wraps at the given width
///
/// Raw HTML is dropped.
pub fn render_markdown(text: &str, width: usize, base: Style) -> Vec<StyledLine> {
    if text.trim().is_empty() {
        return vec![StyledLine::empty()];
    }

    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let mut renderer = MarkdownRenderer::new(width, base);
    for event in Parser::new_ext(text, options) {
        renderer.process_event(event);
    }
    renderer.finish()
}

/// Table cells collected as plain text, drawn with comfy-table.
#[derive(Debug, Default)]
struct TableCollector {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    row: Vec<String>,
    cell: String,
    in_head: bool,
}

impl TableCollector {
    fn end_cell(&mut self) {
        let cell = std::mem::take(&mut self.cell);
        self.row.push(cell.trim().to_string());
    }

    fn end_row(&mut self) {
        let row = std::mem::take(&mut self.row);
        if self.in_head {
            self.header = row;
        } else {
            self.rows.push(row);
        }
    }

    fn draw(&self, max_width: usize) -> Vec<String> {
        draw_table(&self.header, &self.rows, max_width)
    }
}

/// Draws a text table no wider than `max_width`; an empty header is omitted.
pub(crate) fn draw_table(header: &[String], rows: &[Vec<String>], max_width: usize) -> Vec<String> {
    let mut table = Table::new();
    table.set_width(u16::try_from(max_width).unwrap_or(u16::MAX));
    table.set_content_arrangement(ContentArrangement::Dynamic);
    if !header.is_empty() {
        table.set_header(header);
    }
    for row in rows {
        table.add_row(row);
    }
    table.to_string().lines().map(String::from).collect()
}

#[derive(Debug, Clone)]
struct ListLevel {
    /// Next number for ordered lists; `None` for bullets.
    next_number: Option<u64>,
}

struct MarkdownRenderer {
    width: usize,
    base: Style,
    lines: Vec<StyledLine>,
    /// Inline spans of the block being collected.
    spans: Vec<StyledSpan>,
    style_stack: Vec<Style>,
    /// Fence language and raw text while inside a code block.
    code: Option<(Option<String>, String)>,
    lists: Vec<ListLevel>,
    /// Marker still to be placed on the current item's first line.
    pending_marker: Option<(String, Style)>,
    quote_depth: usize,
    table: Option<TableCollector>,
    link_target: Vec<String>,
}

impl MarkdownRenderer {
    fn new(width: usize, base: Style) -> Self {
        Self {
            width,
            base,
            lines: Vec::new(),
            spans: Vec::new(),
            style_stack: vec![base],
            code: None,
            lists: Vec::new(),
            pending_marker: None,
            quote_depth: 0,
            table: None,
            link_target: Vec::new(),
        }
    }

    fn style(&self) -> Style {
        self.style_stack.last().copied().unwrap_or(self.base)
    }

    fn push_style(&mut self, style: Style) {
        self.style_stack.push(style);
    }

    fn pop_style(&mut self) {
        if self.style_stack.len() > 1 {
            self.style_stack.pop();
        }
    }

    fn process_event(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => self.inline_code(&code),
            Event::SoftBreak => self.text(" "),
            Event::HardBreak => self.text("\n"),
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.spans.push(StyledSpan::new(marker, Style::ListBullet));
            }
            Event::Rule => {
                self.flush_block();
                let rule = "─".repeat(self.width.clamp(1, 40));
                self.lines.push(StyledLine::styled(rule, Style::Rule));
            }
            Event::InlineMath(math) | Event::DisplayMath(math) => self.inline_code(&math),
            // HTML is never rendered; footnote markers carry no text.
            Event::Html(_) | Event::InlineHtml(_) | Event::FootnoteReference(_) => {}
        }
    }

    fn start_tag(&mut self, tag: Tag) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush_block();
                self.push_style(match level {
                    HeadingLevel::H1 => Style::H1,
                    HeadingLevel::H2 => Style::H2,
                    _ => Style::H3,
                });
            }
            Tag::CodeBlock(kind) => {
                self.flush_block();
                let lang = match kind {
                    CodeBlockKind::Fenced(info) if !info.trim().is_empty() => {
                        Some(info.trim().to_string())
                    }
                    _ => None,
                };
                self.code = Some((lang, String::new()));
            }
            Tag::List(start) => {
                self.flush_block();
                self.lists.push(ListLevel { next_number: start });
            }
            Tag::Item => {
                self.flush_block();
                let marker = match self.lists.last_mut() {
                    Some(ListLevel {
                        next_number: Some(n),
                    }) => {
                        let marker = (format!("{n}. "), Style::ListNumber);
                        *n += 1;
                        marker
                    }
                    _ => ("• ".to_string(), Style::ListBullet),
                };
                self.pending_marker = Some(marker);
            }
            Tag::BlockQuote(_) => {
                self.flush_block();
                self.quote_depth += 1;
                self.push_style(Style::BlockQuote);
            }
            Tag::Emphasis => self.push_style(Style::Emphasis),
            Tag::Strong => self.push_style(Style::Strong),
            Tag::Link { dest_url, .. } => {
                self.link_target.push(dest_url.to_string());
                self.push_style(Style::Link);
            }
            Tag::Image { .. } => {
                self.spans.push(StyledSpan::new("[image: ", Style::Muted));
                self.push_style(Style::Muted);
            }
            Tag::Table(_) => {
                self.flush_block();
                self.table = Some(TableCollector::default());
            }
            Tag::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.in_head = true;
                }
            }
            Tag::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    table.cell.clear();
                }
            }
            Tag::Strikethrough | Tag::Superscript | Tag::Subscript => {
                let style = self.style();
                self.push_style(style);
            }
            Tag::Paragraph
            | Tag::TableRow
            | Tag::FootnoteDefinition(_)
            | Tag::MetadataBlock(_)
            | Tag::HtmlBlock
            | Tag::DefinitionList
            | Tag::DefinitionListTitle
            | Tag::DefinitionListDefinition => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush_block();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Heading(_) => {
                self.flush_block();
                self.pop_style();
                self.blank_line();
            }
            TagEnd::CodeBlock => {
                if let Some((lang, body)) = self.code.take() {
                    self.emit_code_block(lang.as_deref(), &body);
                }
                self.blank_line();
            }
            TagEnd::List(_) => {
                self.flush_block();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::Item => {
                self.flush_block();
                self.pending_marker = None;
            }
            TagEnd::BlockQuote(_) => {
                self.flush_block();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.pop_style();
                self.blank_line();
            }
            TagEnd::Link => {
                self.pop_style();
                if let Some(url) = self.link_target.pop() {
                    let label: String = self
                        .spans
                        .iter()
                        .rev()
                        .take_while(|s| s.style == Style::Link)
                        .map(|s| s.text.as_str())
                        .collect();
                    if !url.is_empty() && label != url && !url.starts_with('#') {
                        self.spans
                            .push(StyledSpan::new(format!(" ({url})"), Style::Muted));
                    }
                }
            }
            TagEnd::Image => {
                self.pop_style();
                self.spans.push(StyledSpan::new("]", Style::Muted));
            }
            TagEnd::Emphasis
            | TagEnd::Strong
            | TagEnd::Strikethrough
            | TagEnd::Superscript
            | TagEnd::Subscript => self.pop_style(),
            TagEnd::Table => {
                if let Some(table) = self.table.take() {
                    for line in table.draw(self.width) {
                        self.lines.push(StyledLine::styled(line, Style::Plain));
                    }
                }
                self.blank_line();
            }
            TagEnd::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.end_row();
                    table.in_head = false;
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut()
                    && !table.in_head
                {
                    table.end_row();
                }
            }
            TagEnd::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    table.end_cell();
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some((_, body)) = self.code.as_mut() {
            body.push_str(text);
            return;
        }
        if let Some(table) = self.table.as_mut() {
            table.cell.push_str(&text.replace('\n', " "));
            return;
        }
        let style = self.style();
        self.spans.push(StyledSpan::new(text, style));
    }

    fn inline_code(&mut self, code: &str) {
        if let Some(table) = self.table.as_mut() {
            table.cell.push_str(&code.replace('\n', " "));
            return;
        }
        self.spans.push(StyledSpan::new(code, Style::CodeInline));
    }

    fn blank_line(&mut self) {
        if self.lines.last().is_some_and(|l| !l.spans.is_empty()) {
            self.lines.push(StyledLine::empty());
        }
    }

    /// Prefix for lines inside block quotes and list items.
    fn prefixes(&mut self) -> (Vec<StyledSpan>, Vec<StyledSpan>) {
        let mut first = Vec::new();
        if self.quote_depth > 0 {
            first.push(StyledSpan::new("│ ".repeat(self.quote_depth), Style::BlockQuote));
        }
        let mut rest = first.clone();

        if !self.lists.is_empty() {
            let indent = "  ".repeat(self.lists.len() - 1);
            match self.pending_marker.take() {
                Some((marker, style)) => {
                    let hang = " ".repeat(indent.width() + marker.width());
                    first.push(StyledSpan::new(indent, Style::Plain));
                    first.push(StyledSpan::new(marker, style));
                    rest.push(StyledSpan::new(hang, Style::Plain));
                }
                None => {
                    // Continuation paragraph inside an item.
                    let hang = format!("{indent}  ");
                    first.push(StyledSpan::new(hang.clone(), Style::Plain));
                    rest.push(StyledSpan::new(hang, Style::Plain));
                }
            }
        }
        (first, rest)
    }

    fn flush_block(&mut self) {
        if self.spans.is_empty() {
            return;
        }
        let spans = std::mem::take(&mut self.spans);
        let (first_prefix, rest_prefix) = self.prefixes();
        let opts = WrapOptions {
            width: self.width,
            first_prefix,
            rest_prefix,
        };
        self.lines.extend(wrap_styled_spans(&spans, &opts));
    }

    fn emit_code_block(&mut self, lang: Option<&str>, body: &str) {
        let fence = format!("```{}", lang.unwrap_or(""));
        self.lines.push(StyledLine::styled(fence, Style::CodeFence));

        let mut highlighter = lang.and_then(Lang::from_tag).map(Highlighter::new);
        for line in body.trim_end_matches('\n').split('\n') {
            let mut spans = vec![StyledSpan::new("  ", Style::Plain)];
            match highlighter.as_mut() {
                Some(h) => spans.extend(h.line(line)),
                None => spans.push(StyledSpan::new(line, Style::CodeBlock)),
            }
            self.lines.push(StyledLine { spans });
        }

        self.lines.push(StyledLine::styled("```", Style::CodeFence));
    }

    fn finish(mut self) -> Vec<StyledLine> {
        if let Some((lang, body)) = self.code.take() {
            self.emit_code_block(lang.as_deref(), &body);
        }
        self.flush_block();

        while self.lines.last().is_some_and(|l| l.spans.is_empty()) {
            self.lines.pop();
        }
        if self.lines.is_empty() {
            self.lines.push(StyledLine::empty());
        }
        self.lines
    }
}
