use unicode_width::UnicodeWidthStr;

use super::Node;
use crate::markdown::draw_table;
use crate::markdown::wrap::{WrapOptions, wrap_styled_spans};
use crate::style::{Style, StyledLine, StyledSpan};

/// One piece of a laid-out component.
#[derive(Debug, Clone, PartialEq)]
pub enum LayoutItem {
    Lines(Vec<StyledLine>),
    /// Inline chart by index into the component's charts.
    Chart(usize),
    /// Canvas position; canvas-drawn charts go here.
    Canvas,
}

/// Lays out a resolved component tree at `width` columns.
///
/// Intrinsic HTML-ish tags map to styles and block structure; unknown tags
/// render their children. Consecutive text collapses into one `Lines` item.
pub fn layout(nodes: &[Node], width: usize) -> Vec<LayoutItem> {
    let mut builder = LayoutBuilder::new(width);
    for node in nodes {
        builder.node(node);
    }
    builder.finish()
}

const BLOCK_TAGS: &[&str] = &[
    "div", "p", "section", "header", "footer", "main", "article", "nav", "aside", "form",
    "figure", "figcaption", "details", "summary", "fieldset", "legend", "dl", "dt", "dd",
];

/// A prefix level: list hang or quote bar.
struct Indent {
    text: String,
    style: Style,
}

struct LayoutBuilder {
    width: usize,
    items: Vec<LayoutItem>,
    lines: Vec<StyledLine>,
    spans: Vec<StyledSpan>,
    styles: Vec<Style>,
    indents: Vec<Indent>,
    /// List marker for the current item's first line, with its indent level.
    marker: Option<(usize, StyledSpan)>,
    /// Next number for ordered lists; `None` for bullets.
    lists: Vec<Option<u64>>,
}

impl LayoutBuilder {
    fn new(width: usize) -> Self {
        Self {
            width,
            items: Vec::new(),
            lines: Vec::new(),
            spans: Vec::new(),
            styles: vec![Style::Assistant],
            indents: Vec::new(),
            marker: None,
            lists: Vec::new(),
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or(Style::Assistant)
    }

    fn node(&mut self, node: &Node) {
        match node {
            Node::Text(text) => {
                let style = self.style();
                self.spans.push(StyledSpan::new(text.clone(), style));
            }
            Node::Element { tag, children, .. } => self.element(tag, node, children),
            Node::Chart(index) => self.placeholder(LayoutItem::Chart(*index)),
            Node::Canvas => self.placeholder(LayoutItem::Canvas),
        }
    }

    fn children(&mut self, children: &[Node]) {
        for child in children {
            self.node(child);
        }
    }

    fn styled(&mut self, style: Style, children: &[Node]) {
        self.styles.push(style);
        self.children(children);
        self.styles.pop();
    }

    fn block(&mut self, style: Option<Style>, children: &[Node]) {
        self.flush();
        match style {
            Some(style) => self.styled(style, children),
            None => self.children(children),
        }
        self.flush();
    }

    fn element(&mut self, tag: &str, node: &Node, children: &[Node]) {
        match tag {
            "h1" => self.block(Some(Style::H1), children),
            "h2" => self.block(Some(Style::H2), children),
            "h3" | "h4" | "h5" | "h6" => self.block(Some(Style::H3), children),
            "pre" => self.block(Some(Style::CodeBlock), children),
            "ul" | "ol" => {
                self.flush();
                let start = node
                    .attr("start")
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(1);
                self.lists.push((tag == "ol").then_some(start));
                self.children(children);
                self.flush();
                self.lists.pop();
            }
            "li" => self.list_item(children),
            "blockquote" => {
                self.flush();
                self.indents.push(Indent {
                    text: "│ ".to_string(),
                    style: Style::BlockQuote,
                });
                self.styled(Style::BlockQuote, children);
                self.flush();
                self.indents.pop();
            }
            "table" => self.table(children),
            "hr" => {
                self.flush();
                let rule = "─".repeat(self.width.clamp(1, 40));
                self.lines.push(StyledLine::styled(rule, Style::Rule));
            }
            "br" => {
                let style = self.style();
                self.spans.push(StyledSpan::new("\n", style));
            }
            "strong" | "b" => self.styled(Style::Strong, children),
            "em" | "i" => self.styled(Style::Emphasis, children),
            "code" | "kbd" => self.styled(Style::CodeInline, children),
            "small" => self.styled(Style::Muted, children),
            "a" => {
                self.styled(Style::Link, children);
                if let Some(href) = node.attr("href")
                    && !href.is_empty()
                    && !href.starts_with('#')
                    && href != node.text()
                {
                    self.spans
                        .push(StyledSpan::new(format!(" ({href})"), Style::Muted));
                }
            }
            "button" => {
                let label = node.text();
                let label = label.trim();
                self.spans
                    .push(StyledSpan::new(format!("[ {label} ]"), Style::Button));
            }
            "input" | "textarea" | "select" => self.input(node),
            "img" => {
                let alt = node.attr("alt").unwrap_or("");
                self.spans
                    .push(StyledSpan::new(format!("[image: {alt}]"), Style::Muted));
            }
            tag if BLOCK_TAGS.contains(&tag) => self.block(None, children),
            // span, label and unknown tags
            _ => self.children(children),
        }
    }

    fn list_item(&mut self, children: &[Node]) {
        self.flush();
        let marker = match self.lists.last_mut() {
            Some(Some(n)) => {
                let marker = StyledSpan::new(format!("{n}. "), Style::ListNumber);
                *n += 1;
                marker
            }
            _ => StyledSpan::new("• ", Style::ListBullet),
        };
        self.indents.push(Indent {
            text: " ".repeat(marker.text.width()),
            style: Style::Plain,
        });
        self.marker = Some((self.indents.len() - 1, marker));
        self.children(children);
        self.flush();
        self.indents.pop();
        self.marker = None;
    }

    fn input(&mut self, node: &Node) {
        let span = match node.attr("type") {
            Some("checkbox" | "radio") => {
                let checked = node.attr("checked").is_some_and(|v| v != "false");
                StyledSpan::new(if checked { "[x]" } else { "[ ]" }, Style::Input)
            }
            _ => {
                let value = node
                    .attr("value")
                    .or_else(|| node.attr("defaultValue"))
                    .filter(|v| !v.is_empty());
                match value {
                    Some(value) => StyledSpan::new(format!("[{value}]"), Style::Input),
                    None => {
                        let placeholder = node.attr("placeholder").unwrap_or("");
                        StyledSpan::new(format!("[{placeholder}]"), Style::Muted)
                    }
                }
            }
        };
        self.spans.push(span);
    }

    fn table(&mut self, children: &[Node]) {
        self.flush();
        let mut table = TableRows::default();
        table.collect(children, false);
        let width = self.width.saturating_sub(self.indent_width()).max(10);
        let rest: Vec<StyledSpan> = self.prefix_spans();
        for line in draw_table(&table.header, &table.rows, width) {
            let mut spans = rest.clone();
            spans.push(StyledSpan::new(line, Style::Plain));
            self.lines.push(StyledLine { spans });
        }
    }

    fn placeholder(&mut self, item: LayoutItem) {
        self.flush();
        if !self.lines.is_empty() {
            self.items
                .push(LayoutItem::Lines(std::mem::take(&mut self.lines)));
        }
        self.items.push(item);
    }

    fn indent_width(&self) -> usize {
        self.indents.iter().map(|i| i.text.width()).sum()
    }

    fn prefix_spans(&self) -> Vec<StyledSpan> {
        self.indents
            .iter()
            .map(|i| StyledSpan::new(i.text.clone(), i.style))
            .collect()
    }

    fn flush(&mut self) {
        if self.spans.is_empty() {
            return;
        }
        let spans = std::mem::take(&mut self.spans);
        if spans.iter().all(|s| s.text.trim().is_empty()) {
            return;
        }
        let rest_prefix = self.prefix_spans();
        let mut first_prefix = rest_prefix.clone();
        if let Some((level, marker)) = self.marker.take()
            && let Some(slot) = first_prefix.get_mut(level)
        {
            *slot = marker;
        }
        let opts = WrapOptions {
            width: self.width,
            first_prefix,
            rest_prefix,
        };
        self.lines.extend(wrap_styled_spans(&spans, &opts));
    }

    fn finish(mut self) -> Vec<LayoutItem> {
        self.flush();
        if !self.lines.is_empty() {
            self.items.push(LayoutItem::Lines(self.lines));
        }
        self.items
    }
}

/// Table cells as plain text.
#[derive(Default)]
struct TableRows {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TableRows {
    fn collect(&mut self, nodes: &[Node], in_head: bool) {
        for node in nodes {
            let Node::Element { tag, children, .. } = node else {
                continue;
            };
            match tag.as_str() {
                "thead" => self.collect(children, true),
                "tr" => {
                    let cells: Vec<&Node> = children
                        .iter()
                        .filter(|cell| {
                            matches!(cell, Node::Element { tag, .. } if tag == "th" || tag == "td")
                        })
                        .collect();
                    let all_th = !cells.is_empty()
                        && cells
                            .iter()
                            .all(|cell| matches!(cell, Node::Element { tag, .. } if tag == "th"));
                    let cells: Vec<String> = cells
                        .iter()
                        .map(|cell| cell.text().split_whitespace().collect::<Vec<_>>().join(" "))
                        .collect();
                    if (in_head || all_th) && self.header.is_empty() && self.rows.is_empty() {
                        self.header = cells;
                    } else {
                        self.rows.push(cells);
                    }
                }
                _ => self.collect(children, in_head),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::lines_to_text;

    fn el(tag: &str, children: Vec<Node>) -> Node {
        Node::Element {
            tag: tag.into(),
            attrs: Vec::new(),
            children,
        }
    }

    fn el_with(tag: &str, attrs: &[(&str, &str)], children: Vec<Node>) -> Node {
        Node::Element {
            tag: tag.into(),
            attrs: attrs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            children,
        }
    }

    fn text(s: &str) -> Node {
        Node::Text(s.into())
    }

    fn lines(nodes: &[Node], width: usize) -> Vec<StyledLine> {
        match &layout(nodes, width)[..] {
            [LayoutItem::Lines(lines)] => lines.clone(),
            other => panic!("expected one block of lines, got {other:?}"),
        }
    }

    fn has_style(lines: &[StyledLine], style: Style) -> bool {
        lines
            .iter()
            .any(|l| l.spans.iter().any(|s| s.style == style))
    }

    #[test]
    fn test_blocks_break_and_inline_joins() {
        let nodes = [el(
            "div",
            vec![
                el("h2", vec![text("Totals")]),
                el("p", vec![text("Sum: "), el("strong", vec![text("42")])]),
                el("span", vec![text("a")]),
                el("span", vec![text("b")]),
            ],
        )];
        let lines = lines(&nodes, 40);
        assert_eq!(lines_to_text(&lines), "Totals\nSum: 42\nab");
        assert!(has_style(&lines, Style::H2));
        assert!(has_style(&lines, Style::Strong));
    }

    #[test]
    fn test_lists_hang_and_number() {
        let nodes = [
            el(
                "ul",
                vec![
                    el("li", vec![text("alpha beta gamma")]),
                    el("li", vec![text("two"), el("ul", vec![el("li", vec![text("inner")])])]),
                ],
            ),
            el(
                "ol",
                vec![el("li", vec![text("first")]), el("li", vec![text("second")])],
            ),
        ];
        let text = lines_to_text(&lines(&nodes, 12));
        assert_eq!(
            text,
            "• alpha beta\n  gamma\n• two\n  • inner\n1. first\n2. second"
        );
    }

    #[test]
    fn test_table_uses_header_row() {
        let nodes = [el(
            "table",
            vec![
                el("thead", vec![el("tr", vec![el("th", vec![text("Name")]), el("th", vec![text("Qty")])])]),
                el("tbody", vec![el("tr", vec![el("td", vec![text("apple")]), el("td", vec![text("3")])])]),
            ],
        )];
        let text = lines_to_text(&lines(&nodes, 40));
        assert!(text.contains("Name"));
        assert!(text.contains("apple"));
        let header_line = text.lines().position(|l| l.contains("Name"));
        let row_line = text.lines().position(|l| l.contains("apple"));
        assert!(header_line < row_line);
    }

    #[test]
    fn test_widgets() {
        let nodes = [el(
            "form",
            vec![
                el("label", vec![text("Email ")]),
                el_with("input", &[("placeholder", "you@x.io")], Vec::new()),
                el("br", Vec::new()),
                el_with("input", &[("type", "checkbox"), ("checked", "true")], Vec::new()),
                text(" remember "),
                el("button", vec![text("Save")]),
                el("br", Vec::new()),
                el_with("img", &[("alt", "logo")], Vec::new()),
            ],
        )];
        let lines = lines(&nodes, 60);
        assert_eq!(
            lines_to_text(&lines),
            "Email [you@x.io]\n[x] remember [ Save ]\n[image: logo]"
        );
        assert!(has_style(&lines, Style::Button));
    }

    #[test]
    fn test_link_shows_target() {
        let nodes = [el_with("a", &[("href", "https://x.io")], vec![text("site")])];
        assert_eq!(lines_to_text(&lines(&nodes, 40)), "site (https://x.io)");
    }

    #[test]
    fn test_charts_split_lines() {
        let nodes = [el(
            "div",
            vec![
                el("h3", vec![text("Sales")]),
                Node::Chart(0),
                Node::Canvas,
                el("p", vec![text("done")]),
            ],
        )];
        let items = layout(&nodes, 40);
        assert_eq!(items.len(), 4);
        assert!(matches!(items[1], LayoutItem::Chart(0)));
        assert!(matches!(items[2], LayoutItem::Canvas));
        let LayoutItem::Lines(tail) = &items[3] else {
            panic!("{items:?}");
        };
        assert_eq!(lines_to_text(tail), "done");
    }

    #[test]
    fn test_quote_and_rule() {
        let nodes = [
            el("blockquote", vec![text("quoted")]),
            el("hr", Vec::new()),
            el("custom-tag", vec![text("kept")]),
        ];
        let lines = lines(&nodes, 10);
        assert_eq!(lines[0].text(), "│ quoted");
        assert_eq!(lines[1].text(), "─".repeat(10));
        assert_eq!(lines[2].text(), "kept");
    }
}
