/// A styled span of text (UI-agnostic).
///
/// This is a minimal representation that frontends convert to their own
/// span and line types at draw time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledSpan {
    pub text: String,
    pub style: Style,
}

impl StyledSpan {
    pub fn new(text: impl Into<String>, style: Style) -> Self {
        Self {
            text: text.into(),
            style,
        }
    }
}

/// A line of styled spans.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StyledLine {
    pub spans: Vec<StyledSpan>,
}

impl StyledLine {
    /// Creates an empty line.
    pub fn empty() -> Self {
        StyledLine { spans: vec![] }
    }

    /// Single-span line.
    pub fn styled(text: impl Into<String>, style: Style) -> Self {
        StyledLine {
            spans: vec![StyledSpan::new(text, style)],
        }
    }

    /// Concatenated text of all spans.
    pub fn text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    pub fn is_blank(&self) -> bool {
        self.spans.iter().all(|s| s.text.trim().is_empty())
    }
}

/// Joins lines into plain text, one line per row.
pub fn lines_to_text(lines: &[StyledLine]) -> String {
    lines
        .iter()
        .map(StyledLine::text)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Semantic style identifiers (UI-agnostic).
///
/// These are translated to actual terminal styles by the frontend.
/// This keeps the renderer free of terminal dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Style {
    /// No styling.
    Plain,
    /// User message text.
    User,
    /// Assistant message text.
    Assistant,
    /// Placeholder shown while a reply is pending.
    Pending,
    /// Message that failed to send.
    Failed,
    /// Dimmed helper text.
    Muted,

    // Markdown styles
    /// Inline code (`code`).
    CodeInline,
    /// Fenced code block content.
    CodeBlock,
    /// Code fence markers (` ``` ` - rendered subtly).
    CodeFence,
    /// Emphasized text (*italic*).
    Emphasis,
    /// Strong text (**bold**).
    Strong,
    /// Heading level 1 (# Heading).
    H1,
    /// Heading level 2 (## Heading).
    H2,
    /// Heading level 3+ (`### Heading`).
    H3,
    /// Link text.
    Link,
    /// Blockquote content.
    BlockQuote,
    /// List bullet marker.
    ListBullet,
    /// List number marker.
    ListNumber,
    /// Horizontal rule and table borders.
    Rule,

    // Syntax highlighting
    Keyword,
    StringLiteral,
    NumberLiteral,
    Comment,

    // Blocks and components
    /// Title of a content block.
    BlockTitle,
    /// Description of a code block.
    BlockDescription,
    /// Button label in a rendered component.
    Button,
    /// Input field in a rendered component.
    Input,

    // Charts
    ChartTitle,
    ChartLabel,
    ChartBar,
    ChartAxis,
    ChartLegend,

    // Errors
    /// Label of an inline block error ("transpile error").
    ErrorLabel,
    /// Message of an inline block error.
    ErrorText,
}

impl Style {
    /// Whether wrapping must keep this span's whitespace intact.
    pub fn preserves_whitespace(self) -> bool {
        matches!(
            self,
            Style::CodeInline
                | Style::CodeBlock
                | Style::Keyword
                | Style::StringLiteral
                | Style::NumberLiteral
                | Style::Comment
        )
    }
}
