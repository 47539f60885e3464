use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::style::{Style, StyledLine, StyledSpan};

/// Options for wrapping styled spans with hanging indents.
#[derive(Debug, Clone, Default)]
pub struct WrapOptions {
    /// Maximum display width for lines.
    pub width: usize,
    /// Prefix spans for the first line (e.g., "• " for a list bullet).
    pub first_prefix: Vec<StyledSpan>,
    /// Prefix spans for continuation lines (e.g., "  " for alignment).
    pub rest_prefix: Vec<StyledSpan>,
}

impl WrapOptions {
    /// Creates wrap options with just a width (no prefixes).
    pub fn new(width: usize) -> Self {
        Self {
            width,
            first_prefix: vec![],
            rest_prefix: vec![],
        }
    }

    /// Same prefix on every line.
    pub fn indented(width: usize, prefix: Vec<StyledSpan>) -> Self {
        Self {
            width,
            first_prefix: prefix.clone(),
            rest_prefix: prefix,
        }
    }
}

fn prefix_width(spans: &[StyledSpan]) -> usize {
    spans.iter().map(|s| s.text.width()).sum()
}

/// Accumulates one output line at a time.
struct LineBuilder<'a> {
    opts: &'a WrapOptions,
    lines: Vec<StyledLine>,
    spans: Vec<StyledSpan>,
    used: usize,
    first_avail: usize,
    rest_avail: usize,
}

impl<'a> LineBuilder<'a> {
    fn new(opts: &'a WrapOptions) -> Self {
        Self {
            opts,
            lines: Vec::new(),
            spans: Vec::new(),
            used: 0,
            first_avail: opts.width.saturating_sub(prefix_width(&opts.first_prefix)).max(1),
            rest_avail: opts.width.saturating_sub(prefix_width(&opts.rest_prefix)).max(1),
        }
    }

    fn on_first_line(&self) -> bool {
        self.lines.is_empty()
    }

    fn avail(&self) -> usize {
        if self.on_first_line() {
            self.first_avail
        } else {
            self.rest_avail
        }
    }

    fn remaining(&self) -> usize {
        self.avail().saturating_sub(self.used)
    }

    fn break_line(&mut self) {
        let mut spans = if self.on_first_line() {
            self.opts.first_prefix.clone()
        } else {
            self.opts.rest_prefix.clone()
        };
        spans.append(&mut self.spans);
        self.lines.push(StyledLine { spans });
        self.used = 0;
    }

    /// Appends text known to fit, merging with a same-styled neighbour.
    fn put(&mut self, text: &str, style: Style) {
        if text.is_empty() {
            return;
        }
        self.used += text.width();
        match self.spans.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.spans.push(StyledSpan::new(text, style)),
        }
    }

    fn space(&mut self, style: Style) {
        if self.used > 0 && self.remaining() > 0 {
            self.put(" ", style);
        }
    }

    /// Places a word, moving to a fresh line or splitting it when needed.
    fn word(&mut self, word: &str, style: Style) {
        let width = word.width();
        if width <= self.remaining() {
            self.put(word, style);
            return;
        }
        if self.used > 0 {
            // Drop the separator left dangling at the end of the line.
            if let Some(last) = self.spans.last_mut()
                && last.text.ends_with(' ')
            {
                last.text.pop();
            }
            self.break_line();
        }
        self.chars(word, style);
    }

    /// Places text character by character, breaking at the width.
    fn chars(&mut self, text: &str, style: Style) {
        let mut chunk = String::new();
        let mut chunk_width = 0;
        for ch in text.chars() {
            let w = ch.width().unwrap_or(0);
            if w > 0 && chunk_width + w > self.remaining() {
                if !chunk.is_empty() {
                    self.put(&std::mem::take(&mut chunk), style);
                    chunk_width = 0;
                }
                if self.used > 0 {
                    self.break_line();
                }
            }
            chunk.push(ch);
            chunk_width += w;
        }
        self.put(&chunk, style);
    }

    fn finish(mut self) -> Vec<StyledLine> {
        if !self.spans.is_empty() || self.lines.is_empty() {
            self.break_line();
        }
        self.lines
    }
}

/// Wraps styled spans to `opts.width`, keeping styles across breaks.
///
/// - Prose wraps at word boundaries with whitespace collapsed
/// - Code-like styles keep their whitespace and break by character
/// - `\n` inside a span forces a line break
pub fn wrap_styled_spans(spans: &[StyledSpan], opts: &WrapOptions) -> Vec<StyledLine> {
    if opts.width == 0 {
        let mut all = opts.first_prefix.clone();
        all.extend(spans.iter().cloned());
        return vec![StyledLine { spans: all }];
    }

    let mut builder = LineBuilder::new(opts);
    for span in spans {
        for (i, part) in span.text.split('\n').enumerate() {
            if i > 0 {
                builder.break_line();
            }
            if span.style.preserves_whitespace() {
                builder.chars(part, span.style);
                continue;
            }
            if part.starts_with(char::is_whitespace) {
                builder.space(span.style);
            }
            let mut words = part.split_whitespace().peekable();
            while let Some(word) = words.next() {
                builder.word(word, span.style);
                if words.peek().is_some() {
                    builder.space(span.style);
                }
            }
            if part.ends_with(char::is_whitespace) && !part.trim().is_empty() {
                builder.space(span.style);
            }
        }
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_of(line: &StyledLine) -> String {
        line.text()
    }

    #[test]
    fn test_wrap_fits_on_one_line() {
        let spans = vec![StyledSpan::new("hello world", Style::Assistant)];
        let lines = wrap_styled_spans(&spans, &WrapOptions::new(20));

        assert_eq!(lines.len(), 1);
        assert_eq!(text_of(&lines[0]), "hello world");
        assert!(lines[0].spans.iter().all(|s| s.style == Style::Assistant));
    }

    #[test]
    fn test_wrap_breaks_between_words() {
        let spans = vec![StyledSpan::new("hello world", Style::Assistant)];
        let lines = wrap_styled_spans(&spans, &WrapOptions::new(8));

        assert_eq!(lines.len(), 2);
        assert_eq!(text_of(&lines[0]), "hello");
        assert_eq!(text_of(&lines[1]), "world");
    }

    #[test]
    fn test_wrap_keeps_style_across_break() {
        let spans = vec![
            StyledSpan::new("hello ", Style::Assistant),
            StyledSpan::new("world", Style::Strong),
        ];
        let lines = wrap_styled_spans(&spans, &WrapOptions::new(8));

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].spans[0].style, Style::Strong);
    }

    #[test]
    fn test_wrap_preserves_code_whitespace() {
        let spans = vec![StyledSpan::new("foo  bar", Style::CodeInline)];
        let lines = wrap_styled_spans(&spans, &WrapOptions::new(20));
        assert_eq!(lines[0].spans[0].text, "foo  bar");
    }

    #[test]
    fn test_wrap_hard_break() {
        let spans = vec![StyledSpan::new("line1\nline2", Style::Assistant)];
        let lines = wrap_styled_spans(&spans, &WrapOptions::new(20));
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn test_wrap_hanging_indent() {
        let spans = vec![StyledSpan::new(
            "this is a longer text that should wrap",
            Style::Assistant,
        )];
        let opts = WrapOptions {
            width: 20,
            first_prefix: vec![StyledSpan::new("• ", Style::ListBullet)],
            rest_prefix: vec![StyledSpan::new("  ", Style::Plain)],
        };
        let lines = wrap_styled_spans(&spans, &opts);

        assert!(lines.len() > 1);
        assert_eq!(lines[0].spans[0].text, "• ");
        assert_eq!(lines[1].spans[0].text, "  ");
        assert!(lines.iter().all(|l| l.text().width() <= 20));
    }

    #[test]
    fn test_wrap_splits_overlong_word() {
        let spans = vec![StyledSpan::new("abcdefghij", Style::Assistant)];
        let lines = wrap_styled_spans(&spans, &WrapOptions::new(4));
        let texts: Vec<_> = lines.iter().map(text_of).collect();
        assert_eq!(texts, ["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_wrap_empty_input_yields_prefix_line() {
        let opts = WrapOptions::indented(10, vec![StyledSpan::new("> ", Style::BlockQuote)]);
        let lines = wrap_styled_spans(&[], &opts);
        assert_eq!(lines.len(), 1);
        assert_eq!(text_of(&lines[0]), "> ");
    }
}
