//! Lightweight syntax highlighting for fenced code blocks.
//!
//! Classifies keywords, strings, numbers and comments; everything else is
//! plain code. Block comments may span lines, so a `Highlighter` is fed a
//! code block line by line.

use crate::style::{Style, StyledSpan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    Rust,
    JavaScript,
    Python,
    Shell,
    Json,
}

impl Lang {
    /// Resolves a fence info string (`rust`, `tsx`, `py`, ...).
    pub fn from_tag(tag: &str) -> Option<Self> {
        let tag = tag.split([' ', ',', '{']).next().unwrap_or("").to_ascii_lowercase();
        match tag.as_str() {
            "rust" | "rs" => Some(Lang::Rust),
            "js" | "javascript" | "jsx" | "ts" | "typescript" | "tsx" | "mjs" => {
                Some(Lang::JavaScript)
            }
            "python" | "py" => Some(Lang::Python),
            "sh" | "bash" | "shell" | "zsh" | "console" => Some(Lang::Shell),
            "json" | "jsonc" => Some(Lang::Json),
            _ => None,
        }
    }

    fn syntax(self) -> &'static Syntax {
        match self {
            Lang::Rust => &RUST,
            Lang::JavaScript => &JAVASCRIPT,
            Lang::Python => &PYTHON,
            Lang::Shell => &SHELL,
            Lang::Json => &JSON,
        }
    }
}

struct Syntax {
    keywords: &'static [&'static str],
    line_comment: Option<&'static str>,
    block_comment: Option<(&'static str, &'static str)>,
    quotes: &'static [char],
}

const RUST: Syntax = Syntax {
    keywords: &[
        "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
        "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod",
        "move", "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super",
        "trait", "true", "type", "unsafe", "use", "where", "while",
    ],
    line_comment: Some("//"),
    block_comment: Some(("/*", "*/")),
    quotes: &['"'],
};

const JAVASCRIPT: Syntax = Syntax {
    keywords: &[
        "async", "await", "break", "case", "catch", "class", "const", "continue", "default",
        "delete", "do", "else", "export", "extends", "false", "finally", "for", "from",
        "function", "if", "import", "in", "instanceof", "interface", "let", "new", "null",
        "of", "return", "switch", "this", "throw", "true", "try", "type", "typeof",
        "undefined", "var", "void", "while", "yield",
    ],
    line_comment: Some("//"),
    block_comment: Some(("/*", "*/")),
    quotes: &['"', '\'', '`'],
};

const PYTHON: Syntax = Syntax {
    keywords: &[
        "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del",
        "elif", "else", "except", "False", "finally", "for", "from", "global", "if", "import",
        "in", "is", "lambda", "None", "nonlocal", "not", "or", "pass", "raise", "return",
        "True", "try", "while", "with", "yield",
    ],
    line_comment: Some("#"),
    block_comment: None,
    quotes: &['"', '\''],
};

const SHELL: Syntax = Syntax {
    keywords: &[
        "case", "do", "done", "elif", "else", "esac", "export", "fi", "for", "function", "if",
        "in", "local", "return", "then", "until", "while",
    ],
    line_comment: Some("#"),
    block_comment: None,
    quotes: &['"', '\''],
};

const JSON: Syntax = Syntax {
    keywords: &["true", "false", "null"],
    line_comment: None,
    block_comment: None,
    quotes: &['"'],
};

/// Stateful per-block highlighter.
pub struct Highlighter {
    syntax: &'static Syntax,
    in_block_comment: bool,
}

impl Highlighter {
    pub fn new(lang: Lang) -> Self {
        Self {
            syntax: lang.syntax(),
            in_block_comment: false,
        }
    }

    /// Highlights one line (without its newline).
    pub fn line(&mut self, line: &str) -> Vec<StyledSpan> {
        let mut out = SpanSink::default();
        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            if self.in_block_comment {
                let (_, close) = self.syntax.block_comment.unwrap_or(("", ""));
                match find(&chars, i, close) {
                    Some(end) => {
                        let stop = end + close.chars().count();
                        out.push(&chars[i..stop], Style::Comment);
                        i = stop;
                        self.in_block_comment = false;
                    }
                    None => {
                        out.push(&chars[i..], Style::Comment);
                        i = chars.len();
                    }
                }
                continue;
            }

            let c = chars[i];
            if let Some(prefix) = self.syntax.line_comment
                && starts_with(&chars, i, prefix)
                && (prefix != "#" || i == 0 || chars[i - 1].is_whitespace())
            {
                out.push(&chars[i..], Style::Comment);
                break;
            }
            if let Some((open, _)) = self.syntax.block_comment
                && starts_with(&chars, i, open)
            {
                self.in_block_comment = true;
                let len = open.chars().count();
                out.push(&chars[i..i + len], Style::Comment);
                i += len;
                continue;
            }
            if self.syntax.quotes.contains(&c) {
                let end = string_end(&chars, i);
                out.push(&chars[i..end], Style::StringLiteral);
                i = end;
                continue;
            }
            if c.is_ascii_digit() && (i == 0 || !is_ident_char(chars[i - 1])) {
                let end =
                    scan(&chars, i, |ch| ch.is_ascii_alphanumeric() || ch == '.' || ch == '_');
                out.push(&chars[i..end], Style::NumberLiteral);
                i = end;
                continue;
            }
            if is_ident_start(c) {
                let end = scan(&chars, i, is_ident_char);
                let word: String = chars[i..end].iter().collect();
                let style = if self.syntax.keywords.contains(&word.as_str()) {
                    Style::Keyword
                } else {
                    Style::CodeBlock
                };
                out.push(&chars[i..end], style);
                i = end;
                continue;
            }
            out.push(&chars[i..=i], Style::CodeBlock);
            i += 1;
        }

        out.spans
    }
}

/// Collects spans, merging neighbours of the same style.
#[derive(Default)]
struct SpanSink {
    spans: Vec<StyledSpan>,
}

impl SpanSink {
    fn push(&mut self, chars: &[char], style: Style) {
        if chars.is_empty() {
            return;
        }
        match self.spans.last_mut() {
            Some(last) if last.style == style => last.text.extend(chars),
            _ => self.spans.push(StyledSpan::new(chars.iter().collect::<String>(), style)),
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn scan(chars: &[char], start: usize, keep: impl Fn(char) -> bool) -> usize {
    let mut end = start;
    while end < chars.len() && keep(chars[end]) {
        end += 1;
    }
    end
}

fn starts_with(chars: &[char], at: usize, needle: &str) -> bool {
    let mut idx = at;
    for n in needle.chars() {
        if chars.get(idx) != Some(&n) {
            return false;
        }
        idx += 1;
    }
    true
}

fn find(chars: &[char], from: usize, needle: &str) -> Option<usize> {
    (from..chars.len()).find(|&i| starts_with(chars, i, needle))
}

/// End (exclusive) of the string literal opening at `start`.
fn string_end(chars: &[char], start: usize) -> usize {
    let quote = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn styles_of(spans: &[StyledSpan], style: Style) -> Vec<String> {
        spans
            .iter()
            .filter(|s| s.style == style)
            .map(|s| s.text.clone())
            .collect()
    }

    #[test]
    fn test_lang_from_tag() {
        assert_eq!(Lang::from_tag("tsx"), Some(Lang::JavaScript));
        assert_eq!(Lang::from_tag("Rust"), Some(Lang::Rust));
        assert_eq!(Lang::from_tag("python {.numberLines}"), Some(Lang::Python));
        assert_eq!(Lang::from_tag("cobol"), None);
    }

    #[test]
    fn test_javascript_classes() {
        let mut h = Highlighter::new(Lang::JavaScript);
        let spans = h.line("const total = 42; // sum 'x'");

        assert_eq!(styles_of(&spans, Style::Keyword), ["const"]);
        assert_eq!(styles_of(&spans, Style::NumberLiteral), ["42"]);
        assert_eq!(styles_of(&spans, Style::Comment), ["// sum 'x'"]);
        let text: String = spans.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(text, "const total = 42; // sum 'x'");
    }

    #[test]
    fn test_block_comment_spans_lines() {
        let mut h = Highlighter::new(Lang::Rust);
        let first = h.line("let a = 1; /* start");
        let second = h.line("still comment */ fn");

        assert_eq!(styles_of(&first, Style::Comment), ["/* start"]);
        assert_eq!(styles_of(&second, Style::Comment), ["still comment */"]);
        assert_eq!(styles_of(&second, Style::Keyword), ["fn"]);
    }

    #[test]
    fn test_strings_with_escapes() {
        let mut h = Highlighter::new(Lang::Python);
        let spans = h.line(r#"print("a \"q\" b")"#);
        assert_eq!(styles_of(&spans, Style::StringLiteral), [r#""a \"q\" b""#]);
    }

    #[test]
    fn test_shell_hash_inside_word_is_not_comment() {
        let mut h = Highlighter::new(Lang::Shell);
        let spans = h.line("echo a#b # note");
        assert_eq!(styles_of(&spans, Style::Comment), ["# note"]);
    }

    #[test]
    fn test_identifier_digits_are_not_numbers() {
        let mut h = Highlighter::new(Lang::Json);
        let spans = h.line(r#"{"v2": 10, "ok": true}"#);
        assert_eq!(styles_of(&spans, Style::NumberLiteral), ["10"]);
        assert_eq!(styles_of(&spans, Style::Keyword), ["true"]);
    }
}
