//! Tokenizer for the component language.
//!
//! The parser drives the lexer in one of three ways: ordinary code tokens,
//! tokens inside a JSX tag (where `-` joins names and `>` never combines),
//! and raw JSX child text.

use super::error::TranspileError;

type Result<T> = std::result::Result<T, TranspileError>;

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Num(f64),
    Str(String),
    Template(Vec<TemplatePart>),
    Ident(String),
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    /// Source of a `${...}` hole and where it starts.
    Expr {
        source: String,
        line: usize,
        column: usize,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub line: usize,
    pub column: usize,
    /// A line break separates this token from the previous one.
    pub newline_before: bool,
}

impl Token {
    pub fn is(&self, punct: &str) -> bool {
        matches!(self.tok, Tok::Punct(p) if p == punct)
    }

    pub fn is_word(&self, word: &str) -> bool {
        matches!(&self.tok, Tok::Ident(w) if w == word)
    }

    /// Short rendering for error messages.
    pub fn describe(&self) -> String {
        match &self.tok {
            Tok::Num(n) => format!("number `{n}`"),
            Tok::Str(_) => "string literal".to_string(),
            Tok::Template(_) => "template literal".to_string(),
            Tok::Ident(w) => format!("`{w}`"),
            Tok::Punct(p) => format!("`{p}`"),
            Tok::Eof => "end of input".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Code,
    Tag,
}

/// Saved lexer position for backtracking.
#[derive(Debug, Clone, Copy)]
pub struct Mark {
    pos: usize,
    line: usize,
    column: usize,
}

// Longest first.
const PUNCTS: &[&str] = &[
    "...", "===", "!==", "**=", "??=", "||=", "&&=", "=>", "==", "!=", "<=", ">=", "&&", "||",
    "??", "?.", "++", "--", "+=", "-=", "*=", "/=", "%=", "**", "{", "}", "(", ")", "[", "]",
    ";", ",", "<", ">", "+", "-", "*", "/", "%", "=", "!", "?", ":", ".", "&", "|", "^", "~",
];

pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self::with_origin(source, 1, 1)
    }

    /// Lexer whose positions are reported relative to `line`/`column`.
    pub fn with_origin(source: &str, line: usize, column: usize) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line,
            column,
        }
    }

    pub fn mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            line: self.line,
            column: self.column,
        }
    }

    pub fn reset(&mut self, mark: Mark) {
        self.pos = mark.pos;
        self.line = mark.line;
        self.column = mark.column;
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn starts_with(&self, s: &str) -> bool {
        s.chars().enumerate().all(|(i, c)| self.peek_at(i) == Some(c))
    }

    fn error(&self, message: impl Into<String>) -> TranspileError {
        TranspileError::new(self.line, self.column, message)
    }

    /// Skips whitespace and comments; returns whether a newline was crossed.
    fn skip_trivia(&mut self) -> Result<bool> {
        let mut newline = false;
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    newline |= c == '\n';
                    self.bump();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    while self.peek().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    let start = self.mark();
                    self.bump();
                    self.bump();
                    loop {
                        if self.starts_with("*/") {
                            self.bump();
                            self.bump();
                            break;
                        }
                        match self.bump() {
                            Some('\n') => newline = true,
                            Some(_) => {}
                            None => {
                                return Err(TranspileError::new(
                                    start.line,
                                    start.column,
                                    "unterminated comment",
                                ));
                            }
                        }
                    }
                }
                _ => return Ok(newline),
            }
        }
    }

    pub fn next_token(&mut self, mode: Mode) -> Result<Token> {
        let newline_before = self.skip_trivia()?;
        let (line, column) = (self.line, self.column);
        let token = |tok| Token {
            tok,
            line,
            column,
            newline_before,
        };

        let Some(c) = self.peek() else {
            return Ok(token(Tok::Eof));
        };

        if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit()))
        {
            return Ok(token(Tok::Num(self.number()?)));
        }
        if is_ident_start(c) {
            return Ok(token(Tok::Ident(self.ident(mode))));
        }
        if c == '"' || c == '\'' {
            return Ok(token(Tok::Str(self.string()?)));
        }
        if c == '`' {
            return Ok(token(Tok::Template(self.template()?)));
        }
        if mode == Mode::Tag && (c == '>' || c == '/') {
            self.bump();
            return Ok(token(Tok::Punct(if c == '>' { ">" } else { "/" })));
        }

        for p in PUNCTS {
            if self.starts_with(p) {
                // `a?.5:b` is a conditional, not optional chaining.
                if *p == "?." && self.peek_at(2).is_some_and(|d| d.is_ascii_digit()) {
                    continue;
                }
                for _ in 0..p.len() {
                    self.bump();
                }
                return Ok(token(Tok::Punct(p)));
            }
        }

        Err(self.error(format!("unexpected character `{c}`")))
    }

    /// Raw JSX text up to the next `<` or `{` (not consumed).
    ///
    /// Returns `None` at end of input.
    pub fn jsx_text(&mut self) -> Option<String> {
        let mut text = String::new();
        loop {
            match self.peek() {
                None => return None,
                Some('<' | '{') => return Some(text),
                Some(_) => {
                    if let Some(c) = self.bump() {
                        text.push(c);
                    }
                }
            }
        }
    }

    fn ident(&mut self, mode: Mode) -> String {
        let mut word = String::new();
        while let Some(c) = self.peek() {
            let dash = mode == Mode::Tag && c == '-';
            if !(is_ident_char(c) || dash) {
                break;
            }
            word.push(c);
            self.bump();
        }
        word
    }

    fn number(&mut self) -> Result<f64> {
        let (line, column) = (self.line, self.column);
        let radix = match (self.peek(), self.peek_at(1)) {
            (Some('0'), Some('x' | 'X')) => 16,
            (Some('0'), Some('b' | 'B')) => 2,
            (Some('0'), Some('o' | 'O')) => 8,
            _ => 10,
        };

        let mut text = String::new();
        if radix != 10 {
            self.bump();
            self.bump();
            while let Some(c) = self.peek().filter(|c| c.is_ascii_alphanumeric() || *c == '_') {
                self.bump();
                if c != '_' {
                    text.push(c);
                }
            }
            return u64::from_str_radix(&text, radix)
                .map(|n| n as f64)
                .map_err(|_| TranspileError::new(line, column, "invalid number literal"));
        }

        while let Some(c) = self.peek() {
            let exponent_sign =
                (c == '+' || c == '-') && text.ends_with(['e', 'E']);
            let numeric = c.is_ascii_digit() || matches!(c, '.' | '_' | 'e' | 'E');
            if !(numeric || exponent_sign) {
                break;
            }
            // `1..toString()` and `[1].map` style member access after an integer.
            if c == '.' && (text.contains('.') || text.contains(['e', 'E'])) {
                break;
            }
            self.bump();
            if c != '_' {
                text.push(c);
            }
        }
        text.parse::<f64>()
            .map_err(|_| TranspileError::new(line, column, format!("invalid number `{text}`")))
    }

    fn escape(&mut self, out: &mut String) -> Result<()> {
        let Some(c) = self.bump() else {
            return Err(self.error("unterminated escape sequence"));
        };
        match c {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '0' => out.push('\0'),
            '\n' => {}
            'u' => {
                let code = if self.peek() == Some('{') {
                    self.bump();
                    let mut hex = String::new();
                    while let Some(h) = self.bump() {
                        if h == '}' {
                            break;
                        }
                        hex.push(h);
                    }
                    hex
                } else {
                    (0..4).filter_map(|_| self.bump()).collect()
                };
                let ch = u32::from_str_radix(&code, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| self.error("invalid unicode escape"))?;
                out.push(ch);
            }
            'x' => {
                let code: String = (0..2).filter_map(|_| self.bump()).collect();
                let ch = u32::from_str_radix(&code, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| self.error("invalid hex escape"))?;
                out.push(ch);
            }
            other => out.push(other),
        }
        Ok(())
    }

    fn string(&mut self) -> Result<String> {
        let (line, column) = (self.line, self.column);
        let quote = self.bump();
        let mut out = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(TranspileError::new(line, column, "unterminated string literal"));
                }
                Some('\\') => {
                    self.bump();
                    self.escape(&mut out)?;
                }
                Some(c) => {
                    self.bump();
                    if Some(c) == quote {
                        return Ok(out);
                    }
                    out.push(c);
                }
            }
        }
    }

    fn template(&mut self) -> Result<Vec<TemplatePart>> {
        let (line, column) = (self.line, self.column);
        let unterminated = || TranspileError::new(line, column, "unterminated template literal");
        self.bump();

        let mut parts = Vec::new();
        let mut text = String::new();
        loop {
            match self.peek() {
                None => return Err(unterminated()),
                Some('`') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    self.escape(&mut text)?;
                }
                Some('$') if self.peek_at(1) == Some('{') => {
                    self.bump();
                    self.bump();
                    if !text.is_empty() {
                        parts.push(TemplatePart::Text(std::mem::take(&mut text)));
                    }
                    let (line, column) = (self.line, self.column);
                    let start = self.pos;
                    let end = self.hole_end().ok_or_else(unterminated)?;
                    parts.push(TemplatePart::Expr {
                        source: self.chars[start..end].iter().collect(),
                        line,
                        column,
                    });
                }
                Some(c) => {
                    self.bump();
                    text.push(c);
                }
            }
        }
        if !text.is_empty() {
            parts.push(TemplatePart::Text(text));
        }
        Ok(parts)
    }

    /// Consumes a `${...}` hole through its closing brace and returns the
    /// index of that brace.
    fn hole_end(&mut self) -> Option<usize> {
        let mut depth = 1usize;
        loop {
            match self.peek()? {
                '{' => {
                    depth += 1;
                    self.bump();
                }
                '}' => {
                    depth -= 1;
                    let at = self.pos;
                    self.bump();
                    if depth == 0 {
                        return Some(at);
                    }
                }
                '"' | '\'' => {
                    self.string().ok()?;
                }
                '`' => {
                    self.template().ok()?;
                }
                _ => {
                    self.bump();
                }
            }
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
