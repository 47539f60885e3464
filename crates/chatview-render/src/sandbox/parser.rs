//! Recursive descent parser for the component language.
//!
//! Covers the subset generated UI code uses: declarations, functions and
//! arrows, destructuring, control flow, the usual operators, template
//! strings and JSX. Semicolons are optional at line breaks.

use std::rc::Rc;

use super::ast::{
    Arg, ArrayItem, AssignOp, BinaryOp, DeclKind, Expr, FunctionBody, FunctionDef, JsxAttr,
    JsxChild, JsxElement, LogicalOp, Pattern, PatternElem, Program, PropDef, PropKey, Stmt,
    TemplatePiece, UnaryOp,
};
use super::error::TranspileError;
use super::lexer::{Lexer, Mark, Mode, TemplatePart, Tok, Token};

type Result<T> = std::result::Result<T, TranspileError>;

/// Deepest statement/expression nesting accepted.
const MAX_NESTING: usize = 200;

const RESERVED: &[&str] = &[
    "break", "case", "catch", "class", "const", "continue", "default", "delete", "do", "else",
    "export", "false", "for", "function", "if", "import", "in", "instanceof", "let", "new",
    "null", "return", "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while",
];

/// Parses a whole component source.
///
/// # Errors
/// Returns the first lexical or syntax error with its position.
pub fn parse_program(source: &str) -> Result<Program> {
    let mut parser = Parser::new(Lexer::new(source))?;
    let mut body = Vec::new();
    while parser.tok.tok != Tok::Eof {
        body.push(parser.statement()?);
    }
    Ok(Program { body })
}

enum BinOp {
    Arith(BinaryOp),
    Logic(LogicalOp),
}

fn binary_op(token: &Token) -> Option<(u8, BinOp)> {
    let op = match &token.tok {
        Tok::Punct(p) => *p,
        Tok::Ident(w) if w == "in" => return Some((8, BinOp::Arith(BinaryOp::In))),
        _ => return None,
    };
    Some(match op {
        "??" => (1, BinOp::Logic(LogicalOp::Nullish)),
        "||" => (2, BinOp::Logic(LogicalOp::Or)),
        "&&" => (3, BinOp::Logic(LogicalOp::And)),
        "==" => (7, BinOp::Arith(BinaryOp::Eq)),
        "!=" => (7, BinOp::Arith(BinaryOp::NotEq)),
        "===" => (7, BinOp::Arith(BinaryOp::StrictEq)),
        "!==" => (7, BinOp::Arith(BinaryOp::StrictNotEq)),
        "<" => (8, BinOp::Arith(BinaryOp::Lt)),
        ">" => (8, BinOp::Arith(BinaryOp::Gt)),
        "<=" => (8, BinOp::Arith(BinaryOp::LtEq)),
        ">=" => (8, BinOp::Arith(BinaryOp::GtEq)),
        "+" => (10, BinOp::Arith(BinaryOp::Add)),
        "-" => (10, BinOp::Arith(BinaryOp::Sub)),
        "*" => (11, BinOp::Arith(BinaryOp::Mul)),
        "/" => (11, BinOp::Arith(BinaryOp::Div)),
        "%" => (11, BinOp::Arith(BinaryOp::Rem)),
        "**" => (12, BinOp::Arith(BinaryOp::Pow)),
        _ => return None,
    })
}

fn assign_op(token: &Token) -> Option<AssignOp> {
    let Tok::Punct(p) = token.tok else {
        return None;
    };
    Some(match p {
        "=" => AssignOp::Assign,
        "+=" => AssignOp::Arith(BinaryOp::Add),
        "-=" => AssignOp::Arith(BinaryOp::Sub),
        "*=" => AssignOp::Arith(BinaryOp::Mul),
        "/=" => AssignOp::Arith(BinaryOp::Div),
        "%=" => AssignOp::Arith(BinaryOp::Rem),
        "**=" => AssignOp::Arith(BinaryOp::Pow),
        "||=" => AssignOp::Logical(LogicalOp::Or),
        "&&=" => AssignOp::Logical(LogicalOp::And),
        "??=" => AssignOp::Logical(LogicalOp::Nullish),
        _ => return None,
    })
}

fn decl_kind(token: &Token) -> Option<DeclKind> {
    match &token.tok {
        Tok::Ident(w) if w == "const" => Some(DeclKind::Const),
        Tok::Ident(w) if w == "let" => Some(DeclKind::Let),
        Tok::Ident(w) if w == "var" => Some(DeclKind::Var),
        _ => None,
    }
}

fn is_assignable(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Ident(_) | Expr::Member { .. } | Expr::Index { .. }
    )
}

struct Parser {
    lexer: Lexer,
    tok: Token,
    depth: usize,
}

impl Parser {
    fn new(mut lexer: Lexer) -> Result<Self> {
        let tok = lexer.next_token(Mode::Code)?;
        Ok(Self {
            lexer,
            tok,
            depth: 0,
        })
    }

    fn bump(&mut self) -> Result<Token> {
        let next = self.lexer.next_token(Mode::Code)?;
        Ok(std::mem::replace(&mut self.tok, next))
    }

    fn bump_tag(&mut self) -> Result<Token> {
        let next = self.lexer.next_token(Mode::Tag)?;
        Ok(std::mem::replace(&mut self.tok, next))
    }

    /// Next token after the current one, without consuming anything.
    fn peek(&mut self) -> Result<Token> {
        let mark = self.lexer.mark();
        let next = self.lexer.next_token(Mode::Code);
        self.lexer.reset(mark);
        next
    }

    fn save(&self) -> (Mark, Token) {
        (self.lexer.mark(), self.tok.clone())
    }

    fn restore(&mut self, (mark, tok): (Mark, Token)) {
        self.lexer.reset(mark);
        self.tok = tok;
    }

    fn error_here(&self, message: impl Into<String>) -> TranspileError {
        TranspileError::new(self.tok.line, self.tok.column, message)
    }

    fn unexpected<T>(&self) -> Result<T> {
        Err(self.error_here(format!("unexpected {}", self.tok.describe())))
    }

    fn eat(&mut self, punct: &str) -> Result<bool> {
        if self.tok.is(punct) {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Checks the current token without advancing.
    fn expect_current(&self, punct: &str) -> Result<()> {
        if self.tok.is(punct) {
            Ok(())
        } else {
            Err(self.error_here(format!(
                "expected `{punct}`, found {}",
                self.tok.describe()
            )))
        }
    }

    fn expect(&mut self, punct: &str) -> Result<()> {
        self.expect_current(punct)?;
        self.bump()?;
        Ok(())
    }

    fn expect_ident(&mut self) -> Result<String> {
        match &self.tok.tok {
            Tok::Ident(w) if !RESERVED.contains(&w.as_str()) => {
                let word = w.clone();
                self.bump()?;
                Ok(word)
            }
            _ => Err(self.error_here(format!(
                "expected identifier, found {}",
                self.tok.describe()
            ))),
        }
    }

    /// Property name after `.` or in an object literal; reserved words allowed.
    fn property_name(&mut self) -> Result<String> {
        let name = match &self.tok.tok {
            Tok::Ident(w) | Tok::Str(w) => w.clone(),
            Tok::Num(n) => super::value::format_number(*n),
            _ => {
                return Err(self.error_here(format!(
                    "expected property name, found {}",
                    self.tok.describe()
                )));
            }
        };
        self.bump()?;
        Ok(name)
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_NESTING {
            return Err(self.error_here("code is nested too deeply"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Statement terminator; a line break, `}` or end of input also ends one.
    fn semicolon(&mut self) -> Result<()> {
        if self.eat(";")?
            || self.tok.is("}")
            || self.tok.tok == Tok::Eof
            || self.tok.newline_before
        {
            Ok(())
        } else {
            Err(self.error_here(format!("expected `;`, found {}", self.tok.describe())))
        }
    }

    // ---- statements ----

    fn statement(&mut self) -> Result<Stmt> {
        self.nested(Self::statement_inner)
    }

    fn statement_inner(&mut self) -> Result<Stmt> {
        let word = match &self.tok.tok {
            Tok::Ident(w) => Some(w.clone()),
            _ => None,
        };
        match word.as_deref() {
            Some("import") if !self.peek()?.is("(") => return self.import(),
            Some("export") => return self.export(),
            Some("const" | "let" | "var") => {
                let decl = self.declaration()?;
                self.semicolon()?;
                return Ok(decl);
            }
            Some("function") => return Ok(Stmt::Function(self.function()?)),
            Some("async") if self.peek()?.is_word("function") => {
                self.bump()?;
                return Ok(Stmt::Function(self.function()?));
            }
            Some("return") => {
                self.bump()?;
                let value = if self.tok.is(";")
                    || self.tok.is("}")
                    || self.tok.tok == Tok::Eof
                    || self.tok.newline_before
                {
                    None
                } else {
                    Some(self.expression()?)
                };
                self.semicolon()?;
                return Ok(Stmt::Return(value));
            }
            Some("if") => return self.if_statement(),
            Some("for") => return self.for_statement(),
            Some("while") => {
                self.bump()?;
                self.expect("(")?;
                let test = self.expression()?;
                self.expect(")")?;
                let body = Box::new(self.statement()?);
                return Ok(Stmt::While { test, body });
            }
            Some(w @ ("break" | "continue")) => {
                let stmt = if w == "break" {
                    Stmt::Break
                } else {
                    Stmt::Continue
                };
                self.bump()?;
                self.semicolon()?;
                return Ok(stmt);
            }
            Some("throw") => {
                self.bump()?;
                let value = self.expression()?;
                self.semicolon()?;
                return Ok(Stmt::Throw(value));
            }
            Some(w @ ("class" | "try" | "switch" | "do")) => {
                return Err(self.error_here(format!("`{w}` statements are not supported")));
            }
            _ => {}
        }

        if self.tok.is("{") {
            return Ok(Stmt::Block(self.block()?));
        }
        if self.eat(";")? {
            return Ok(Stmt::Empty);
        }
        let expr = self.expression()?;
        self.semicolon()?;
        Ok(Stmt::Expr(expr))
    }

    /// Module imports bind nothing; every capability is already global.
    fn import(&mut self) -> Result<Stmt> {
        self.bump()?;
        loop {
            match &self.tok.tok {
                Tok::Str(_) => {
                    self.bump()?;
                    break;
                }
                Tok::Eof => return Err(self.error_here("unterminated import")),
                _ => {
                    self.bump()?;
                }
            }
        }
        self.semicolon()?;
        Ok(Stmt::Empty)
    }

    fn export(&mut self) -> Result<Stmt> {
        self.bump()?;
        if self.tok.is_word("default") {
            self.bump()?;
            if self.tok.is_word("async") && self.peek()?.is_word("function") {
                self.bump()?;
            }
            if self.tok.is_word("function") {
                return Ok(Stmt::ExportDefault(Expr::Function(self.function()?)));
            }
            let value = self.assignment()?;
            self.semicolon()?;
            return Ok(Stmt::ExportDefault(value));
        }

        // `export { App as default, helper }`
        if self.eat("{")? {
            let mut default = None;
            while !self.eat("}")? {
                let name = self.expect_ident()?;
                if self.tok.is_word("as") {
                    self.bump()?;
                    if self.property_name()? == "default" {
                        default = Some(name);
                    }
                }
                if !self.eat(",")? {
                    self.expect("}")?;
                    break;
                }
            }
            self.semicolon()?;
            return Ok(default.map_or(Stmt::Empty, |name| {
                Stmt::ExportDefault(Expr::Ident(name))
            }));
        }
        self.statement()
    }

    fn declaration(&mut self) -> Result<Stmt> {
        let Some(kind) = decl_kind(&self.tok) else {
            return self.unexpected();
        };
        self.bump()?;
        let mut decls = Vec::new();
        loop {
            let pattern = self.binding_pattern()?;
            let init = if self.eat("=")? {
                Some(self.assignment()?)
            } else {
                None
            };
            decls.push((pattern, init));
            if !self.eat(",")? {
                break;
            }
        }
        Ok(Stmt::Decl { kind, decls })
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.bump()?;
        self.expect("(")?;
        let test = self.expression()?;
        self.expect(")")?;
        let then = Box::new(self.statement()?);
        let otherwise = if self.tok.is_word("else") {
            self.bump()?;
            Some(Box::new(self.statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            test,
            then,
            otherwise,
        })
    }

    fn for_statement(&mut self) -> Result<Stmt> {
        self.bump()?;
        self.expect("(")?;

        if let Some(kind) = decl_kind(&self.tok) {
            let saved = self.save();
            self.bump()?;
            let pattern = self.binding_pattern()?;
            if self.tok.is_word("of") || self.tok.is_word("in") {
                let keys = self.tok.is_word("in");
                self.bump()?;
                let iterable = self.expression()?;
                self.expect(")")?;
                let body = Box::new(self.statement()?);
                return Ok(Stmt::ForEach {
                    kind,
                    pattern,
                    iterable,
                    keys,
                    body,
                });
            }
            self.restore(saved);
        }

        let init = if self.tok.is(";") {
            None
        } else if decl_kind(&self.tok).is_some() {
            Some(Box::new(self.declaration()?))
        } else {
            Some(Box::new(Stmt::Expr(self.expression()?)))
        };
        self.expect(";")?;
        let test = if self.tok.is(";") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(";")?;
        let update = if self.tok.is(")") {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(")")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::For {
            init,
            test,
            update,
            body,
        })
    }

    fn block(&mut self) -> Result<Vec<Stmt>> {
        self.expect("{")?;
        let mut body = Vec::new();
        while !self.tok.is("}") {
            if self.tok.tok == Tok::Eof {
                return Err(self.error_here("expected `}`, found end of input"));
            }
            body.push(self.statement()?);
        }
        self.bump()?;
        Ok(body)
    }

    // ---- functions and patterns ----

    /// `function name?(params) { body }`, starting at `function`.
    fn function(&mut self) -> Result<Rc<FunctionDef>> {
        self.bump()?;
        let name = match self.tok.tok {
            Tok::Ident(_) => Some(self.expect_ident()?),
            _ => None,
        };
        self.expect("(")?;
        let (params, rest) = self.params()?;
        let body = FunctionBody::Block(self.block()?);
        Ok(Rc::new(FunctionDef {
            name,
            params,
            rest,
            body,
        }))
    }

    /// Parameter list after `(`, through the closing `)`.
    fn params(&mut self) -> Result<(Vec<PatternElem>, Option<Pattern>)> {
        let mut params = Vec::new();
        let mut rest = None;
        loop {
            if self.eat(")")? {
                break;
            }
            if self.eat("...")? {
                rest = Some(self.binding_pattern()?);
                self.eat(",")?;
                self.expect(")")?;
                break;
            }
            params.push(self.pattern_elem()?);
            if !self.eat(",")? {
                self.expect(")")?;
                break;
            }
        }
        Ok((params, rest))
    }

    fn pattern_elem(&mut self) -> Result<PatternElem> {
        let target = self.binding_pattern()?;
        let default = if self.eat("=")? {
            Some(self.assignment()?)
        } else {
            None
        };
        Ok(PatternElem { target, default })
    }

    fn binding_pattern(&mut self) -> Result<Pattern> {
        if self.eat("{")? {
            let mut props = Vec::new();
            let mut rest = None;
            loop {
                if self.eat("}")? {
                    break;
                }
                if self.eat("...")? {
                    rest = Some(self.expect_ident()?);
                    self.eat(",")?;
                    self.expect("}")?;
                    break;
                }
                let key = self.property_name()?;
                let target = if self.eat(":")? {
                    self.binding_pattern()?
                } else {
                    Pattern::Ident(key.clone())
                };
                let default = if self.eat("=")? {
                    Some(self.assignment()?)
                } else {
                    None
                };
                props.push((key, PatternElem { target, default }));
                if !self.eat(",")? {
                    self.expect("}")?;
                    break;
                }
            }
            return Ok(Pattern::Object { props, rest });
        }

        if self.eat("[")? {
            let mut items = Vec::new();
            let mut rest = None;
            loop {
                if self.eat("]")? {
                    break;
                }
                if self.eat(",")? {
                    items.push(None);
                    continue;
                }
                if self.eat("...")? {
                    rest = Some(Box::new(self.binding_pattern()?));
                    self.eat(",")?;
                    self.expect("]")?;
                    break;
                }
                items.push(Some(self.pattern_elem()?));
                if !self.eat(",")? {
                    self.expect("]")?;
                    break;
                }
            }
            return Ok(Pattern::Array { items, rest });
        }

        Ok(Pattern::Ident(self.expect_ident()?))
    }

    // ---- expressions ----

    fn expression(&mut self) -> Result<Expr> {
        let first = self.assignment()?;
        if !self.tok.is(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat(",")? {
            items.push(self.assignment()?);
        }
        Ok(Expr::Sequence(items))
    }

    fn assignment(&mut self) -> Result<Expr> {
        self.nested(Self::assignment_inner)
    }

    fn assignment_inner(&mut self) -> Result<Expr> {
        if let Some(arrow) = self.arrow()? {
            return Ok(arrow);
        }
        let target = self.conditional()?;
        let Some(op) = assign_op(&self.tok) else {
            return Ok(target);
        };
        if !is_assignable(&target) {
            return Err(self.error_here("invalid assignment target"));
        }
        self.bump()?;
        let value = self.assignment()?;
        Ok(Expr::Assign {
            op,
            target: Box::new(target),
            value: Box::new(value),
        })
    }

    /// Arrow function at the current position, if there is one.
    fn arrow(&mut self) -> Result<Option<Expr>> {
        let saved = self.save();
        if self.tok.is_word("async") {
            let next = self.peek()?;
            if !next.newline_before && (next.is("(") || matches!(next.tok, Tok::Ident(_))) {
                self.bump()?;
            }
        }

        let plain_ident =
            matches!(&self.tok.tok, Tok::Ident(name) if !RESERVED.contains(&name.as_str()));
        if plain_ident && self.peek()?.is("=>") {
            let target = Pattern::Ident(self.expect_ident()?);
            self.bump()?;
            let param = PatternElem {
                target,
                default: None,
            };
            return self.arrow_body(vec![param], None).map(Some);
        }
        if self.tok.is("(") {
            self.bump()?;
            if let Ok((params, rest)) = self.params()
                && self.tok.is("=>")
                && !self.tok.newline_before
            {
                self.bump()?;
                return self.arrow_body(params, rest).map(Some);
            }
        }

        self.restore(saved);
        Ok(None)
    }

    fn arrow_body(&mut self, params: Vec<PatternElem>, rest: Option<Pattern>) -> Result<Expr> {
        let body = if self.tok.is("{") {
            FunctionBody::Block(self.block()?)
        } else {
            FunctionBody::Expr(self.assignment()?)
        };
        Ok(Expr::Function(Rc::new(FunctionDef {
            name: None,
            params,
            rest,
            body,
        })))
    }

    fn conditional(&mut self) -> Result<Expr> {
        let test = self.binary(0)?;
        if !self.eat("?")? {
            return Ok(test);
        }
        let then = self.assignment()?;
        self.expect(":")?;
        let otherwise = self.assignment()?;
        Ok(Expr::Conditional(
            Box::new(test),
            Box::new(then),
            Box::new(otherwise),
        ))
    }

    fn binary(&mut self, min_prec: u8) -> Result<Expr> {
        let mut left = self.unary()?;
        while let Some((prec, op)) = binary_op(&self.tok) {
            if prec < min_prec {
                break;
            }
            self.bump()?;
            let right_assoc = matches!(op, BinOp::Arith(BinaryOp::Pow));
            let right = self.binary(if right_assoc { prec } else { prec + 1 })?;
            left = match op {
                BinOp::Arith(op) => Expr::Binary(op, Box::new(left), Box::new(right)),
                BinOp::Logic(op) => Expr::Logical(op, Box::new(left), Box::new(right)),
            };
        }
        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr> {
        self.nested(Self::unary_inner)
    }

    fn unary_inner(&mut self) -> Result<Expr> {
        let op = match &self.tok.tok {
            Tok::Punct("!") => Some(UnaryOp::Not),
            Tok::Punct("-") => Some(UnaryOp::Neg),
            Tok::Punct("+") => Some(UnaryOp::Plus),
            Tok::Ident(w) if w == "typeof" => Some(UnaryOp::TypeOf),
            Tok::Ident(w) if w == "void" => Some(UnaryOp::Void),
            _ => None,
        };
        if let Some(op) = op {
            self.bump()?;
            let operand = self.unary()?;
            return Ok(Expr::Unary(op, Box::new(operand)));
        }
        if self.tok.is("++") || self.tok.is("--") {
            let increment = self.tok.is("++");
            self.bump()?;
            let target = self.unary()?;
            if !is_assignable(&target) {
                return Err(self.error_here("invalid update target"));
            }
            return Ok(Expr::Update {
                increment,
                prefix: true,
                target: Box::new(target),
            });
        }
        if self.tok.is_word("await") {
            self.bump()?;
            return self.unary();
        }

        let expr = self.call_chain()?;
        if (self.tok.is("++") || self.tok.is("--")) && !self.tok.newline_before {
            if !is_assignable(&expr) {
                return Err(self.error_here("invalid update target"));
            }
            let increment = self.tok.is("++");
            self.bump()?;
            return Ok(Expr::Update {
                increment,
                prefix: false,
                target: Box::new(expr),
            });
        }
        Ok(expr)
    }

    fn call_chain(&mut self) -> Result<Expr> {
        let mut expr = if self.tok.is_word("new") {
            self.new_expr()?
        } else {
            self.primary()?
        };
        loop {
            if self.eat(".")? {
                let property = self.property_name()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                    optional: false,
                };
            } else if self.eat("?.")? {
                if self.eat("(")? {
                    let args = self.arguments()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        optional: true,
                    };
                } else if self.eat("[")? {
                    let index = self.expression()?;
                    self.expect("]")?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                        optional: true,
                    };
                } else {
                    let property = self.property_name()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                        optional: true,
                    };
                }
            } else if self.eat("[")? {
                let index = self.expression()?;
                self.expect("]")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                    optional: false,
                };
            } else if self.eat("(")? {
                let args = self.arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                    optional: false,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn new_expr(&mut self) -> Result<Expr> {
        self.bump()?;
        let mut callee = self.primary()?;
        while self.eat(".")? {
            let property = self.property_name()?;
            callee = Expr::Member {
                object: Box::new(callee),
                property,
                optional: false,
            };
        }
        let args = if self.eat("(")? {
            self.arguments()?
        } else {
            Vec::new()
        };
        Ok(Expr::New {
            callee: Box::new(callee),
            args,
        })
    }

    /// Call arguments after `(`, through the closing `)`.
    fn arguments(&mut self) -> Result<Vec<Arg>> {
        let mut args = Vec::new();
        loop {
            if self.eat(")")? {
                return Ok(args);
            }
            if self.eat("...")? {
                args.push(Arg::Spread(self.assignment()?));
            } else {
                args.push(Arg::Item(self.assignment()?));
            }
            if !self.eat(",")? {
                self.expect(")")?;
                return Ok(args);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr> {
        let token = self.tok.clone();
        match token.tok {
            Tok::Num(n) => {
                self.bump()?;
                Ok(Expr::Num(n))
            }
            Tok::Str(s) => {
                self.bump()?;
                Ok(Expr::Str(s))
            }
            Tok::Template(parts) => {
                self.bump()?;
                self.template(parts)
            }
            Tok::Punct("(") => {
                self.bump()?;
                let expr = self.expression()?;
                self.expect(")")?;
                Ok(expr)
            }
            Tok::Punct("[") => self.array_literal(),
            Tok::Punct("{") => self.object_literal(),
            Tok::Punct("<") => {
                let element = self.jsx_element()?;
                self.bump()?;
                Ok(Expr::Jsx(Box::new(element)))
            }
            Tok::Ident(word) => {
                let literal = match word.as_str() {
                    "true" => Some(Expr::Bool(true)),
                    "false" => Some(Expr::Bool(false)),
                    "null" => Some(Expr::Null),
                    "undefined" | "this" => Some(Expr::Undefined),
                    _ => None,
                };
                if let Some(literal) = literal {
                    self.bump()?;
                    return Ok(literal);
                }
                if word == "function" {
                    return Ok(Expr::Function(self.function()?));
                }
                if word == "async" && self.peek()?.is_word("function") {
                    self.bump()?;
                    return Ok(Expr::Function(self.function()?));
                }
                if word == "class" {
                    return Err(self.error_here("classes are not supported"));
                }
                if RESERVED.contains(&word.as_str()) {
                    return self.unexpected();
                }
                self.bump()?;
                Ok(Expr::Ident(word))
            }
            _ => self.unexpected(),
        }
    }

    fn template(&mut self, parts: Vec<TemplatePart>) -> Result<Expr> {
        let mut pieces = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                TemplatePart::Text(text) => pieces.push(TemplatePiece::Text(text)),
                TemplatePart::Expr {
                    source,
                    line,
                    column,
                } => {
                    let mut sub = Parser::new(Lexer::with_origin(&source, line, column))?;
                    sub.depth = self.depth;
                    let expr = sub.expression()?;
                    if sub.tok.tok != Tok::Eof {
                        return sub.unexpected();
                    }
                    pieces.push(TemplatePiece::Expr(expr));
                }
            }
        }
        Ok(Expr::Template(pieces))
    }

    fn array_literal(&mut self) -> Result<Expr> {
        self.bump()?;
        let mut items = Vec::new();
        loop {
            if self.eat("]")? {
                break;
            }
            if self.eat(",")? {
                items.push(ArrayItem::Hole);
                continue;
            }
            if self.eat("...")? {
                items.push(ArrayItem::Spread(self.assignment()?));
            } else {
                items.push(ArrayItem::Item(self.assignment()?));
            }
            if !self.eat(",")? {
                self.expect("]")?;
                break;
            }
        }
        Ok(Expr::Array(items))
    }

    fn object_literal(&mut self) -> Result<Expr> {
        self.bump()?;
        let mut props = Vec::new();
        loop {
            if self.eat("}")? {
                break;
            }
            if self.eat("...")? {
                props.push(PropDef::Spread(self.assignment()?));
            } else {
                let shorthand = match &self.tok.tok {
                    Tok::Ident(w) => Some(w.clone()),
                    _ => None,
                };
                let key = if self.eat("[")? {
                    let key = self.assignment()?;
                    self.expect("]")?;
                    PropKey::Computed(key)
                } else {
                    PropKey::Static(self.property_name()?)
                };

                let value = if self.eat(":")? {
                    self.assignment()?
                } else if self.eat("(")? {
                    let (params, rest) = self.params()?;
                    let body = FunctionBody::Block(self.block()?);
                    let name = match &key {
                        PropKey::Static(name) => Some(name.clone()),
                        PropKey::Computed(_) => None,
                    };
                    Expr::Function(Rc::new(FunctionDef {
                        name,
                        params,
                        rest,
                        body,
                    }))
                } else if let Some(name) = shorthand
                    && !RESERVED.contains(&name.as_str())
                {
                    Expr::Ident(name)
                } else {
                    return self.unexpected();
                };
                props.push(PropDef::KeyValue(key, value));
            }
            if !self.eat(",")? {
                self.expect("}")?;
                break;
            }
        }
        Ok(Expr::Object(props))
    }

    // ---- JSX ----

    /// Parses an element starting at `<`.
    ///
    /// Returns with the element's final `>` as the current token and the
    /// lexer positioned right after it, so the caller picks the next mode.
    fn jsx_element(&mut self) -> Result<JsxElement> {
        self.bump_tag()?;
        self.jsx_after_open()
    }

    fn jsx_after_open(&mut self) -> Result<JsxElement> {
        if self.tok.is(">") {
            let children = self.jsx_children(None)?;
            return Ok(JsxElement {
                name: None,
                attrs: Vec::new(),
                children,
            });
        }

        let name = self.jsx_name()?;
        let mut attrs = Vec::new();
        loop {
            if self.tok.is("/") {
                self.bump_tag()?;
                self.expect_current(">")?;
                return Ok(JsxElement {
                    name: Some(name),
                    attrs,
                    children: Vec::new(),
                });
            }
            if self.tok.is(">") {
                break;
            }
            if self.tok.is("{") {
                self.bump()?;
                self.expect("...")?;
                let value = self.assignment()?;
                self.expect_current("}")?;
                self.bump_tag()?;
                attrs.push(JsxAttr::Spread(value));
                continue;
            }

            let attr = match &self.tok.tok {
                Tok::Ident(w) => w.clone(),
                Tok::Eof => {
                    return Err(self.error_here(format!("unterminated JSX tag <{name}>")));
                }
                _ => return self.unexpected(),
            };
            self.bump_tag()?;
            let value = if self.tok.is("=") {
                self.bump_tag()?;
                match self.tok.tok.clone() {
                    Tok::Str(s) => {
                        self.bump_tag()?;
                        Expr::Str(s)
                    }
                    Tok::Punct("{") => {
                        self.bump()?;
                        let value = self.assignment()?;
                        self.expect_current("}")?;
                        self.bump_tag()?;
                        value
                    }
                    Tok::Punct("<") => {
                        let element = self.jsx_element()?;
                        self.bump_tag()?;
                        Expr::Jsx(Box::new(element))
                    }
                    _ => return self.unexpected(),
                }
            } else {
                Expr::Bool(true)
            };
            attrs.push(JsxAttr::Named(attr, value));
        }

        let children = self.jsx_children(Some(&name))?;
        Ok(JsxElement {
            name: Some(name),
            attrs,
            children,
        })
    }

    fn jsx_name(&mut self) -> Result<String> {
        let Tok::Ident(first) = &self.tok.tok else {
            return Err(self.error_here(format!(
                "expected a tag name, found {}",
                self.tok.describe()
            )));
        };
        let mut name = first.clone();
        self.bump_tag()?;
        while self.tok.is(".") {
            self.bump_tag()?;
            let Tok::Ident(part) = &self.tok.tok else {
                return self.unexpected();
            };
            name.push('.');
            name.push_str(part);
            self.bump_tag()?;
        }
        Ok(name)
    }

    /// Children after an opening tag's `>`, through the matching close tag.
    fn jsx_children(&mut self, name: Option<&str>) -> Result<Vec<JsxChild>> {
        let display = name.unwrap_or("");
        let mut children = Vec::new();
        loop {
            let Some(raw) = self.lexer.jsx_text() else {
                return Err(self.error_here(format!("unterminated JSX element <{display}>")));
            };
            if let Some(text) = normalize_jsx_text(&raw) {
                children.push(JsxChild::Text(text));
            }

            self.bump_tag()?;
            if self.tok.is("{") {
                self.bump()?;
                // `{/* comment */}`
                if self.tok.is("}") {
                    continue;
                }
                let expr = if self.eat("...")? {
                    self.assignment()?
                } else {
                    self.expression()?
                };
                self.expect_current("}")?;
                children.push(JsxChild::Expr(expr));
                continue;
            }

            self.bump_tag()?;
            if self.tok.is("/") {
                self.bump_tag()?;
                let closing = if self.tok.is(">") {
                    None
                } else {
                    Some(self.jsx_name()?)
                };
                if closing.as_deref() != name {
                    return Err(self.error_here(format!(
                        "expected closing tag </{display}>, found </{}>",
                        closing.as_deref().unwrap_or("")
                    )));
                }
                self.expect_current(">")?;
                return Ok(children);
            }
            let child = self.nested(Self::jsx_after_open)?;
            children.push(JsxChild::Expr(Expr::Jsx(Box::new(child))));
        }
    }
}

/// Applies JSX whitespace rules: lines are trimmed where they meet a line
/// break and blank lines vanish. Entities are decoded.
fn normalize_jsx_text(raw: &str) -> Option<String> {
    let lines: Vec<&str> = raw.split('\n').collect();
    let last = lines.len() - 1;
    let mut parts = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let mut line = *line;
        if i > 0 {
            line = line.trim_start();
        }
        if i < last {
            line = line.trim_end();
        }
        if !line.is_empty() {
            parts.push(line);
        }
    }
    if parts.is_empty() {
        return None;
    }
    Some(decode_entities(&parts.join(" ")))
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let decoded = tail.find(';').filter(|end| *end <= 10).and_then(|end| {
            let entity = &tail[1..end];
            let ch = match entity {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some(' '),
                "middot" => Some('·'),
                "bull" => Some('•'),
                "hellip" => Some('…'),
                "mdash" => Some('—'),
                "ndash" => Some('–'),
                "times" => Some('×'),
                "copy" => Some('©'),
                "deg" => Some('°'),
                "rarr" => Some('→'),
                "larr" => Some('←'),
                _ => entity
                    .strip_prefix("#x")
                    .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                    .or_else(|| entity.strip_prefix('#').and_then(|n| n.parse().ok()))
                    .and_then(char::from_u32),
            };
            ch.map(|c| (c, end))
        });
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
