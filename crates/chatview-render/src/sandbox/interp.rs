//! Tree-walking evaluator.
//!
//! Runs a parsed component with only what `stdlib::install_globals` puts in
//! scope, under a step budget and a call-depth limit. The result is resolved
//! into plain `Node`s before the evaluator is dropped, so nothing that refers
//! to evaluator state leaves this module.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use super::ast::{
    Arg, ArrayItem, AssignOp, BinaryOp, DeclKind, Expr, FunctionBody, FunctionDef, JsxAttr,
    JsxChild, JsxElement, LogicalOp, Pattern, PatternElem, Program, PropDef, PropKey, Stmt,
    TemplatePiece, UnaryOp,
};
use super::error::ExecutionError;
use super::value::{
    Closure, Element, ElementKind, Host, MAX_STRING_LEN, Object, Value, format_number,
    loose_equals, strict_equals,
};
use super::{ComponentOutput, charts, stdlib};
use crate::chart::ChartSpec;
use crate::component::Node;

type Result<T> = std::result::Result<T, ExecutionError>;

/// Rounds of queued effects run after the first render.
const EFFECT_ROUNDS: usize = 10;

/// Deepest element/array nesting accepted in rendered output.
const MAX_OUTPUT_DEPTH: usize = 256;

/// Largest array generated code may build.
pub(super) const MAX_ARRAY_LEN: usize = 1_000_000;

const IGNORED_PROPS: &[&str] = &["style", "className", "class", "key", "ref", "children"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Statements and expressions evaluated before giving up.
    pub max_steps: u64,
    /// Nested function calls before giving up.
    pub max_depth: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_steps: 100_000,
            max_depth: 64,
        }
    }
}

/// A lexical scope chain.
#[derive(Clone)]
pub struct Env(Rc<RefCell<Scope>>);

struct Scope {
    vars: HashMap<String, Binding>,
    parent: Option<Env>,
}

struct Binding {
    value: Value,
    mutable: bool,
}

impl Env {
    fn new(parent: Option<Env>) -> Self {
        Env(Rc::new(RefCell::new(Scope {
            vars: HashMap::new(),
            parent,
        })))
    }

    pub fn declare(&self, name: impl Into<String>, value: Value, mutable: bool) {
        self.0
            .borrow_mut()
            .vars
            .insert(name.into(), Binding { value, mutable });
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut scope = self.clone();
        loop {
            let parent = {
                let inner = scope.0.borrow();
                if let Some(binding) = inner.vars.get(name) {
                    return Some(binding.value.clone());
                }
                inner.parent.clone()?
            };
            scope = parent;
        }
    }

    fn assign(&self, name: &str, value: Value) -> Result<()> {
        let mut scope = self.clone();
        loop {
            let parent = {
                let mut inner = scope.0.borrow_mut();
                if let Some(binding) = inner.vars.get_mut(name) {
                    if !binding.mutable {
                        return Err(ExecutionError::new("Assignment to constant variable."));
                    }
                    binding.value = value;
                    return Ok(());
                }
                inner.parent.clone()
            };
            match parent {
                Some(parent) => scope = parent,
                None => return Err(not_defined(name)),
            }
        }
    }
}

enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

pub struct Interpreter {
    limits: Limits,
    steps: u64,
    depth: usize,
    globals: Env,
    /// Every scope created, so `Drop` can break closure/scope cycles.
    scopes: Vec<Weak<RefCell<Scope>>>,
    default_export: Option<Value>,
    charts: Vec<ChartSpec>,
    effects: Vec<Value>,
    rng: u64,
}

impl Drop for Interpreter {
    fn drop(&mut self) {
        self.effects.clear();
        self.default_export = None;
        for scope in self.scopes.drain(..) {
            if let Some(scope) = scope.upgrade() {
                let vars = std::mem::take(&mut scope.borrow_mut().vars);
                drop(vars);
            }
        }
    }
}

/// Evaluates `program` and renders its entry point.
///
/// # Errors
/// Runtime errors, exhausted budgets and output that cannot be rendered.
pub fn run_program(program: &Program, limits: Limits) -> Result<ComponentOutput> {
    Interpreter::new(limits).run(program)
}

impl Interpreter {
    pub fn new(limits: Limits) -> Self {
        let globals = Env::new(None);
        stdlib::install_globals(&globals);
        Self {
            limits,
            steps: 0,
            depth: 0,
            scopes: vec![Rc::downgrade(&globals.0)],
            globals,
            default_export: None,
            charts: Vec::new(),
            effects: Vec::new(),
            rng: 0x9E37_79B9_7F4A_7C15,
        }
    }

    fn run(&mut self, program: &Program) -> Result<ComponentOutput> {
        let globals = self.globals.clone();
        let module = self.scope(&globals);
        self.hoist(&program.body, &module);

        let mut last_value = Value::Undefined;
        for stmt in &program.body {
            if let Stmt::Expr(expr) = stmt {
                last_value = self.eval(expr, &module)?;
            } else {
                self.exec(stmt, &module)?;
            }
        }

        let entry = match self.default_export.take() {
            Some(value) => value,
            None => match entry_name(&program.body) {
                Some(name) => module.lookup(&name).unwrap_or(Value::Undefined),
                None => last_value,
            },
        };
        let result = if entry.is_callable() {
            self.call(&entry, vec![Value::object(Object::default())])?
        } else {
            entry
        };
        // Code that only draws through `new Chart(..)` renders nothing itself.
        let draws_only =
            result.is_nullish() || matches!(result, Value::Host(Host::ChartInstance(_)));
        if !draws_only && !renderable(&result) {
            return Err(no_output());
        }

        let mut nodes = Vec::new();
        self.resolve(&result, &mut nodes, 0)?;
        self.run_effects()?;
        if draws_only && self.charts.is_empty() {
            return Err(no_output());
        }
        tracing::trace!(
            steps = self.steps,
            charts = self.charts.len(),
            "component evaluated"
        );
        Ok(ComponentOutput {
            nodes,
            charts: std::mem::take(&mut self.charts),
        })
    }

    // ---- bookkeeping ----

    fn scope(&mut self, parent: &Env) -> Env {
        let env = Env::new(Some(parent.clone()));
        if self.scopes.len() % 4096 == 4095 {
            self.scopes.retain(|scope| scope.strong_count() > 0);
        }
        self.scopes.push(Rc::downgrade(&env.0));
        env
    }

    fn tick(&mut self) -> Result<()> {
        self.steps += 1;
        if self.steps > self.limits.max_steps {
            return Err(ExecutionError::new(format!(
                "step budget of {} exhausted",
                self.limits.max_steps
            )));
        }
        Ok(())
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        self.depth += 1;
        let result = if self.depth > self.limits.max_depth {
            Err(ExecutionError::new(format!(
                "maximum call depth of {} exceeded",
                self.limits.max_depth
            )))
        } else {
            f(self)
        };
        self.depth -= 1;
        result
    }

    pub(super) fn push_chart(&mut self, spec: ChartSpec) -> usize {
        self.charts.push(spec);
        self.charts.len() - 1
    }

    pub(super) fn queue_effect(&mut self, effect: Value) {
        self.effects.push(effect);
    }

    /// Deterministic `Math.random`; the sandbox has no entropy source.
    pub(super) fn next_random(&mut self) -> f64 {
        let mut x = self.rng;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.rng = x;
        (x.wrapping_mul(0x2545_F491_4F6C_DD1D) >> 11) as f64 / (1_u64 << 53) as f64
    }

    // ---- statements ----

    fn hoist(&mut self, body: &[Stmt], env: &Env) {
        for stmt in body {
            let def = match stmt {
                Stmt::Function(def) | Stmt::ExportDefault(Expr::Function(def)) => def,
                _ => continue,
            };
            if let Some(name) = &def.name {
                env.declare(name.clone(), closure(def, env), true);
            }
        }
    }

    fn exec_block(&mut self, body: &[Stmt], env: &Env) -> Result<Flow> {
        self.hoist(body, env);
        for stmt in body {
            let flow = self.exec(stmt, env)?;
            if !matches!(flow, Flow::Normal) {
                return Ok(flow);
            }
        }
        Ok(Flow::Normal)
    }

    fn exec(&mut self, stmt: &Stmt, env: &Env) -> Result<Flow> {
        self.tick()?;
        match stmt {
            Stmt::Expr(expr) => {
                self.eval(expr, env)?;
            }
            Stmt::Decl { kind, decls } => {
                for (pattern, init) in decls {
                    let value = match init {
                        Some(init) => self.eval(init, env)?,
                        None => Value::Undefined,
                    };
                    self.bind(pattern, value, env, *kind != DeclKind::Const)?;
                }
            }
            Stmt::Function(_) | Stmt::Empty => {}
            Stmt::Return(value) => {
                let value = match value {
                    Some(value) => self.eval(value, env)?,
                    None => Value::Undefined,
                };
                return Ok(Flow::Return(value));
            }
            Stmt::If {
                test,
                then,
                otherwise,
            } => {
                if self.eval(test, env)?.truthy() {
                    return self.exec(then, env);
                }
                if let Some(otherwise) = otherwise {
                    return self.exec(otherwise, env);
                }
            }
            Stmt::Block(body) => {
                let scope = self.scope(env);
                return self.exec_block(body, &scope);
            }
            Stmt::For {
                init,
                test,
                update,
                body,
            } => {
                let scope = self.scope(env);
                if let Some(init) = init {
                    self.exec(init, &scope)?;
                }
                loop {
                    if let Some(test) = test
                        && !self.eval(test, &scope)?.truthy()
                    {
                        break;
                    }
                    match self.exec(body, &scope)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    if let Some(update) = update {
                        self.eval(update, &scope)?;
                    }
                }
            }
            Stmt::ForEach {
                kind,
                pattern,
                iterable,
                keys,
                body,
            } => {
                let iterable = self.eval(iterable, env)?;
                let items = if *keys {
                    key_list(&iterable)
                } else {
                    iterate(&iterable)?
                };
                for item in items {
                    let scope = self.scope(env);
                    self.bind(pattern, item, &scope, *kind != DeclKind::Const)?;
                    match self.exec(body, &scope)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
            }
            Stmt::While { test, body } => {
                while self.eval(test, env)?.truthy() {
                    match self.exec(body, env)? {
                        Flow::Break => break,
                        Flow::Return(value) => return Ok(Flow::Return(value)),
                        Flow::Normal | Flow::Continue => {}
                    }
                }
            }
            Stmt::Break => return Ok(Flow::Break),
            Stmt::Continue => return Ok(Flow::Continue),
            Stmt::Throw(value) => {
                let value = self.eval(value, env)?;
                return Err(thrown(&value));
            }
            Stmt::ExportDefault(expr) => {
                let value = self.eval(expr, env)?;
                self.default_export = Some(value);
            }
        }
        Ok(Flow::Normal)
    }

    // ---- bindings ----

    fn bind(&mut self, pattern: &Pattern, value: Value, env: &Env, mutable: bool) -> Result<()> {
        match pattern {
            Pattern::Ident(name) => {
                env.declare(name.clone(), value, mutable);
            }
            Pattern::Object { props, rest } => {
                if value.is_nullish() {
                    return Err(ExecutionError::new(format!(
                        "Cannot destructure '{0}' as it is {0}.",
                        value.to_display()
                    )));
                }
                for (key, elem) in props {
                    let item = self.get(&value, key)?;
                    self.bind_elem(elem, item, env, mutable)?;
                }
                if let Some(rest) = rest {
                    let mut remaining = Object::default();
                    if let Value::Object(obj) = &value {
                        for (key, item) in obj.borrow().iter() {
                            if !props.iter().any(|(taken, _)| taken == key) {
                                remaining.set(key.clone(), item.clone());
                            }
                        }
                    }
                    env.declare(rest.clone(), Value::object(remaining), mutable);
                }
            }
            Pattern::Array { items, rest } => {
                let values = iterate(&value)?;
                for (i, item) in items.iter().enumerate() {
                    if let Some(elem) = item {
                        let value = values.get(i).cloned().unwrap_or(Value::Undefined);
                        self.bind_elem(elem, value, env, mutable)?;
                    }
                }
                if let Some(rest) = rest {
                    let tail = values.get(items.len()..).map(<[Value]>::to_vec);
                    self.bind(rest, Value::array(tail.unwrap_or_default()), env, mutable)?;
                }
            }
        }
        Ok(())
    }

    fn bind_elem(
        &mut self,
        elem: &PatternElem,
        value: Value,
        env: &Env,
        mutable: bool,
    ) -> Result<()> {
        let value = match (&elem.default, value) {
            (Some(default), Value::Undefined) => self.eval(default, env)?,
            (_, value) => value,
        };
        self.bind(&elem.target, value, env, mutable)
    }

    fn assign(&mut self, target: &Expr, value: Value, env: &Env) -> Result<()> {
        match target {
            Expr::Ident(name) => env.assign(name, value),
            Expr::Member {
                object, property, ..
            } => {
                let object = self.eval(object, env)?;
                set_property(&object, property, value)
            }
            Expr::Index { object, index, .. } => {
                let object = self.eval(object, env)?;
                let key = self.eval(index, env)?.to_property_key();
                set_property(&object, &key, value)
            }
            _ => Err(ExecutionError::new("Invalid assignment target")),
        }
    }

    // ---- expressions ----

    fn eval(&mut self, expr: &Expr, env: &Env) -> Result<Value> {
        self.tick()?;
        match expr {
            Expr::Num(n) => Ok(Value::Num(*n)),
            Expr::Str(s) => Ok(Value::str(s)),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Undefined => Ok(Value::Undefined),
            Expr::Template(pieces) => {
                let mut out = String::new();
                for piece in pieces {
                    match piece {
                        TemplatePiece::Text(text) => out.push_str(text),
                        TemplatePiece::Expr(expr) => {
                            out.push_str(&self.eval(expr, env)?.to_display());
                        }
                    }
                    check_string_len(out.len())?;
                }
                Ok(Value::str(out))
            }
            Expr::Ident(name) => env.lookup(name).ok_or_else(|| not_defined(name)),
            Expr::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        ArrayItem::Item(expr) => out.push(self.eval(expr, env)?),
                        ArrayItem::Spread(expr) => out.extend(iterate(&self.eval(expr, env)?)?),
                        ArrayItem::Hole => out.push(Value::Undefined),
                    }
                    check_array_len(out.len())?;
                }
                Ok(Value::array(out))
            }
            Expr::Object(props) => {
                let mut object = Object::default();
                for prop in props {
                    match prop {
                        PropDef::KeyValue(key, value) => {
                            let key = match key {
                                PropKey::Static(key) => key.clone(),
                                PropKey::Computed(expr) => self.eval(expr, env)?.to_property_key(),
                            };
                            object.set(key, self.eval(value, env)?);
                        }
                        PropDef::Spread(expr) => spread_into(&mut object, &self.eval(expr, env)?),
                    }
                }
                Ok(Value::object(object))
            }
            Expr::Function(def) => Ok(closure(def, env)),
            Expr::Unary(UnaryOp::TypeOf, operand)
                if matches!(operand.as_ref(), Expr::Ident(name) if env.lookup(name).is_none()) =>
            {
                Ok(Value::str("undefined"))
            }
            Expr::Unary(op, operand) => {
                let value = self.eval(operand, env)?;
                Ok(match op {
                    UnaryOp::Not => Value::Bool(!value.truthy()),
                    UnaryOp::Neg => Value::Num(-value.to_number()),
                    UnaryOp::Plus => Value::Num(value.to_number()),
                    UnaryOp::TypeOf => Value::str(value.type_of()),
                    UnaryOp::Void => Value::Undefined,
                })
            }
            Expr::Update {
                increment,
                prefix,
                target,
            } => {
                let old = self.eval(target, env)?.to_number();
                let new = if *increment { old + 1.0 } else { old - 1.0 };
                self.assign(target, Value::Num(new), env)?;
                Ok(Value::Num(if *prefix { new } else { old }))
            }
            Expr::Binary(op, left, right) => {
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                binary(*op, &left, &right)
            }
            Expr::Logical(op, left, right) => {
                let left = self.eval(left, env)?;
                if short_circuits(*op, &left) {
                    Ok(left)
                } else {
                    self.eval(right, env)
                }
            }
            Expr::Conditional(test, then, otherwise) => {
                if self.eval(test, env)?.truthy() {
                    self.eval(then, env)
                } else {
                    self.eval(otherwise, env)
                }
            }
            Expr::Assign { op, target, value } => {
                let value = match op {
                    AssignOp::Assign => self.eval(value, env)?,
                    AssignOp::Arith(op) => {
                        let current = self.eval(target, env)?;
                        let rhs = self.eval(value, env)?;
                        binary(*op, &current, &rhs)?
                    }
                    AssignOp::Logical(op) => {
                        let current = self.eval(target, env)?;
                        if short_circuits(*op, &current) {
                            return Ok(current);
                        }
                        self.eval(value, env)?
                    }
                };
                self.assign(target, value.clone(), env)?;
                Ok(value)
            }
            Expr::Member { .. } | Expr::Index { .. } | Expr::Call { .. } => {
                Ok(self.chain(expr, env)?.unwrap_or(Value::Undefined))
            }
            Expr::New { callee, args } => {
                let ctor = self.eval(callee, env)?;
                let args = self.eval_args(args, env)?;
                self.construct(&ctor, args, callee)
            }
            Expr::Sequence(exprs) => {
                let mut last = Value::Undefined;
                for expr in exprs {
                    last = self.eval(expr, env)?;
                }
                Ok(last)
            }
            Expr::Jsx(element) => self.eval_jsx(element, env),
        }
    }

    /// Member, index and call chains. `None` means an optional link
    /// short-circuited the rest of the chain.
    fn chain(&mut self, expr: &Expr, env: &Env) -> Result<Option<Value>> {
        match expr {
            Expr::Member {
                object,
                property,
                optional,
            } => {
                self.tick()?;
                let Some(object) = self.chain(object, env)? else {
                    return Ok(None);
                };
                if *optional && object.is_nullish() {
                    return Ok(None);
                }
                self.get(&object, property).map(Some)
            }
            Expr::Index {
                object,
                index,
                optional,
            } => {
                self.tick()?;
                let Some(object) = self.chain(object, env)? else {
                    return Ok(None);
                };
                if *optional && object.is_nullish() {
                    return Ok(None);
                }
                let key = self.eval(index, env)?.to_property_key();
                self.get(&object, &key).map(Some)
            }
            Expr::Call {
                callee,
                args,
                optional,
            } => {
                self.tick()?;
                let Some(function) = self.chain(callee, env)? else {
                    return Ok(None);
                };
                if *optional && function.is_nullish() {
                    return Ok(None);
                }
                if !function.is_callable() {
                    return Err(ExecutionError::new(format!(
                        "{} is not a function",
                        describe(callee)
                    )));
                }
                let args = self.eval_args(args, env)?;
                self.call(&function, args).map(Some)
            }
            other => self.eval(other, env).map(Some),
        }
    }

    fn eval_args(&mut self, args: &[Arg], env: &Env) -> Result<Vec<Value>> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            match arg {
                Arg::Item(expr) => out.push(self.eval(expr, env)?),
                Arg::Spread(expr) => out.extend(iterate(&self.eval(expr, env)?)?),
            }
            check_array_len(out.len())?;
        }
        Ok(out)
    }

    pub(super) fn get(&mut self, object: &Value, key: &str) -> Result<Value> {
        if object.is_nullish() {
            return Err(ExecutionError::new(format!(
                "Cannot read properties of {} (reading '{key}')",
                object.to_display()
            )));
        }
        Ok(stdlib::property(object, key))
    }

    pub(super) fn call(&mut self, function: &Value, args: Vec<Value>) -> Result<Value> {
        match function {
            Value::Function(closure) => {
                let closure = Rc::clone(closure);
                self.nested(|this| this.invoke(&closure, args))
            }
            Value::Builtin(builtin) => {
                let builtin = Rc::clone(builtin);
                stdlib::call_builtin(self, &builtin, args)
            }
            Value::Host(Host::Namespace(ns)) => stdlib::call_namespace(self, ns, args),
            other => Err(ExecutionError::new(format!(
                "{} is not a function",
                other.type_of()
            ))),
        }
    }

    fn invoke(&mut self, closure: &Closure, args: Vec<Value>) -> Result<Value> {
        let scope = self.scope(&closure.env);
        let def = &closure.def;
        let mut args = args.into_iter();
        for param in &def.params {
            let value = args.next().unwrap_or(Value::Undefined);
            self.bind_elem(param, value, &scope, true)?;
        }
        if let Some(rest) = &def.rest {
            self.bind(rest, Value::array(args.collect()), &scope, true)?;
        }
        match &def.body {
            FunctionBody::Expr(expr) => self.eval(expr, &scope),
            FunctionBody::Block(body) => match self.exec_block(body, &scope)? {
                Flow::Return(value) => Ok(value),
                _ => Ok(Value::Undefined),
            },
        }
    }

    fn construct(&mut self, ctor: &Value, args: Vec<Value>, callee: &Expr) -> Result<Value> {
        match ctor {
            Value::Host(Host::ChartCtor) => {
                let mut args = args.into_iter();
                if !matches!(args.next(), Some(Value::Host(Host::Canvas))) {
                    return Err(ExecutionError::new(
                        "Chart expects the canvas as its first argument",
                    ));
                }
                let config = args.next().unwrap_or(Value::Undefined);
                let index = self.push_chart(charts::from_config(&config));
                Ok(Value::Host(Host::ChartInstance(index)))
            }
            Value::Host(Host::Namespace(ns)) if ctor.is_callable() => {
                stdlib::call_namespace(self, ns, args)
            }
            _ => Err(ExecutionError::new(format!(
                "{} is not a constructor",
                describe(callee)
            ))),
        }
    }

    // ---- JSX ----

    fn eval_jsx(&mut self, element: &JsxElement, env: &Env) -> Result<Value> {
        let kind = match &element.name {
            None => ElementKind::Fragment,
            Some(name) => element_kind(name, env),
        };
        let mut props = Object::default();
        for attr in &element.attrs {
            match attr {
                JsxAttr::Named(name, value) => props.set(name.clone(), self.eval(value, env)?),
                JsxAttr::Spread(expr) => spread_into(&mut props, &self.eval(expr, env)?),
            }
        }
        let mut children = Vec::with_capacity(element.children.len());
        for child in &element.children {
            children.push(match child {
                JsxChild::Text(text) => Value::str(text),
                JsxChild::Expr(expr) => self.eval(expr, env)?,
            });
        }
        Ok(Value::Element(Rc::new(Element {
            kind,
            props,
            children,
        })))
    }

    fn resolve(&mut self, value: &Value, out: &mut Vec<Node>, level: usize) -> Result<()> {
        self.tick()?;
        if level > MAX_OUTPUT_DEPTH {
            return Err(ExecutionError::new("rendered output is nested too deeply"));
        }
        match value {
            Value::Undefined
            | Value::Null
            | Value::Bool(_)
            | Value::Function(_)
            | Value::Builtin(_)
            | Value::Host(_) => {}
            Value::Num(n) => out.push(Node::Text(format_number(*n))),
            Value::Str(s) => out.push(Node::Text(s.to_string())),
            Value::Array(items) => {
                let items = items.borrow().clone();
                for item in &items {
                    self.resolve(item, out, level + 1)?;
                }
            }
            Value::Object(object) => {
                let keys: Vec<String> = object.borrow().keys().cloned().collect();
                return Err(ExecutionError::new(format!(
                    "Objects are not valid as a React child (found: object with keys {{{}}})",
                    keys.join(", ")
                )));
            }
            Value::Element(element) => self.resolve_element(element, out, level)?,
        }
        Ok(())
    }

    fn resolve_children(
        &mut self,
        element: &Element,
        out: &mut Vec<Node>,
        level: usize,
    ) -> Result<()> {
        for child in &element.children {
            self.resolve(child, out, level + 1)?;
        }
        if element.children.is_empty()
            && let Some(children) = element.props.get("children")
        {
            self.resolve(children, out, level + 1)?;
        }
        Ok(())
    }

    fn resolve_element(
        &mut self,
        element: &Element,
        out: &mut Vec<Node>,
        level: usize,
    ) -> Result<()> {
        match &element.kind {
            ElementKind::Intrinsic(tag) if tag == "canvas" => {
                self.attach_canvas(element.props.get("ref"))?;
                out.push(Node::Canvas);
            }
            ElementKind::Intrinsic(tag) => {
                let mut children = Vec::new();
                self.resolve_children(element, &mut children, level)?;
                out.push(Node::Element {
                    tag: tag.clone(),
                    attrs: display_attrs(&element.props),
                    children,
                });
            }
            ElementKind::Component(component) => {
                let props = Value::object(stdlib::props_with_children(element));
                self.nested(|this| {
                    let rendered = match component {
                        Value::Function(closure) => this.invoke(closure, vec![props])?,
                        other => this.call(other, vec![props])?,
                    };
                    this.resolve(&rendered, out, level + 1)
                })?;
            }
            ElementKind::Unresolved(name) => return Err(not_defined(name)),
            ElementKind::Invalid(name) => {
                return Err(ExecutionError::new(format!(
                    "Element type is invalid: <{name}> is not a component"
                )));
            }
            ElementKind::Fragment | ElementKind::Passthrough => {
                self.resolve_children(element, out, level)?;
            }
            ElementKind::Chart(kind) => {
                let spec = charts::from_element(*kind, &element.props, &element.children);
                let index = self.push_chart(spec);
                out.push(Node::Chart(index));
            }
            ElementKind::ChartPart(_) => {}
        }
        Ok(())
    }

    /// `<canvas ref={..}>` hands the drawing surface to the ref.
    fn attach_canvas(&mut self, target: Option<&Value>) -> Result<()> {
        match target {
            Some(Value::Object(object)) => {
                object
                    .borrow_mut()
                    .set("current", Value::Host(Host::Canvas));
            }
            Some(callback) if callback.is_callable() => {
                self.call(callback, vec![Value::Host(Host::Canvas)])?;
            }
            _ => {}
        }
        Ok(())
    }

    fn run_effects(&mut self) -> Result<()> {
        for _ in 0..EFFECT_ROUNDS {
            let effects = std::mem::take(&mut self.effects);
            if effects.is_empty() {
                break;
            }
            for effect in effects {
                if effect.is_callable() {
                    self.call(&effect, Vec::new())?;
                }
            }
        }
        Ok(())
    }
}

fn closure(def: &Rc<FunctionDef>, env: &Env) -> Value {
    Value::Function(Rc::new(Closure {
        def: Rc::clone(def),
        env: env.clone(),
    }))
}

fn not_defined(name: &str) -> ExecutionError {
    ExecutionError::new(format!("{name} is not defined"))
}

fn no_output() -> ExecutionError {
    ExecutionError::new("component produced no renderable output")
}

fn thrown(value: &Value) -> ExecutionError {
    let text = match value {
        Value::Object(object) => {
            let object = object.borrow();
            match object.get("message") {
                Some(message) => {
                    let name = object
                        .get("name")
                        .map_or_else(|| "Error".to_string(), Value::to_display);
                    format!("{name}: {}", message.to_display())
                }
                None => value.to_display(),
            }
        }
        other => other.to_display(),
    };
    ExecutionError::new(format!("Uncaught {text}"))
}

/// Best-effort source text for a callee in error messages.
fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Member {
            object, property, ..
        } => format!("{}.{property}", describe(object)),
        Expr::Index { object, .. } => format!("{}[...]", describe(object)),
        Expr::Call { callee, .. } => format!("{}(...)", describe(callee)),
        _ => "expression".to_string(),
    }
}

fn is_capitalized(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

/// Last capitalized top-level function, declared or bound to a const.
fn entry_name(body: &[Stmt]) -> Option<String> {
    let mut found = None;
    for stmt in body {
        match stmt {
            Stmt::Function(def) => {
                if let Some(name) = def.name.as_deref().filter(|n| is_capitalized(n)) {
                    found = Some(name.to_string());
                }
            }
            Stmt::Decl { decls, .. } => {
                for (pattern, init) in decls {
                    if let (Pattern::Ident(name), Some(Expr::Function(_))) = (pattern, init)
                        && is_capitalized(name)
                    {
                        found = Some(name.clone());
                    }
                }
            }
            _ => {}
        }
    }
    found
}

fn renderable(value: &Value) -> bool {
    match value {
        Value::Element(_) | Value::Str(_) => true,
        Value::Array(items) => {
            let items = items.borrow();
            let allowed = |v: &Value| {
                v.is_nullish() || matches!(v, Value::Bool(_) | Value::Num(_)) || renderable(v)
            };
            items.iter().all(allowed)
                && items
                    .iter()
                    .any(|v| !v.is_nullish() && !matches!(v, Value::Bool(_)))
        }
        _ => false,
    }
}

fn element_kind(name: &str, env: &Env) -> ElementKind {
    if !name.contains('.') && name.starts_with(|c: char| c.is_ascii_lowercase()) {
        return ElementKind::Intrinsic(name.to_string());
    }
    let mut parts = name.split('.');
    let Some(mut value) = parts.next().and_then(|head| env.lookup(head)) else {
        return ElementKind::Unresolved(name.to_string());
    };
    for part in parts {
        if value.is_nullish() {
            return ElementKind::Unresolved(name.to_string());
        }
        value = stdlib::property(&value, part);
    }
    kind_of(&value, name)
}

/// What an element whose type evaluates to `value` renders as.
pub(super) fn kind_of(value: &Value, name: &str) -> ElementKind {
    match value {
        Value::Function(_) => ElementKind::Component(value.clone()),
        Value::Str(tag) => ElementKind::Intrinsic(tag.to_string()),
        Value::Host(Host::ChartCtor) => ElementKind::Chart(None),
        Value::Host(Host::ChartComponent(kind)) => ElementKind::Chart(Some(*kind)),
        Value::Host(Host::ChartPart(part)) => ElementKind::ChartPart(part),
        Value::Host(Host::Passthrough) => ElementKind::Passthrough,
        Value::Host(Host::Fragment) => ElementKind::Fragment,
        Value::Undefined => ElementKind::Unresolved(name.to_string()),
        _ => ElementKind::Invalid(name.to_string()),
    }
}

fn display_attrs(props: &Object) -> Vec<(String, String)> {
    props
        .iter()
        .filter(|(key, value)| {
            !IGNORED_PROPS.contains(&key.as_str())
                && !is_handler(key)
                && matches!(value, Value::Str(_) | Value::Num(_) | Value::Bool(true))
        })
        .map(|(key, value)| (key.clone(), value.to_display()))
        .collect()
}

fn is_handler(key: &str) -> bool {
    key.strip_prefix("on")
        .and_then(|rest| rest.chars().next())
        .is_some_and(char::is_uppercase)
}

fn short_circuits(op: LogicalOp, left: &Value) -> bool {
    match op {
        LogicalOp::And => !left.truthy(),
        LogicalOp::Or => left.truthy(),
        LogicalOp::Nullish => !left.is_nullish(),
    }
}

/// Items produced by spread and `for..of`.
pub(super) fn iterate(value: &Value) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items.borrow().clone()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::str(c.to_string())).collect()),
        other => Err(ExecutionError::new(format!(
            "{} is not iterable",
            if other.is_nullish() {
                other.to_display()
            } else {
                other.type_of().to_string()
            }
        ))),
    }
}

/// Keys visited by `for..in`.
fn key_list(value: &Value) -> Vec<Value> {
    match value {
        Value::Object(object) => object.borrow().keys().map(Value::str).collect(),
        Value::Array(items) => (0..items.borrow().len())
            .map(|i| Value::str(i.to_string()))
            .collect(),
        Value::Str(s) => (0..s.chars().count())
            .map(|i| Value::str(i.to_string()))
            .collect(),
        _ => Vec::new(),
    }
}

fn spread_into(target: &mut Object, value: &Value) {
    match value {
        Value::Object(object) => {
            for (key, item) in object.borrow().iter() {
                target.set(key.clone(), item.clone());
            }
        }
        Value::Array(items) => {
            for (i, item) in items.borrow().iter().enumerate() {
                target.set(i.to_string(), item.clone());
            }
        }
        Value::Str(s) => {
            for (i, c) in s.chars().enumerate() {
                target.set(i.to_string(), Value::str(c.to_string()));
            }
        }
        _ => {}
    }
}

pub(super) fn set_property(object: &Value, key: &str, value: Value) -> Result<()> {
    match object {
        Value::Object(target) => target.borrow_mut().set(key, value),
        Value::Array(items) => {
            let mut items = items.borrow_mut();
            if key == "length" {
                let len = value.to_number();
                if !(len >= 0.0 && len.fract() == 0.0 && len <= MAX_ARRAY_LEN as f64) {
                    return Err(ExecutionError::new("Invalid array length"));
                }
                items.resize(len as usize, Value::Undefined);
            } else if let Ok(index) = key.parse::<usize>() {
                if index >= MAX_ARRAY_LEN {
                    return Err(ExecutionError::new("Invalid array length"));
                }
                if index >= items.len() {
                    items.resize(index + 1, Value::Undefined);
                }
                items[index] = value;
            }
        }
        other if other.is_nullish() => {
            return Err(ExecutionError::new(format!(
                "Cannot set properties of {} (setting '{key}')",
                other.to_display()
            )));
        }
        _ => {}
    }
    Ok(())
}

pub(super) fn check_array_len(len: usize) -> Result<()> {
    if len > MAX_ARRAY_LEN {
        return Err(ExecutionError::new("Invalid array length"));
    }
    Ok(())
}

pub(super) fn check_string_len(len: usize) -> Result<()> {
    if len > MAX_STRING_LEN {
        return Err(ExecutionError::new("Invalid string length"));
    }
    Ok(())
}

/// Whether `+` concatenates instead of adding.
fn is_stringy(value: &Value) -> bool {
    !matches!(
        value,
        Value::Undefined | Value::Null | Value::Bool(_) | Value::Num(_)
    )
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_str(), b.as_str()) {
        return Some(x.cmp(y));
    }
    a.to_number().partial_cmp(&b.to_number())
}

pub(super) fn binary(op: BinaryOp, a: &Value, b: &Value) -> Result<Value> {
    let num = |f: fn(f64, f64) -> f64| Value::Num(f(a.to_number(), b.to_number()));
    Ok(match op {
        BinaryOp::Add if is_stringy(a) || is_stringy(b) => {
            let (left, right) = (a.to_display(), b.to_display());
            check_string_len(left.len() + right.len())?;
            Value::str(left + &right)
        }
        BinaryOp::Add => num(|x, y| x + y),
        BinaryOp::Sub => num(|x, y| x - y),
        BinaryOp::Mul => num(|x, y| x * y),
        BinaryOp::Div => num(|x, y| x / y),
        BinaryOp::Rem => num(|x, y| x % y),
        BinaryOp::Pow => num(f64::powf),
        BinaryOp::Eq => Value::Bool(loose_equals(a, b)),
        BinaryOp::NotEq => Value::Bool(!loose_equals(a, b)),
        BinaryOp::StrictEq => Value::Bool(strict_equals(a, b)),
        BinaryOp::StrictNotEq => Value::Bool(!strict_equals(a, b)),
        BinaryOp::Lt => Value::Bool(compare(a, b) == Some(Ordering::Less)),
        BinaryOp::Gt => Value::Bool(compare(a, b) == Some(Ordering::Greater)),
        BinaryOp::LtEq => Value::Bool(matches!(
            compare(a, b),
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOp::GtEq => Value::Bool(matches!(
            compare(a, b),
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOp::In => {
            let key = a.to_property_key();
            let found = match b {
                Value::Object(object) => object.borrow().contains(&key),
                Value::Array(items) => {
                    key == "length"
                        || key
                            .parse::<usize>()
                            .is_ok_and(|i| i < items.borrow().len())
                }
                _ => {
                    return Err(ExecutionError::new(format!(
                        "Cannot use 'in' operator to search for '{key}' in {}",
                        b.to_display()
                    )));
                }
            };
            Value::Bool(found)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::parser::parse_program;

    fn run(src: &str) -> Result<ComponentOutput> {
        let program = parse_program(src).expect("parses");
        run_program(&program, Limits::default())
    }

    /// Text of a program whose entry renders plain text.
    fn text(src: &str) -> String {
        let output = run(src).expect("runs");
        output
            .nodes
            .iter()
            .map(|node| match node {
                Node::Text(text) => text.clone(),
                other => panic!("unexpected node {other:?}"),
            })
            .collect()
    }

    fn error(src: &str) -> String {
        run(src).expect_err("fails").message
    }

    #[test]
    fn test_arithmetic_and_coercion() {
        assert_eq!(text("String(1 + 2 * 3 ** 2)"), "19");
        assert_eq!(text("'a' + 1 + 2"), "a12");
        assert_eq!(text("`${1 + 1}px`"), "2px");
        assert_eq!(text("String(7 % 3) + String(-7 % 3)"), "1-1");
        assert_eq!(text("String(null ?? 'x') + String(0 || 'y') + String(0 ?? 'z')"), "xy0");
        assert_eq!(text("String('10' < '9') + String(10 < 9)"), "truefalse");
        assert_eq!(text("typeof missingName"), "undefined");
    }

    #[test]
    fn test_closures_and_hoisting() {
        let src = r"
            const add = makeAdder(2);
            function makeAdder(n) { return (x) => x + n; }
            String(add(40))
        ";
        assert_eq!(text(src), "42");
    }

    #[test]
    fn test_destructuring_with_defaults_and_rest() {
        let src = r"
            const { a, b = 5, ...others } = { a: 1, c: 3, d: 4 };
            const [first, , third = 9, ...tail] = [10, 20, undefined, 40, 50];
            `${a} ${b} ${Object.keys(others).join('')} ${first} ${third} ${tail.length}`
        ";
        assert_eq!(text(src), "1 5 cd 10 9 2");
    }

    #[test]
    fn test_loops_and_control_flow() {
        let src = r"
            let out = '';
            for (let i = 0; i < 10; i++) {
                if (i % 2) continue;
                if (i > 6) break;
                out += i;
            }
            for (const x of ['a', 'b']) out += x;
            for (const k in { p: 1, q: 2 }) out += k;
            let n = 3;
            while (n > 0) { n -= 1; }
            out + n
        ";
        assert_eq!(text(src), "0246abpq0");
    }

    #[test]
    fn test_const_reassignment_fails() {
        assert_eq!(error("const x = 1; x = 2; 'done'"), "Assignment to constant variable.");
    }

    #[test]
    fn test_reference_errors() {
        assert_eq!(error("fetch('/x')"), "fetch is not defined");
        assert_eq!(
            error("const o = {}; o.missing.deeper"),
            "Cannot read properties of undefined (reading 'deeper')"
        );
        assert_eq!(error("const o = {}; o.run()"), "o.run is not a function");
    }

    #[test]
    fn test_optional_chaining_short_circuits() {
        assert_eq!(
            text("const o = null; String(o?.a.b.c) + String(o?.f())"),
            "undefinedundefined"
        );
    }

    #[test]
    fn test_throw_reports_message() {
        assert_eq!(error("throw new Error('boom')"), "Uncaught Error: boom");
        assert_eq!(error("throw 'plain'"), "Uncaught plain");
    }

    #[test]
    fn test_step_budget() {
        let program = parse_program("while (true) {}").expect("parses");
        let err = run_program(
            &program,
            Limits {
                max_steps: 1_000,
                max_depth: 64,
            },
        )
        .expect_err("budget");
        assert_eq!(err.message, "step budget of 1000 exhausted");
    }

    #[test]
    fn test_doubling_loops_hit_length_caps() {
        let concat = "let s = 'x'; for (let i = 0; i < 40; i++) { s = s + s } String(s.length)";
        assert_eq!(error(concat), "Invalid string length");

        let template = "let s = 'x'; for (let i = 0; i < 40; i++) { s = `${s}${s}` } s";
        assert_eq!(error(template), "Invalid string length");

        let compound = "let s = 'x'; for (let i = 0; i < 40; i++) { s += s } s";
        assert_eq!(error(compound), "Invalid string length");

        let spread = "let a = [0]; for (let i = 0; i < 40; i++) { a = [...a, ...a] } a";
        assert_eq!(error(spread), "Invalid array length");

        let args = "let a = [0]; for (let i = 0; i < 40; i++) { a = Array.of(...a, ...a) } a";
        assert!(error(args).contains("Invalid array length"));

        let joined = "const s = 'x'.repeat(1000); String(Array(100000).fill(s))";
        assert_eq!(error(joined), "Invalid string length");

        // Below the caps, the same loops still run.
        assert_eq!(
            text("let s = 'x'; for (let i = 0; i < 10; i++) { s = s + s } String(s.length)"),
            "1024"
        );
    }

    #[test]
    fn test_entry_selection() {
        let output = run("function Helper() { return 'no'; }\nfunction App() { return 'yes'; }")
            .expect("runs");
        assert!(matches!(&output.nodes[..], [Node::Text(t)] if t == "yes"));

        let output = run("const App = () => 'arrow';\n'ignored'").expect("runs");
        assert!(matches!(&output.nodes[..], [Node::Text(t)] if t == "arrow"));

        let output = run("function App() { return 'a'; }\nexport default function Other() { return 'b'; }")
            .expect("runs");
        assert!(matches!(&output.nodes[..], [Node::Text(t)] if t == "b"));
    }

    #[test]
    fn test_non_renderable_results() {
        assert_eq!(error("42"), "component produced no renderable output");
        assert_eq!(error("function App() { return null; }"), "component produced no renderable output");
        assert_eq!(error("[]"), "component produced no renderable output");
    }

    #[test]
    fn test_components_receive_props_and_children() {
        let src = r#"
            function Badge({ label, children }) {
                return <span title={label}>{children}</span>;
            }
            export default function App() {
                return <div className="x" onClick={() => 1}><Badge label="new">hi</Badge></div>;
            }
        "#;
        let output = run(src).expect("runs");
        let [Node::Element { tag, attrs, children }] = &output.nodes[..] else {
            panic!("{:?}", output.nodes);
        };
        assert_eq!(tag, "div");
        assert!(attrs.is_empty());
        let [Node::Element { tag, attrs, children }] = &children[..] else {
            panic!("{children:?}");
        };
        assert_eq!(tag, "span");
        assert_eq!(attrs, &[("title".to_string(), "new".to_string())]);
        assert!(matches!(&children[..], [Node::Text(t)] if t == "hi"));
    }

    #[test]
    fn test_unknown_component_fails() {
        assert_eq!(error("<Missing />"), "Missing is not defined");
        assert_eq!(
            error("const x = {}; <div>{x}</div>"),
            "Objects are not valid as a React child (found: object with keys {})"
        );
    }
}
