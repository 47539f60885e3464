//! Globals visible to generated code.
//!
//! The whole capability set lives here: a small slice of the JavaScript
//! standard library, React hook shims, the chart capabilities and the
//! canvas handle. Nothing here reaches the host: no I/O, no clock, no
//! environment.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::rc::Rc;

use serde::Serialize;
use serde_json::Value as Json;

use super::error::ExecutionError;
use super::interp::{
    self, Env, Interpreter, MAX_ARRAY_LEN, check_array_len, check_string_len,
};
use super::value::{
    Builtin, Element, ElementKind, Host, MAX_STRING_LEN, Object, Value, format_number,
    same_value_zero, strict_equals,
};
use crate::chart::ChartKind;

type Result<T> = std::result::Result<T, ExecutionError>;

const MAX_JSON_DEPTH: usize = 100;

/// Canvas size reported to code that asks; drawings are scaled to the
/// terminal anyway.
const CANVAS_WIDTH: f64 = 600.0;
const CANVAS_HEIGHT: f64 = 300.0;

const NAMESPACES: &[&str] = &[
    "Math", "JSON", "Object", "Array", "Number", "String", "Boolean", "Error", "React", "console",
];
const GLOBAL_FUNCTIONS: &[&str] = &["parseInt", "parseFloat", "isNaN", "isFinite"];
const HOOKS: &[&str] = &[
    "useState",
    "useMemo",
    "useEffect",
    "useLayoutEffect",
    "useCallback",
    "useRef",
    "useReducer",
    "useContext",
];
const CHART_PARTS: &[&str] = &[
    "XAxis",
    "YAxis",
    "Bar",
    "Line",
    "Area",
    "Pie",
    "Cell",
    "Tooltip",
    "Legend",
    "CartesianGrid",
];

const MATH_FUNCTIONS: &[&str] = &[
    "abs", "acos", "asin", "atan", "atan2", "cbrt", "ceil", "cos", "exp", "floor", "hypot", "log",
    "log10", "log2", "max", "min", "pow", "random", "round", "sign", "sin", "sqrt", "tan", "trunc",
];
const JSON_FUNCTIONS: &[&str] = &["stringify", "parse"];
const OBJECT_FUNCTIONS: &[&str] = &["keys", "values", "entries", "assign", "fromEntries", "freeze"];
const ARRAY_FUNCTIONS: &[&str] = &["isArray", "from", "of"];
const NUMBER_FUNCTIONS: &[&str] = &["isFinite", "isInteger", "isNaN", "parseFloat", "parseInt"];
const STRING_FUNCTIONS: &[&str] = &["fromCharCode"];
const CONSOLE_FUNCTIONS: &[&str] = &["log", "info", "warn", "error", "debug"];
const REACT_FUNCTIONS: &[&str] = &["createElement"];

const ARRAY_METHODS: &[&str] = &[
    "map",
    "filter",
    "forEach",
    "find",
    "findIndex",
    "findLast",
    "some",
    "every",
    "reduce",
    "flatMap",
    "sort",
    "join",
    "slice",
    "splice",
    "includes",
    "indexOf",
    "lastIndexOf",
    "concat",
    "push",
    "pop",
    "shift",
    "unshift",
    "reverse",
    "flat",
    "fill",
    "at",
    "entries",
    "keys",
    "values",
    "toString",
];
const STRING_METHODS: &[&str] = &[
    "toUpperCase",
    "toLowerCase",
    "trim",
    "trimStart",
    "trimEnd",
    "split",
    "includes",
    "slice",
    "substring",
    "startsWith",
    "endsWith",
    "padStart",
    "padEnd",
    "replace",
    "replaceAll",
    "repeat",
    "charAt",
    "charCodeAt",
    "indexOf",
    "lastIndexOf",
    "at",
    "concat",
    "localeCompare",
    "toString",
];
const NUMBER_METHODS: &[&str] = &["toFixed", "toLocaleString", "toString"];

pub(super) fn install_globals(env: &Env) {
    for ns in NAMESPACES.iter().copied() {
        env.declare(ns, Value::Host(Host::Namespace(ns)), false);
    }
    for name in GLOBAL_FUNCTIONS.iter().copied() {
        env.declare(name, function("", name), false);
    }
    for name in HOOKS.iter().copied() {
        env.declare(name, function("React", name), false);
    }
    env.declare("Infinity", Value::Num(f64::INFINITY), false);
    env.declare("NaN", Value::Num(f64::NAN), false);
    env.declare("Fragment", Value::Host(Host::Fragment), false);

    env.declare("canvas", Value::Host(Host::Canvas), false);
    env.declare("Chart", Value::Host(Host::ChartCtor), false);
    let components = [
        ("BarChart", ChartKind::Bar),
        ("LineChart", ChartKind::Line),
        ("AreaChart", ChartKind::Line),
        ("PieChart", ChartKind::Pie),
    ];
    for (name, kind) in components {
        env.declare(name, Value::Host(Host::ChartComponent(kind)), false);
    }
    env.declare("ResponsiveContainer", Value::Host(Host::Passthrough), false);
    for part in CHART_PARTS.iter().copied() {
        env.declare(part, Value::Host(Host::ChartPart(part)), false);
    }
}

fn function(ns: &'static str, name: &'static str) -> Value {
    Value::builtin(Builtin::Function { ns, name })
}

fn method(this: &Value, name: &'static str) -> Value {
    Value::builtin(Builtin::Method {
        this: this.clone(),
        name,
    })
}

/// `names` entry equal to `key`, as a `'static` name.
fn lookup(names: &[&'static str], key: &str) -> Option<&'static str> {
    names.iter().copied().find(|name| *name == key)
}

fn method_or_undefined(names: &[&'static str], this: &Value, key: &str) -> Value {
    lookup(names, key).map_or(Value::Undefined, |name| method(this, name))
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

// ---- property access ----

/// `object[key]` for a non-nullish `object`.
pub(super) fn property(object: &Value, key: &str) -> Value {
    match object {
        Value::Object(obj) => {
            let found = obj.borrow().get(key).cloned();
            found.unwrap_or_else(|| method_or_undefined(&["hasOwnProperty"], object, key))
        }
        Value::Array(items) => {
            if key == "length" {
                return Value::Num(items.borrow().len() as f64);
            }
            if let Ok(index) = key.parse::<usize>() {
                return items.borrow().get(index).cloned().unwrap_or(Value::Undefined);
            }
            method_or_undefined(ARRAY_METHODS, object, key)
        }
        Value::Str(s) => {
            if key == "length" {
                return Value::Num(s.chars().count() as f64);
            }
            if let Ok(index) = key.parse::<usize>() {
                return s
                    .chars()
                    .nth(index)
                    .map_or(Value::Undefined, |c| Value::str(c.to_string()));
            }
            method_or_undefined(STRING_METHODS, object, key)
        }
        Value::Num(_) => method_or_undefined(NUMBER_METHODS, object, key),
        Value::Bool(_) => method_or_undefined(&["toString"], object, key),
        Value::Element(element) => match key {
            "props" => Value::object(props_with_children(element)),
            "type" => match &element.kind {
                ElementKind::Intrinsic(tag) => Value::str(tag),
                ElementKind::Component(component) => component.clone(),
                _ => Value::Undefined,
            },
            _ => Value::Undefined,
        },
        Value::Host(host) => host_property(*host, object, key),
        Value::Undefined | Value::Null | Value::Function(_) | Value::Builtin(_) => Value::Undefined,
    }
}

/// Element props plus `children`: one child as itself, several as an array.
pub(super) fn props_with_children(element: &Element) -> Object {
    let mut props = element.props.clone();
    match element.children.as_slice() {
        [] => {}
        [only] => props.set("children", only.clone()),
        many => props.set("children", Value::array(many.to_vec())),
    }
    props
}

fn host_property(host: Host, object: &Value, key: &str) -> Value {
    match host {
        Host::Canvas => match key {
            "getContext" => method(object, "getContext"),
            "width" => Value::Num(CANVAS_WIDTH),
            "height" => Value::Num(CANVAS_HEIGHT),
            _ => Value::Undefined,
        },
        Host::ChartInstance(_) => match key {
            "update" | "destroy" | "resize" | "render" => Value::builtin(Builtin::Noop),
            _ => Value::Undefined,
        },
        Host::Namespace(ns) => namespace_member(ns, key),
        _ => Value::Undefined,
    }
}

fn namespace_member(ns: &'static str, key: &str) -> Value {
    let functions: &[&'static str] = match ns {
        "Math" => {
            let constant = match key {
                "PI" => Some(std::f64::consts::PI),
                "E" => Some(std::f64::consts::E),
                "LN2" => Some(std::f64::consts::LN_2),
                "LN10" => Some(std::f64::consts::LN_10),
                "LOG2E" => Some(std::f64::consts::LOG2_E),
                "LOG10E" => Some(std::f64::consts::LOG10_E),
                "SQRT2" => Some(std::f64::consts::SQRT_2),
                "SQRT1_2" => Some(std::f64::consts::FRAC_1_SQRT_2),
                _ => None,
            };
            if let Some(constant) = constant {
                return Value::Num(constant);
            }
            MATH_FUNCTIONS
        }
        "Number" => {
            let constant = match key {
                "MAX_SAFE_INTEGER" => Some(9_007_199_254_740_991.0),
                "MIN_SAFE_INTEGER" => Some(-9_007_199_254_740_991.0),
                "EPSILON" => Some(f64::EPSILON),
                "MAX_VALUE" => Some(f64::MAX),
                "MIN_VALUE" => Some(5e-324),
                "POSITIVE_INFINITY" => Some(f64::INFINITY),
                "NEGATIVE_INFINITY" => Some(f64::NEG_INFINITY),
                "NaN" => Some(f64::NAN),
                _ => None,
            };
            if let Some(constant) = constant {
                return Value::Num(constant);
            }
            NUMBER_FUNCTIONS
        }
        "React" => {
            if key == "Fragment" {
                return Value::Host(Host::Fragment);
            }
            if let Some(name) = lookup(HOOKS, key) {
                return function(ns, name);
            }
            REACT_FUNCTIONS
        }
        "JSON" => JSON_FUNCTIONS,
        "Object" => OBJECT_FUNCTIONS,
        "Array" => ARRAY_FUNCTIONS,
        "String" => STRING_FUNCTIONS,
        "console" => CONSOLE_FUNCTIONS,
        _ => &[],
    };
    lookup(functions, key).map_or(Value::Undefined, |name| function(ns, name))
}

// ---- calls ----

pub(super) fn call_builtin(
    interp: &mut Interpreter,
    builtin: &Builtin,
    args: Vec<Value>,
) -> Result<Value> {
    match builtin {
        Builtin::Noop => Ok(Value::Undefined),
        Builtin::Function { ns, name } => call_function(interp, ns, name, args),
        Builtin::Method { this, name } => call_method(interp, this, name, args),
    }
}

/// `Number(x)`, `String(x)`, `new Error(msg)` and friends.
pub(super) fn call_namespace(
    _interp: &mut Interpreter,
    ns: &str,
    args: Vec<Value>,
) -> Result<Value> {
    let first = arg(&args, 0);
    Ok(match ns {
        "Number" if args.is_empty() => Value::Num(0.0),
        "Number" => Value::Num(first.to_number()),
        "String" if args.is_empty() => Value::str(""),
        "String" => {
            let text = first.to_display();
            check_string_len(text.len())?;
            Value::str(text)
        }
        "Boolean" => Value::Bool(first.truthy()),
        "Array" => match args.as_slice() {
            [Value::Num(n)] => {
                if !(*n >= 0.0 && n.fract() == 0.0 && *n <= MAX_ARRAY_LEN as f64) {
                    return Err(ExecutionError::new("Invalid array length"));
                }
                Value::array(vec![Value::Undefined; *n as usize])
            }
            _ => Value::array(args),
        },
        "Object" => match first {
            Value::Object(_) | Value::Array(_) => first,
            _ => Value::object(Object::default()),
        },
        "Error" => {
            let mut error = Object::default();
            error.set("name", Value::str("Error"));
            let message = if first.is_nullish() {
                String::new()
            } else {
                first.to_display()
            };
            error.set("message", Value::str(message));
            Value::object(error)
        }
        other => {
            return Err(ExecutionError::new(format!("{other} is not a function")));
        }
    })
}

fn call_function(
    interp: &mut Interpreter,
    ns: &str,
    name: &str,
    args: Vec<Value>,
) -> Result<Value> {
    match ns {
        "" => Ok(global_function(name, &args)),
        "Math" => Ok(math(interp, name, &args)),
        "React" => react(interp, name, args),
        "JSON" => json(name, &args),
        "Object" => object_function(name, &args),
        "Array" => array_function(interp, name, args),
        "Number" => Ok(number_function(name, &args)),
        "String" => Ok(string_function(name, &args)),
        "console" => {
            let line: Vec<String> = args.iter().map(Value::to_display).collect();
            tracing::debug!(
                target: "chatview_render::sandbox",
                method = name,
                "{}",
                line.join(" ")
            );
            Ok(Value::Undefined)
        }
        _ => Ok(Value::Undefined),
    }
}

fn global_function(name: &str, args: &[Value]) -> Value {
    let first = arg(args, 0);
    match name {
        "parseInt" => Value::Num(parse_int(&first.to_display(), &arg(args, 1))),
        "parseFloat" => Value::Num(parse_float(&first.to_display())),
        "isNaN" => Value::Bool(first.to_number().is_nan()),
        "isFinite" => Value::Bool(first.to_number().is_finite()),
        _ => Value::Undefined,
    }
}

fn number_function(name: &str, args: &[Value]) -> Value {
    let first = arg(args, 0);
    let number = match first {
        Value::Num(n) => Some(n),
        _ => None,
    };
    match name {
        "isFinite" => Value::Bool(number.is_some_and(f64::is_finite)),
        "isInteger" => Value::Bool(number.is_some_and(|n| n.is_finite() && n.fract() == 0.0)),
        "isNaN" => Value::Bool(number.is_some_and(f64::is_nan)),
        "parseFloat" => Value::Num(parse_float(&first.to_display())),
        "parseInt" => Value::Num(parse_int(&first.to_display(), &arg(args, 1))),
        _ => Value::Undefined,
    }
}

fn string_function(name: &str, args: &[Value]) -> Value {
    match name {
        "fromCharCode" => Value::str(
            args.iter()
                .filter_map(|code| char::from_u32(code.to_number() as u32))
                .collect::<String>(),
        ),
        _ => Value::Undefined,
    }
}

fn parse_int(text: &str, radix: &Value) -> f64 {
    let radix = match radix {
        Value::Undefined => None,
        other => {
            let r = other.to_number();
            if r.is_nan() || r == 0.0 {
                None
            } else {
                Some(r as u32)
            }
        }
    };
    let s = text.trim_start();
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let (radix, s) = match radix {
        None | Some(16) if s.starts_with("0x") || s.starts_with("0X") => (16, &s[2..]),
        None => (10, s),
        Some(r) if (2..=36).contains(&r) => (r, s),
        Some(_) => return f64::NAN,
    };
    let mut value = None;
    for digit in s.chars().map_while(|c| c.to_digit(radix)) {
        value = Some(value.unwrap_or(0.0) * f64::from(radix) + f64::from(digit));
    }
    match value {
        Some(v) if negative => -v,
        Some(v) => v,
        None => f64::NAN,
    }
}

fn parse_float(text: &str) -> f64 {
    let s = text.trim_start();
    let bytes = s.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    if s[end..].starts_with("Infinity") {
        return if s.starts_with('-') {
            f64::NEG_INFINITY
        } else {
            f64::INFINITY
        };
    }
    let start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if !bytes[start..end].iter().any(u8::is_ascii_digit) {
        return f64::NAN;
    }
    if end < bytes.len() && matches!(bytes[end], b'e' | b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && matches!(bytes[exp], b'+' | b'-') {
            exp += 1;
        }
        let digits = exp;
        while exp < bytes.len() && bytes[exp].is_ascii_digit() {
            exp += 1;
        }
        if exp > digits {
            end = exp;
        }
    }
    s[..end].parse().unwrap_or(f64::NAN)
}

fn math(interp: &mut Interpreter, name: &str, args: &[Value]) -> Value {
    let x = arg(args, 0).to_number();
    let y = arg(args, 1).to_number();
    let numbers = || args.iter().map(Value::to_number);
    Value::Num(match name {
        "abs" => x.abs(),
        "acos" => x.acos(),
        "asin" => x.asin(),
        "atan" => x.atan(),
        "atan2" => x.atan2(y),
        "cbrt" => x.cbrt(),
        "ceil" => x.ceil(),
        "cos" => x.cos(),
        "exp" => x.exp(),
        "floor" => x.floor(),
        "hypot" => numbers().fold(0.0, f64::hypot),
        "log" => x.ln(),
        "log10" => x.log10(),
        "log2" => x.log2(),
        "max" if numbers().any(f64::is_nan) => f64::NAN,
        "max" => numbers().fold(f64::NEG_INFINITY, f64::max),
        "min" if numbers().any(f64::is_nan) => f64::NAN,
        "min" => numbers().fold(f64::INFINITY, f64::min),
        "pow" => x.powf(y),
        "random" => interp.next_random(),
        // Halves round toward +Infinity.
        "round" if x.fract().abs() == 0.5 => (x + 0.5).floor(),
        "round" => x.round(),
        "sign" if x.is_nan() || x == 0.0 => x,
        "sign" => x.signum(),
        "sin" => x.sin(),
        "sqrt" => x.sqrt(),
        "tan" => x.tan(),
        "trunc" => x.trunc(),
        _ => f64::NAN,
    })
}

fn react(interp: &mut Interpreter, name: &str, args: Vec<Value>) -> Result<Value> {
    let first = arg(&args, 0);
    match name {
        "useState" => {
            let value = if first.is_callable() {
                interp.call(&first, Vec::new())?
            } else {
                first
            };
            Ok(Value::array(vec![value, Value::builtin(Builtin::Noop)]))
        }
        "useReducer" => {
            let init = arg(&args, 1);
            let initializer = arg(&args, 2);
            let state = if initializer.is_callable() {
                interp.call(&initializer, vec![init])?
            } else {
                init
            };
            Ok(Value::array(vec![state, Value::builtin(Builtin::Noop)]))
        }
        "useMemo" if first.is_callable() => interp.call(&first, Vec::new()),
        "useCallback" | "useMemo" => Ok(first),
        "useEffect" | "useLayoutEffect" => {
            interp.queue_effect(first);
            Ok(Value::Undefined)
        }
        "useRef" => {
            let mut reference = Object::default();
            reference.set("current", first);
            Ok(Value::object(reference))
        }
        "createElement" => {
            let mut args = args.into_iter();
            let element_type = args.next().unwrap_or(Value::Undefined);
            let props = match args.next() {
                Some(Value::Object(props)) => props.borrow().clone(),
                _ => Object::default(),
            };
            let name = match &element_type {
                Value::Str(tag) => tag.to_string(),
                _ => "element".to_string(),
            };
            Ok(Value::Element(Rc::new(Element {
                kind: interp::kind_of(&element_type, &name),
                props,
                children: args.collect(),
            })))
        }
        _ => Ok(Value::Undefined),
    }
}

fn object_function(name: &str, args: &[Value]) -> Result<Value> {
    let first = arg(args, 0);
    Ok(match name {
        "keys" => Value::array(entries(&first).into_iter().map(|(k, _)| Value::str(k)).collect()),
        "values" => Value::array(entries(&first).into_iter().map(|(_, v)| v).collect()),
        "entries" => Value::array(
            entries(&first)
                .into_iter()
                .map(|(k, v)| Value::array(vec![Value::str(k), v]))
                .collect(),
        ),
        "assign" => {
            let Value::Object(target) = &first else {
                return Err(ExecutionError::new(
                    "Cannot convert undefined or null to object",
                ));
            };
            for source in &args[1..] {
                let copied = entries(source);
                let mut target = target.borrow_mut();
                for (key, value) in copied {
                    target.set(key, value);
                }
            }
            first
        }
        "fromEntries" => {
            let mut object = Object::default();
            for entry in interp::iterate(&first)? {
                let key = property(&entry, "0");
                object.set(key.to_property_key(), property(&entry, "1"));
            }
            Value::object(object)
        }
        "freeze" => first,
        _ => Value::Undefined,
    })
}

/// Own enumerable entries, in order.
fn entries(value: &Value) -> Vec<(String, Value)> {
    match value {
        Value::Object(object) => object
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        Value::Array(items) => items
            .borrow()
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v.clone()))
            .collect(),
        Value::Str(s) => s
            .chars()
            .enumerate()
            .map(|(i, c)| (i.to_string(), Value::str(c.to_string())))
            .collect(),
        _ => Vec::new(),
    }
}

fn array_function(interp: &mut Interpreter, name: &str, args: Vec<Value>) -> Result<Value> {
    let first = arg(&args, 0);
    match name {
        "isArray" => Ok(Value::Bool(matches!(first, Value::Array(_)))),
        "of" => Ok(Value::array(args)),
        "from" => {
            let items = match &first {
                Value::Array(_) | Value::Str(_) => interp::iterate(&first)?,
                Value::Object(object) => {
                    let len = object.borrow().get("length").map_or(0.0, Value::to_number);
                    if !(len >= 0.0 && len <= MAX_ARRAY_LEN as f64) {
                        return Err(ExecutionError::new("Invalid array length"));
                    }
                    vec![Value::Undefined; len as usize]
                }
                _ => Vec::new(),
            };
            let map = arg(&args, 1);
            if !map.is_callable() {
                return Ok(Value::array(items));
            }
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.into_iter().enumerate() {
                out.push(interp.call(&map, vec![item, Value::Num(i as f64)])?);
            }
            Ok(Value::array(out))
        }
        _ => Ok(Value::Undefined),
    }
}

// ---- JSON ----

fn json(name: &str, args: &[Value]) -> Result<Value> {
    match name {
        "stringify" => stringify(&arg(args, 0), &arg(args, 2)),
        "parse" => {
            let text = arg(args, 0).to_display();
            let parsed: Json = serde_json::from_str(&text)
                .map_err(|e| ExecutionError::new(format!("JSON.parse: {e}")))?;
            Ok(from_json(&parsed))
        }
        _ => Ok(Value::Undefined),
    }
}

fn stringify(value: &Value, indent: &Value) -> Result<Value> {
    let Some(json) = to_json(value, 0)? else {
        return Ok(Value::Undefined);
    };
    let indent: String = match indent {
        Value::Num(n) if *n >= 1.0 => " ".repeat(n.min(10.0) as usize),
        Value::Str(s) => s.chars().take(10).collect(),
        _ => String::new(),
    };
    if indent.is_empty() {
        return Ok(Value::str(json.to_string()));
    }
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(indent.as_bytes());
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    json.serialize(&mut serializer)
        .map_err(|e| ExecutionError::new(format!("JSON.stringify: {e}")))?;
    Ok(Value::str(String::from_utf8_lossy(&out)))
}

/// `None` for values JSON omits (undefined and functions).
fn to_json(value: &Value, depth: usize) -> Result<Option<Json>> {
    if depth > MAX_JSON_DEPTH {
        return Err(ExecutionError::new("Converting circular structure to JSON"));
    }
    Ok(Some(match value {
        Value::Undefined | Value::Function(_) | Value::Builtin(_) => return Ok(None),
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Num(n) => number_to_json(*n),
        Value::Str(s) => Json::String(s.to_string()),
        Value::Array(items) => {
            let items = items.borrow();
            let mut out = Vec::with_capacity(items.len());
            for item in items.iter() {
                out.push(to_json(item, depth + 1)?.unwrap_or(Json::Null));
            }
            Json::Array(out)
        }
        Value::Object(object) => {
            let mut map = serde_json::Map::new();
            for (key, item) in object.borrow().iter() {
                if let Some(item) = to_json(item, depth + 1)? {
                    map.insert(key.clone(), item);
                }
            }
            Json::Object(map)
        }
        Value::Element(_) | Value::Host(_) => Json::Object(serde_json::Map::new()),
    }))
}

fn number_to_json(n: f64) -> Json {
    if !n.is_finite() {
        return Json::Null;
    }
    if n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        return Json::from(n as i64);
    }
    serde_json::Number::from_f64(n).map_or(Json::Null, Json::Number)
}

fn from_json(json: &Json) -> Value {
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => Value::Num(n.as_f64().unwrap_or(f64::NAN)),
        Json::String(s) => Value::str(s),
        Json::Array(items) => Value::array(items.iter().map(from_json).collect()),
        Json::Object(map) => {
            let mut object = Object::default();
            for (key, item) in map {
                object.set(key.clone(), from_json(item));
            }
            Value::object(object)
        }
    }
}

// ---- methods ----

fn call_method(
    interp: &mut Interpreter,
    this: &Value,
    name: &str,
    args: Vec<Value>,
) -> Result<Value> {
    match this {
        Value::Array(items) => array_method(interp, this, items, name, args),
        Value::Str(s) => string_method(interp, s, name, &args),
        Value::Num(n) => Ok(number_method(*n, name, &args)),
        Value::Bool(b) => Ok(Value::str(b.to_string())),
        Value::Object(object) if name == "hasOwnProperty" => {
            let key = arg(&args, 0).to_property_key();
            Ok(Value::Bool(object.borrow().contains(&key)))
        }
        Value::Host(Host::Canvas) if name == "getContext" => Ok(Value::Host(Host::Canvas)),
        _ => Ok(Value::Undefined),
    }
}

fn callback(args: &[Value], method: &str) -> Result<Value> {
    let callback = arg(args, 0);
    if callback.is_callable() {
        Ok(callback)
    } else {
        Err(ExecutionError::new(format!(
            "{} is not a function (in Array.{method})",
            callback.to_display()
        )))
    }
}

/// Resolves a possibly negative index argument against `len`.
fn relative(value: Option<&Value>, len: usize, default: usize) -> usize {
    match value {
        None | Some(Value::Undefined) => default,
        Some(value) => {
            let n = value.to_number();
            if n.is_nan() {
                0
            } else if n < 0.0 {
                (len as f64 + n.trunc()).max(0.0) as usize
            } else {
                (n.trunc() as usize).min(len)
            }
        }
    }
}

#[allow(clippy::too_many_lines)]
fn array_method(
    interp: &mut Interpreter,
    this: &Value,
    items: &Rc<RefCell<Vec<Value>>>,
    name: &str,
    args: Vec<Value>,
) -> Result<Value> {
    // Callbacks may mutate the array; iterate over a snapshot.
    let snapshot = || items.borrow().clone();
    let index = |i: usize| Value::Num(i as f64);
    match name {
        "map" | "filter" | "forEach" | "find" | "findIndex" | "findLast" | "some" | "every"
        | "flatMap" => {
            let f = callback(&args, name)?;
            let mut out = Vec::new();
            let mut entries: Vec<(usize, Value)> = snapshot().into_iter().enumerate().collect();
            if name == "findLast" {
                entries.reverse();
            }
            for (i, item) in entries {
                let result = interp.call(&f, vec![item.clone(), index(i), this.clone()])?;
                match name {
                    "map" => out.push(result),
                    "flatMap" => match result {
                        Value::Array(inner) => out.extend(inner.borrow().iter().cloned()),
                        other => out.push(other),
                    },
                    "filter" if result.truthy() => out.push(item),
                    "find" | "findLast" if result.truthy() => return Ok(item),
                    "findIndex" if result.truthy() => return Ok(index(i)),
                    "some" if result.truthy() => return Ok(Value::Bool(true)),
                    "every" if !result.truthy() => return Ok(Value::Bool(false)),
                    _ => {}
                }
            }
            Ok(match name {
                "map" | "filter" | "flatMap" => Value::array(out),
                "findIndex" => Value::Num(-1.0),
                "some" => Value::Bool(false),
                "every" => Value::Bool(true),
                _ => Value::Undefined,
            })
        }
        "reduce" => {
            let f = callback(&args, name)?;
            let mut entries = snapshot().into_iter().enumerate();
            let mut acc = if args.len() >= 2 {
                args[1].clone()
            } else {
                match entries.next() {
                    Some((_, first)) => first,
                    None => {
                        return Err(ExecutionError::new(
                            "Reduce of empty array with no initial value",
                        ));
                    }
                }
            };
            for (i, item) in entries {
                acc = interp.call(&f, vec![acc, item, index(i), this.clone()])?;
            }
            Ok(acc)
        }
        "sort" => {
            let comparator = args.first().filter(|c| c.is_callable());
            let sorted = sort_values(interp, snapshot(), comparator)?;
            *items.borrow_mut() = sorted;
            Ok(this.clone())
        }
        "join" => {
            let separator = match args.first() {
                None | Some(Value::Undefined) => ",".to_string(),
                Some(sep) => sep.to_display(),
            };
            let mut out = String::new();
            for (i, item) in items.borrow().iter().enumerate() {
                if i > 0 {
                    out.push_str(&separator);
                }
                if !item.is_nullish() {
                    out.push_str(&item.to_display());
                }
                check_string_len(out.len())?;
            }
            Ok(Value::str(out))
        }
        "slice" => {
            let items = items.borrow();
            let len = items.len();
            let start = relative(args.first(), len, 0);
            let end = relative(args.get(1), len, len);
            Ok(Value::array(items.get(start..end.max(start)).unwrap_or_default().to_vec()))
        }
        "splice" => {
            let mut items = items.borrow_mut();
            let len = items.len();
            let start = relative(args.first(), len, len);
            let delete = match args.get(1) {
                None => len - start,
                Some(count) => (count.to_number().max(0.0) as usize).min(len - start),
            };
            let inserted = args.iter().skip(2).cloned();
            let removed: Vec<Value> = items.splice(start..start + delete, inserted).collect();
            check_array_len(items.len())?;
            Ok(Value::array(removed))
        }
        "includes" => {
            let needle = arg(&args, 0);
            Ok(Value::Bool(items.borrow().iter().any(|v| same_value_zero(v, &needle))))
        }
        "indexOf" | "lastIndexOf" => {
            let needle = arg(&args, 0);
            let items = items.borrow();
            let found = if name == "indexOf" {
                items.iter().position(|v| strict_equals(v, &needle))
            } else {
                items.iter().rposition(|v| strict_equals(v, &needle))
            };
            Ok(found.map_or(Value::Num(-1.0), index))
        }
        "concat" => {
            let mut out = snapshot();
            for value in args {
                match value {
                    Value::Array(other) => out.extend(other.borrow().iter().cloned()),
                    other => out.push(other),
                }
                check_array_len(out.len())?;
            }
            Ok(Value::array(out))
        }
        "push" => {
            let mut items = items.borrow_mut();
            items.extend(args);
            check_array_len(items.len())?;
            Ok(index(items.len()))
        }
        "unshift" => {
            let mut items = items.borrow_mut();
            items.splice(0..0, args);
            check_array_len(items.len())?;
            Ok(index(items.len()))
        }
        "pop" => Ok(items.borrow_mut().pop().unwrap_or(Value::Undefined)),
        "shift" => {
            let mut items = items.borrow_mut();
            Ok(if items.is_empty() {
                Value::Undefined
            } else {
                items.remove(0)
            })
        }
        "reverse" => {
            items.borrow_mut().reverse();
            Ok(this.clone())
        }
        "fill" => {
            let value = arg(&args, 0);
            let mut items = items.borrow_mut();
            let len = items.len();
            let start = relative(args.get(1), len, 0);
            let end = relative(args.get(2), len, len);
            for slot in items.iter_mut().take(end).skip(start) {
                *slot = value.clone();
            }
            Ok(this.clone())
        }
        "flat" => {
            let depth = match args.first() {
                None | Some(Value::Undefined) => 1,
                Some(depth) => depth.to_number().clamp(0.0, 100.0) as usize,
            };
            let mut out = Vec::new();
            flatten(&snapshot(), depth, &mut out)?;
            Ok(Value::array(out))
        }
        "at" => {
            let items = items.borrow();
            let n = arg(&args, 0).to_number();
            let n = if n.is_nan() { 0.0 } else { n.trunc() };
            let i = if n < 0.0 { items.len() as f64 + n } else { n };
            Ok(if i >= 0.0 {
                items.get(i as usize).cloned().unwrap_or(Value::Undefined)
            } else {
                Value::Undefined
            })
        }
        "entries" => Ok(Value::array(
            snapshot()
                .into_iter()
                .enumerate()
                .map(|(i, v)| Value::array(vec![index(i), v]))
                .collect(),
        )),
        "keys" => Ok(Value::array((0..items.borrow().len()).map(index).collect())),
        "values" => Ok(Value::array(snapshot())),
        "toString" => {
            let text = this.to_display();
            check_string_len(text.len())?;
            Ok(Value::str(text))
        }
        _ => Ok(Value::Undefined),
    }
}

fn flatten(items: &[Value], depth: usize, out: &mut Vec<Value>) -> Result<()> {
    for item in items {
        match item {
            Value::Array(inner) if depth > 0 => flatten(&inner.borrow(), depth - 1, out)?,
            other => out.push(other.clone()),
        }
        check_array_len(out.len())?;
    }
    Ok(())
}

/// Stable merge sort with a comparator that may fail.
fn sort_values(
    interp: &mut Interpreter,
    mut items: Vec<Value>,
    comparator: Option<&Value>,
) -> Result<Vec<Value>> {
    if items.len() <= 1 {
        return Ok(items);
    }
    let right = items.split_off(items.len() / 2);
    let left = sort_values(interp, items, comparator)?;
    let right = sort_values(interp, right, comparator)?;

    let mut out = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    while let (Some(a), Some(b)) = (left.peek(), right.peek()) {
        let take_right = compare_for_sort(interp, a, b, comparator)? == Ordering::Greater;
        let next = if take_right { right.next() } else { left.next() };
        out.extend(next);
    }
    out.extend(left);
    out.extend(right);
    Ok(out)
}

fn compare_for_sort(
    interp: &mut Interpreter,
    a: &Value,
    b: &Value,
    comparator: Option<&Value>,
) -> Result<Ordering> {
    match (a, b) {
        (Value::Undefined, Value::Undefined) => return Ok(Ordering::Equal),
        (Value::Undefined, _) => return Ok(Ordering::Greater),
        (_, Value::Undefined) => return Ok(Ordering::Less),
        _ => {}
    }
    match comparator {
        Some(comparator) => {
            let n = interp
                .call(comparator, vec![a.clone(), b.clone()])?
                .to_number();
            Ok(n.partial_cmp(&0.0).unwrap_or(Ordering::Equal))
        }
        None => Ok(a.to_display().cmp(&b.to_display())),
    }
}

#[allow(clippy::too_many_lines)]
fn string_method(
    interp: &mut Interpreter,
    s: &str,
    name: &str,
    args: &[Value],
) -> Result<Value> {
    let text = |i: usize| arg(args, i).to_display();
    let chars = || s.chars().collect::<Vec<char>>();
    let len = s.chars().count();
    Ok(match name {
        "toUpperCase" => Value::str(s.to_uppercase()),
        "toLowerCase" => Value::str(s.to_lowercase()),
        "trim" => Value::str(s.trim()),
        "trimStart" => Value::str(s.trim_start()),
        "trimEnd" => Value::str(s.trim_end()),
        "toString" => Value::str(s),
        "split" => {
            let limit = match args.get(1) {
                None | Some(Value::Undefined) => usize::MAX,
                Some(limit) => limit.to_number().max(0.0) as usize,
            };
            let parts: Vec<Value> = match args.first() {
                None | Some(Value::Undefined) => vec![Value::str(s)],
                Some(sep) => {
                    let sep = sep.to_display();
                    if sep.is_empty() {
                        s.chars().map(|c| Value::str(c.to_string())).collect()
                    } else {
                        s.split(sep.as_str()).map(Value::str).collect()
                    }
                }
            };
            Value::array(parts.into_iter().take(limit).collect())
        }
        "includes" => Value::Bool(s.contains(text(0).as_str())),
        "startsWith" => Value::Bool(s.starts_with(text(0).as_str())),
        "endsWith" => Value::Bool(s.ends_with(text(0).as_str())),
        "indexOf" => {
            let from = relative(args.get(1), len, 0);
            let offset = byte_offset(s, from);
            s[offset..]
                .find(text(0).as_str())
                .map_or(Value::Num(-1.0), |b| {
                    Value::Num((from + s[offset..offset + b].chars().count()) as f64)
                })
        }
        "lastIndexOf" => s
            .rfind(text(0).as_str())
            .map_or(Value::Num(-1.0), |b| Value::Num(s[..b].chars().count() as f64)),
        "slice" => {
            let start = relative(args.first(), len, 0);
            let end = relative(args.get(1), len, len);
            let picked: String = chars()
                .get(start..end.max(start))
                .unwrap_or_default()
                .iter()
                .collect();
            Value::str(picked)
        }
        "substring" => {
            let clamp = |v: Option<&Value>, default: usize| match v {
                None | Some(Value::Undefined) => default,
                Some(v) => {
                    let n = v.to_number();
                    if n.is_nan() { 0 } else { (n.max(0.0) as usize).min(len) }
                }
            };
            let (a, b) = (clamp(args.first(), 0), clamp(args.get(1), len));
            let (start, end) = if a <= b { (a, b) } else { (b, a) };
            Value::str(chars()[start..end].iter().collect::<String>())
        }
        "padStart" | "padEnd" => {
            let target = arg(args, 0).to_number();
            let target = if target.is_nan() { 0 } else { target.max(0.0) as usize };
            if target > MAX_STRING_LEN {
                return Err(ExecutionError::new("Invalid string length"));
            }
            let fill = match args.get(1) {
                None | Some(Value::Undefined) => " ".to_string(),
                Some(fill) => fill.to_display(),
            };
            if target <= len || fill.is_empty() {
                return Ok(Value::str(s));
            }
            let padding: String = fill.chars().cycle().take(target - len).collect();
            Value::str(if name == "padStart" {
                format!("{padding}{s}")
            } else {
                format!("{s}{padding}")
            })
        }
        "replace" | "replaceAll" => {
            let pattern = text(0);
            let replacement = arg(args, 1);
            let mut out = String::new();
            let mut rest = s;
            let mut consumed = 0;
            while let Some(found) = rest.find(pattern.as_str()) {
                out.push_str(&rest[..found]);
                let replaced = if replacement.is_callable() {
                    let offset = s[..consumed + found].chars().count();
                    interp
                        .call(
                            &replacement,
                            vec![Value::str(&pattern), Value::Num(offset as f64), Value::str(s)],
                        )?
                        .to_display()
                } else {
                    replacement.to_display()
                };
                out.push_str(&replaced);
                if out.len() > MAX_STRING_LEN {
                    return Err(ExecutionError::new("Invalid string length"));
                }
                let advance = found + pattern.len();
                consumed += advance;
                rest = &rest[advance..];
                if name == "replace" {
                    break;
                }
                if pattern.is_empty() {
                    // An empty pattern matches between every character.
                    let Some(c) = rest.chars().next() else {
                        break;
                    };
                    out.push(c);
                    consumed += c.len_utf8();
                    rest = &rest[c.len_utf8()..];
                }
            }
            out.push_str(rest);
            Value::str(out)
        }
        "repeat" => {
            let count = arg(args, 0).to_number();
            if !(count >= 0.0 && count.is_finite())
                || (count as usize).saturating_mul(s.len()) > MAX_STRING_LEN
            {
                return Err(ExecutionError::new(format!(
                    "Invalid count value: {}",
                    format_number(count)
                )));
            }
            Value::str(s.repeat(count as usize))
        }
        "charAt" => {
            let i = arg(args, 0).to_number();
            let i = if i.is_nan() { 0.0 } else { i };
            Value::str(if i >= 0.0 {
                s.chars().nth(i as usize).map(String::from).unwrap_or_default()
            } else {
                String::new()
            })
        }
        "charCodeAt" => {
            let i = arg(args, 0).to_number();
            let i = if i.is_nan() { 0.0 } else { i };
            let code = if i >= 0.0 { s.chars().nth(i as usize) } else { None };
            Value::Num(code.map_or(f64::NAN, |c| f64::from(u32::from(c))))
        }
        "at" => {
            let n = arg(args, 0).to_number();
            let n = if n.is_nan() { 0.0 } else { n.trunc() };
            let i = if n < 0.0 { len as f64 + n } else { n };
            if i >= 0.0 {
                s.chars()
                    .nth(i as usize)
                    .map_or(Value::Undefined, |c| Value::str(c.to_string()))
            } else {
                Value::Undefined
            }
        }
        "concat" => {
            let mut out = s.to_string();
            for value in args {
                out.push_str(&value.to_display());
                check_string_len(out.len())?;
            }
            Value::str(out)
        }
        "localeCompare" => {
            let other = text(0);
            let ordering = s
                .to_lowercase()
                .cmp(&other.to_lowercase())
                .then_with(|| s.cmp(other.as_str()));
            Value::Num(match ordering {
                Ordering::Less => -1.0,
                Ordering::Equal => 0.0,
                Ordering::Greater => 1.0,
            })
        }
        _ => Value::Undefined,
    })
}

fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(b, _)| b)
}

fn number_method(n: f64, name: &str, args: &[Value]) -> Value {
    match name {
        "toFixed" => Value::str(to_fixed(n, &arg(args, 0))),
        "toLocaleString" => Value::str(to_locale_string(n, &arg(args, 1))),
        "toString" => {
            let radix = arg(args, 0).to_number();
            if radix.is_nan() || radix == 10.0 || !(2.0..=36.0).contains(&radix) {
                return Value::str(format_number(n));
            }
            Value::str(integer_radix(n, radix as u32))
        }
        _ => Value::Undefined,
    }
}

fn to_fixed(n: f64, digits: &Value) -> String {
    let digits = digits.to_number();
    let digits = if digits.is_nan() {
        0
    } else {
        digits.clamp(0.0, 100.0) as usize
    };
    if !n.is_finite() || n.abs() >= 1e21 {
        return format_number(n);
    }
    let sign = if n < 0.0 { "-" } else { "" };
    let abs = n.abs();
    // Exact ties round up; `format!` would round them to even.
    let scale = 10_f64.powi(digits as i32);
    let scaled = abs * scale;
    let abs = if scaled < 1e15 && scaled.fract() == 0.5 {
        scaled.ceil() / scale
    } else {
        abs
    };
    format!("{sign}{abs:.digits$}")
}

fn integer_radix(n: f64, radix: u32) -> String {
    if !n.is_finite() || n.fract() != 0.0 || n.abs() >= 9_007_199_254_740_992.0 {
        return format_number(n);
    }
    let mut value = n.abs() as u64;
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        let digit = (value % u64::from(radix)) as u32;
        digits.extend(char::from_digit(digit, radix));
        value /= u64::from(radix);
    }
    if n < 0.0 {
        digits.push('-');
    }
    digits.iter().rev().collect()
}

/// en-US formatting with the common `Intl.NumberFormat` options.
fn to_locale_string(n: f64, options: &Value) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "∞" } else { "-∞" }.to_string();
    }
    let option = |key: &str| match options {
        Value::Object(object) => object.borrow().get(key).cloned(),
        _ => None,
    };
    let style = option("style").map(|v| v.to_display()).unwrap_or_default();
    let (value, mut min, mut max, prefix, suffix) = match style.as_str() {
        "currency" => {
            let code = option("currency").map_or_else(|| "USD".to_string(), |v| v.to_display());
            (n, 2, 2, currency_symbol(&code), "")
        }
        "percent" => (n * 100.0, 0, 0, String::new(), "%"),
        _ => (n, 0, 3, String::new(), ""),
    };
    let digits = |v: Value| {
        let d = v.to_number();
        if d.is_nan() { 0 } else { d.clamp(0.0, 20.0) as usize }
    };
    if let Some(v) = option("minimumFractionDigits") {
        min = digits(v);
        max = max.max(min);
    }
    if let Some(v) = option("maximumFractionDigits") {
        max = digits(v);
        min = min.min(max);
    }
    let grouping = option("useGrouping").is_none_or(|v| v.truthy());

    let rounded = format!("{:.max$}", value.abs());
    let (int, frac) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
    let mut frac = frac.to_string();
    while frac.len() > min && frac.ends_with('0') {
        frac.pop();
    }
    let negative = value < 0.0 && rounded.chars().any(|c| c.is_ascii_digit() && c != '0');

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&prefix);
    if grouping {
        out.push_str(&group_thousands(int));
    } else {
        out.push_str(int);
    }
    if !frac.is_empty() {
        out.push('.');
        out.push_str(&frac);
    }
    out.push_str(suffix);
    out
}

fn currency_symbol(code: &str) -> String {
    match code.to_ascii_uppercase().as_str() {
        "USD" => "$".to_string(),
        "EUR" => "€".to_string(),
        "GBP" => "£".to_string(),
        "JPY" => "¥".to_string(),
        "INR" => "₹".to_string(),
        other => format!("{other} "),
    }
}

fn group_thousands(int: &str) -> String {
    let mut out = String::with_capacity(int.len() + int.len() / 3);
    for (i, c) in int.chars().enumerate() {
        if i > 0 && (int.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use crate::component::Node;
    use crate::sandbox::interp::{Limits, run_program};
    use crate::sandbox::parser::parse_program;

    fn text(src: &str) -> String {
        let program = parse_program(src).expect("parses");
        let output = run_program(&program, Limits::default()).expect("runs");
        output
            .nodes
            .iter()
            .map(|node| match node {
                Node::Text(text) => text.clone(),
                other => panic!("unexpected node {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_array_methods() {
        assert_eq!(text("[1, 2, 3].map((x) => x * 2).join('-')"), "2-4-6");
        assert_eq!(text("[1, 2, 3, 4].filter((x) => x % 2 === 0).join()"), "2,4");
        assert_eq!(text("String([1, 2, 3].reduce((a, b) => a + b, 10))"), "16");
        assert_eq!(text("String([5, 1, 10].sort())"), "1,10,5");
        assert_eq!(text("String([5, 1, 10].sort((a, b) => a - b))"), "1,5,10");
        assert_eq!(text("String([1, [2, [3]]].flat())"), "1,2,3");
        assert_eq!(text("String([1, 2, 3].slice(-2))"), "2,3");
        assert_eq!(text("String([1, 2, 3].find((x) => x > 1))"), "2");
        assert_eq!(text("String([1, 2].some((x) => x > 1) && [1, 2].every((x) => x > 0))"), "true");
        assert_eq!(text("String([NaN].includes(NaN)) + [1, 2].indexOf(3)"), "true-1");
        assert_eq!(
            text("const a = [1]; a.push(2, 3); a.unshift(0); String(a) + ':' + a.length"),
            "0,1,2,3:4"
        );
        assert_eq!(text("[[1, 'a'], [2, 'b']].map(([n, s]) => s + n).join('')"), "a1b2");
    }

    fn error(src: &str) -> String {
        let program = parse_program(src).expect("parses");
        run_program(&program, Limits::default())
            .expect_err("fails")
            .message
    }

    #[test]
    fn test_reduce_empty_without_initial_fails() {
        assert_eq!(
            error("[].reduce((a, b) => a + b)"),
            "Reduce of empty array with no initial value"
        );
    }

    #[test]
    fn test_builders_stop_at_length_caps() {
        let big = "const s = 'x'.repeat(1000); const a = Array(100000).fill(s);";
        assert_eq!(error(&format!("{big} a.join('')")), "Invalid string length");
        assert_eq!(error(&format!("{big} a.toString()")), "Invalid string length");
        assert_eq!(
            error(&format!("{big} ''.concat(...a.slice(0, 2000))")),
            "Invalid string length"
        );

        let nested = "const a = Array(1000).fill(0); Array(1001).fill(a).flat().length";
        assert_eq!(error(nested), "Invalid array length");
        let pushed = "const a = Array(600000).fill(0); a.push(...a); a.length";
        assert_eq!(error(pushed), "Invalid array length");
    }

    #[test]
    fn test_string_methods() {
        assert_eq!(text("'  Hi  '.trim().toUpperCase()"), "HI");
        assert_eq!(text("'a,b,c'.split(',').length + ''"), "3");
        assert_eq!(text("'7'.padStart(3, '0')"), "007");
        assert_eq!(text("'hello'.slice(1, -1)"), "ell");
        assert_eq!(text("'a-b-c'.replaceAll('-', '+')"), "a+b+c");
        assert_eq!(text("'a-b-c'.replace('-', '+')"), "a+b-c");
        assert_eq!(text("String('abc'.startsWith('ab')) + 'abc'.indexOf('c')"), "true2");
        assert_eq!(text("'ab'.repeat(3)"), "ababab");
        assert_eq!(text("'héllo'.length + ''"), "5");
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(text("(3.14159).toFixed(2)"), "3.14");
        assert_eq!(text("(2.5).toFixed(0)"), "3");
        assert_eq!(text("(-1.005).toFixed(1)"), "-1.0");
        assert_eq!(text("(1234567.891).toLocaleString()"), "1,234,567.891");
        assert_eq!(
            text("(1234.5).toLocaleString('en-US', { style: 'currency', currency: 'USD' })"),
            "$1,234.50"
        );
        assert_eq!(
            text("(0.256).toLocaleString(undefined, { style: 'percent' })"),
            "26%"
        );
        assert_eq!(
            text("(5).toLocaleString('en-US', { minimumFractionDigits: 2 })"),
            "5.00"
        );
        assert_eq!(text("(255).toString(16)"), "ff");
    }

    #[test]
    fn test_math_and_parsing() {
        assert_eq!(text("String(Math.max(1, 7, 3)) + Math.min()"), "7Infinity");
        assert_eq!(text("String(Math.round(-2.5)) + Math.round(2.5)"), "-23");
        assert_eq!(text("String(parseInt('42px')) + parseFloat('3.5e2x')"), "42350");
        assert_eq!(text("String(parseInt('ff', 16)) + isNaN('abc')"), "255true");
        let r = text("String(Math.random())");
        let r: f64 = r.parse().expect("number");
        assert!((0.0..1.0).contains(&r));
    }

    #[test]
    fn test_json_and_object_helpers() {
        assert_eq!(
            text("JSON.stringify({ b: 1, a: [true, null, undefined], f: () => 1 })"),
            r#"{"b":1,"a":[true,null,null]}"#
        );
        assert_eq!(text("JSON.stringify({ a: 1 }, null, 2)"), "{\n  \"a\": 1\n}");
        assert_eq!(text("JSON.parse('{\"x\": [1, 2]}').x[1] + ''"), "2");
        assert_eq!(
            text("Object.entries({ a: 1, b: 2 }).map(([k, v]) => k + v).join(' ')"),
            "a1 b2"
        );
        assert_eq!(
            text("const o = Object.assign({}, { a: 1 }, { b: 2 }); Object.keys(o).join('')"),
            "ab"
        );
        assert_eq!(
            text("String(Array.from({ length: 3 }, (_, i) => i * i))"),
            "0,1,4"
        );
    }

    #[test]
    fn test_hooks_are_pure_shims() {
        let src = r"
            function App() {
                const [count, setCount] = useState(() => 3);
                const doubled = React.useMemo(() => count * 2, [count]);
                const ref = useRef(null);
                setCount(10);
                useEffect(() => { ref.current = 'effect'; });
                return `${count} ${doubled} ${ref.current}`;
            }
        ";
        assert_eq!(text(src), "3 6 null");
    }

    #[test]
    fn test_create_element() {
        let program = parse_program(
            "React.createElement('p', { className: 'x' }, 'one', React.createElement('b', null, 'two'))",
        )
        .expect("parses");
        let output = run_program(&program, Limits::default()).expect("runs");
        let [Node::Element { tag, children, .. }] = &output.nodes[..] else {
            panic!("{:?}", output.nodes);
        };
        assert_eq!(tag, "p");
        assert_eq!(children.len(), 2);
    }
}
