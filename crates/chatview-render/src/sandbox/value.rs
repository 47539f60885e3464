//! Runtime values and the conversions the operators rely on.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::ast::FunctionDef;
use super::interp::Env;
use crate::chart::ChartKind;

/// Longest string generated code may build.
pub const MAX_STRING_LEN: usize = 1_000_000;

#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Num(f64),
    Str(Rc<str>),
    Array(Rc<RefCell<Vec<Value>>>),
    Object(Rc<RefCell<Object>>),
    Function(Rc<Closure>),
    Builtin(Rc<Builtin>),
    Element(Rc<Element>),
    Host(Host),
}

/// Insertion-ordered property bag.
#[derive(Clone, Default)]
pub struct Object {
    entries: Vec<(String, Value)>,
}

impl Object {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.iter().map(|(k, _)| k)
    }
}

pub struct Closure {
    pub def: Rc<FunctionDef>,
    pub env: Env,
}

/// Host-implemented function.
pub enum Builtin {
    /// Global (`ns` empty) or namespaced function such as `Math.max`.
    Function {
        ns: &'static str,
        name: &'static str,
    },
    /// Method bound to its receiver, such as `[1, 2].map`.
    Method { this: Value, name: &'static str },
    /// State setters and console output; calling does nothing.
    Noop,
}

/// A JSX element before it is resolved into output nodes.
pub struct Element {
    pub kind: ElementKind,
    pub props: Object,
    pub children: Vec<Value>,
}

pub enum ElementKind {
    /// Lowercase HTML-ish tag.
    Intrinsic(String),
    /// User-defined function component.
    Component(Value),
    /// Capitalized name with no binding; an error once rendered.
    Unresolved(String),
    /// Bound to something that cannot render; an error once rendered.
    Invalid(String),
    Fragment,
    /// Renders its children unchanged (`ResponsiveContainer`).
    Passthrough,
    Chart(Option<ChartKind>),
    /// Series/axis declaration read by an enclosing chart (`<Bar dataKey>`).
    ChartPart(&'static str),
}

/// Capabilities and namespaces injected by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Host {
    /// The message's drawing surface.
    Canvas,
    /// `Chart`: constructor and generic chart component.
    ChartCtor,
    ChartComponent(ChartKind),
    ChartPart(&'static str),
    Passthrough,
    Fragment,
    /// Chart drawn by `new Chart(..)`, by index.
    ChartInstance(usize),
    Namespace(&'static str),
}

impl Value {
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Rc::from(s.as_ref()))
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(items)))
    }

    pub fn object(object: Object) -> Self {
        Value::Object(Rc::new(RefCell::new(object)))
    }

    pub fn builtin(builtin: Builtin) -> Self {
        Value::Builtin(Rc::new(builtin))
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Function(_)
                | Value::Builtin(_)
                | Value::Host(Host::Namespace(
                    "Array" | "Boolean" | "Error" | "Number" | "Object" | "String"
                ))
        )
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Str(s) => !s.is_empty(),
            _ => true,
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Num(_) => "number",
            Value::Str(_) => "string",
            Value::Host(Host::ChartCtor | Host::ChartComponent(_) | Host::ChartPart(_)) => {
                "function"
            }
            _ if self.is_callable() => "function",
            _ => "object",
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Num(n) => *n,
            Value::Str(s) => string_to_number(s),
            Value::Array(items) => {
                let items = items.borrow();
                match items.as_slice() {
                    [] => 0.0,
                    [only] => only.to_number(),
                    _ => f64::NAN,
                }
            }
            _ => f64::NAN,
        }
    }

    /// `String(value)`.
    ///
    /// Stops writing once the text passes `MAX_STRING_LEN`; callers that
    /// keep the result check its length. An array that contains itself
    /// displays the inner reference as empty.
    pub fn to_display(&self) -> String {
        let mut out = String::new();
        self.write_display(&mut out, &mut Vec::new());
        out
    }

    fn write_display(&self, out: &mut String, open: &mut Vec<*const RefCell<Vec<Value>>>) {
        match self {
            Value::Undefined => out.push_str("undefined"),
            Value::Null => out.push_str("null"),
            Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Value::Num(n) => out.push_str(&format_number(*n)),
            Value::Str(s) => out.push_str(s),
            Value::Array(items) => {
                let ptr = Rc::as_ptr(items);
                if open.contains(&ptr) {
                    return;
                }
                open.push(ptr);
                for (i, item) in items.borrow().iter().enumerate() {
                    if out.len() > MAX_STRING_LEN {
                        break;
                    }
                    if i > 0 {
                        out.push(',');
                    }
                    if !item.is_nullish() {
                        item.write_display(out, open);
                    }
                }
                open.pop();
            }
            Value::Function(_) | Value::Builtin(_) => {
                out.push_str("function () { [native code] }");
            }
            Value::Object(_) | Value::Element(_) | Value::Host(_) => {
                out.push_str("[object Object]");
            }
        }
    }

    /// Key used when the value indexes an object or array.
    pub fn to_property_key(&self) -> String {
        self.to_display()
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Array(items) => f.debug_list().entries(items.borrow().iter()).finish(),
            Value::Object(obj) => f
                .debug_map()
                .entries(obj.borrow().iter())
                .finish(),
            Value::Function(_) | Value::Builtin(_) => f.write_str("[function]"),
            Value::Element(_) => f.write_str("[element]"),
            Value::Host(host) => write!(f, "{host:?}"),
            other => f.write_str(&other.to_display()),
        }
    }
}

fn string_to_number(s: &str) -> f64 {
    let s = s.trim();
    if s.is_empty() {
        return 0.0;
    }
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        return u64::from_str_radix(hex, 16).map_or(f64::NAN, |n| n as f64);
    }
    match s {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        // Rust accepts spellings JavaScript does not.
        _ if s.chars().any(|c| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => f64::NAN,
        _ => s.parse().unwrap_or(f64::NAN),
    }
}

/// Number to string the way JavaScript prints it.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return "0".to_string();
    }
    let abs = n.abs();
    if n.fract() == 0.0 && abs < 1e21 {
        return format!("{n:.0}");
    }
    if !(1e-6..1e21).contains(&abs) {
        let formatted = format!("{n:e}");
        return match formatted.split_once('e') {
            Some((mantissa, exp)) if !exp.starts_with('-') => format!("{mantissa}e+{exp}"),
            _ => formatted,
        };
    }
    format!("{n}")
}

pub fn strict_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        #[allow(clippy::float_cmp)]
        (Value::Num(x), Value::Num(y)) => x == y,
        (Value::Str(x), Value::Str(y)) => x == y,
        (Value::Array(x), Value::Array(y)) => Rc::ptr_eq(x, y),
        (Value::Object(x), Value::Object(y)) => Rc::ptr_eq(x, y),
        (Value::Function(x), Value::Function(y)) => Rc::ptr_eq(x, y),
        (Value::Builtin(x), Value::Builtin(y)) => Rc::ptr_eq(x, y),
        (Value::Element(x), Value::Element(y)) => Rc::ptr_eq(x, y),
        (Value::Host(x), Value::Host(y)) => x == y,
        _ => false,
    }
}

/// `==`: nullish values equal each other; primitives compare as numbers.
pub fn loose_equals(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (x, y) if x.is_nullish() || y.is_nullish() => x.is_nullish() && y.is_nullish(),
        (Value::Num(_) | Value::Bool(_), Value::Str(_) | Value::Bool(_))
        | (Value::Str(_) | Value::Bool(_), Value::Num(_) | Value::Bool(_)) => {
            #[allow(clippy::float_cmp)]
            let equal = a.to_number() == b.to_number();
            equal
        }
        _ => strict_equals(a, b),
    }
}

/// `includes` equality: like `===` but NaN matches NaN.
pub fn same_value_zero(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Num(x), Value::Num(y)) if x.is_nan() && y.is_nan() => true,
        _ => strict_equals(a, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number_matches_js() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(-0.0), "0");
        assert_eq!(format_number(0.1 + 0.2), "0.30000000000000004");
        assert_eq!(format_number(1.5e-7), "1.5e-7");
        assert_eq!(format_number(1e21), "1e+21");
        assert_eq!(format_number(123_456_789.0), "123456789");
        assert_eq!(format_number(f64::NAN), "NaN");
        assert_eq!(format_number(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_to_number() {
        assert_eq!(Value::str(" 42 ").to_number(), 42.0);
        assert_eq!(Value::str("").to_number(), 0.0);
        assert_eq!(Value::str("0x10").to_number(), 16.0);
        assert!(Value::str("12px").to_number().is_nan());
        assert!(Value::str("inf").to_number().is_nan());
        assert_eq!(Value::Null.to_number(), 0.0);
        assert!(Value::Undefined.to_number().is_nan());
        assert_eq!(Value::array(vec![Value::Num(7.0)]).to_number(), 7.0);
    }

    #[test]
    fn test_display_and_truthiness() {
        let arr = Value::array(vec![Value::Num(1.0), Value::Null, Value::str("x")]);
        assert_eq!(arr.to_display(), "1,,x");
        assert_eq!(Value::object(Object::default()).to_display(), "[object Object]");
        assert!(!Value::str("").truthy());
        assert!(!Value::Num(f64::NAN).truthy());
        assert!(Value::array(Vec::new()).truthy());
    }

    #[test]
    fn test_display_of_cyclic_and_huge_arrays() {
        let arr = Value::array(vec![Value::Num(1.0)]);
        if let Value::Array(items) = &arr {
            items.borrow_mut().push(arr.clone());
        }
        assert_eq!(arr.to_display(), "1,");

        let chunk = Value::str("x".repeat(1000));
        let big = Value::array(vec![chunk; 1_000_000]);
        let text = big.to_display();
        assert!(text.len() > MAX_STRING_LEN);
        assert!(text.len() < MAX_STRING_LEN + 2000);
    }

    #[test]
    fn test_equality() {
        assert!(loose_equals(&Value::Null, &Value::Undefined));
        assert!(!strict_equals(&Value::Null, &Value::Undefined));
        assert!(loose_equals(&Value::Num(1.0), &Value::str("1")));
        assert!(!strict_equals(&Value::Num(1.0), &Value::str("1")));
        assert!(!strict_equals(&Value::Num(f64::NAN), &Value::Num(f64::NAN)));
        assert!(same_value_zero(&Value::Num(f64::NAN), &Value::Num(f64::NAN)));

        let a = Value::array(Vec::new());
        assert!(strict_equals(&a, &a.clone()));
        assert!(!strict_equals(&a, &Value::array(Vec::new())));
    }

    #[test]
    fn test_object_keeps_insertion_order() {
        let mut obj = Object::default();
        obj.set("b", Value::Num(1.0));
        obj.set("a", Value::Num(2.0));
        obj.set("b", Value::Num(3.0));
        let keys: Vec<_> = obj.keys().cloned().collect();
        assert_eq!(keys, ["b", "a"]);
        assert!(matches!(obj.get("b"), Some(Value::Num(n)) if *n == 3.0));
    }
}
