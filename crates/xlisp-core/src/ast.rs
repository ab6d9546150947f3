use std::fmt;
use std::sync::Arc;

use crate::concurrency::{AtomHandle, FutureHandle};
use crate::env::ScopeRef;
use crate::error::XlispError;
pub use im::Vector;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FnArity {
    min: usize,
    max: Option<usize>,
}

impl FnArity {
    pub fn new(min: usize, max: Option<usize>) -> Self {
        if let Some(max_val) = max {
            assert!(min <= max_val, "min arity cannot exceed max arity");
        }
        Self { min, max }
    }

    pub fn exact(count: usize) -> Self {
        Self::new(count, Some(count))
    }

    pub fn at_least(min: usize) -> Self {
        Self::new(min, None)
    }

    pub fn range(min: usize, max: usize) -> Self {
        Self::new(min, Some(max))
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min && self.max.map_or(true, |max| count <= max)
    }
}

impl fmt::Display for FnArity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{}", self.min),
            Some(max) => write!(f, "{} to {}", self.min, max),
            None => write!(f, "at least {}", self.min),
        }
    }
}

pub struct NativeFn {
    func: Box<dyn Fn(&[Value]) -> Result<Value, XlispError> + Send + Sync>,
    arity: FnArity,
    debug_name: Option<Arc<str>>,
}

impl NativeFn {
    pub fn new(
        arity: FnArity,
        func: impl Fn(&[Value]) -> Result<Value, XlispError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            func: Box::new(func),
            arity,
            debug_name: None,
        }
    }

    pub fn with_name(
        arity: FnArity,
        name: impl Into<String>,
        func: impl Fn(&[Value]) -> Result<Value, XlispError> + Send + Sync + 'static,
    ) -> Self {
        let mut nf = Self::new(arity, func);
        nf.debug_name = Some(name.into().into());
        nf
    }

    pub fn call(&self, args: &[Value]) -> Result<Value, XlispError> {
        (self.func)(args)
    }

    pub fn arity(&self) -> FnArity {
        self.arity
    }

    pub fn debug_name(&self) -> Option<&str> {
        self.debug_name.as_deref()
    }
}

type SpecialFn = dyn Fn(&[Value], &ScopeRef) -> Result<Value, XlispError> + Send + Sync;

/// A form that receives its arguments unevaluated together with the calling scope.
pub struct SpecialForm {
    name: Arc<str>,
    func: Box<SpecialFn>,
}

impl SpecialForm {
    pub fn new(
        name: impl Into<String>,
        func: impl Fn(&[Value], &ScopeRef) -> Result<Value, XlispError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into().into(),
            func: Box::new(func),
        }
    }

    pub fn call(&self, args: &[Value], scope: &ScopeRef) -> Result<Value, XlispError> {
        (self.func)(args, scope)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

pub struct Lambda {
    pub params: Vec<String>,
    pub rest: Option<String>,
    pub body: Vec<Value>,
    pub env: ScopeRef,
    pub name: Option<String>,
}

impl Lambda {
    pub fn arity(&self) -> FnArity {
        if self.rest.is_some() {
            FnArity::at_least(self.params.len())
        } else {
            FnArity::exact(self.params.len())
        }
    }

    /// Number of slots a `recur` targeting this lambda must fill.
    pub fn recur_arity(&self) -> usize {
        self.params.len() + usize::from(self.rest.is_some())
    }
}

#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Symbol(String),
    Keyword(String),
    List(Vector<Value>),
    Vector(Vector<Value>),
    Func(Arc<NativeFn>),
    Lambda(Arc<Lambda>),
    Macro(Arc<Lambda>),
    Special(Arc<SpecialForm>),
    Atom(AtomHandle),
    Future(FutureHandle),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int(_) | Value::Float(_) => "number",
            Value::String(_) => "str",
            Value::Symbol(_) => "symbol",
            Value::Keyword(_) => "keyword",
            Value::List(_) => "list",
            Value::Vector(_) => "vector",
            Value::Func(_) | Value::Lambda(_) => "function",
            Value::Macro(_) => "macro",
            Value::Special(_) => "special-form",
            Value::Atom(_) => "atom",
            Value::Future(_) => "future",
        }
    }

    pub fn native_fn_with_name(
        name: impl Into<String>,
        arity: FnArity,
        func: impl Fn(&[Value]) -> Result<Value, XlispError> + Send + Sync + 'static,
    ) -> Self {
        Value::Func(Arc::new(NativeFn::with_name(arity, name, func)))
    }

    pub fn special_form(
        name: impl Into<String>,
        func: impl Fn(&[Value], &ScopeRef) -> Result<Value, XlispError> + Send + Sync + 'static,
    ) -> Self {
        Value::Special(Arc::new(SpecialForm::new(name, func)))
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Value::Symbol(name.into())
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(items.into_iter().collect())
    }

    pub fn as_symbol(&self) -> Option<&str> {
        match self {
            Value::Symbol(name) => Some(name),
            _ => None,
        }
    }

    /// True for values that can be applied to already-evaluated arguments.
    pub fn is_invokable(&self) -> bool {
        matches!(self, Value::Func(_) | Value::Lambda(_))
    }

    pub fn truthy(&self) -> bool {
        !matches!(self, Value::Nil | Value::Bool(false))
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Keyword(a), Value::Keyword(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Vector(a), Value::Vector(b)) => a == b,
            (Value::Func(a), Value::Func(b)) => Arc::ptr_eq(a, b),
            (Value::Lambda(a), Value::Lambda(b)) => Arc::ptr_eq(a, b),
            (Value::Macro(a), Value::Macro(b)) => Arc::ptr_eq(a, b),
            (Value::Special(a), Value::Special(b)) => Arc::ptr_eq(a, b),
            (Value::Atom(a), Value::Atom(b)) => a.ptr_eq(b),
            (Value::Future(a), Value::Future(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

fn format_float(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 {
        format!("{:.1}", n)
    } else {
        n.to_string()
    }
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out
}

fn format_callable(kind: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("#<{} {}>", kind, name),
        None => format!("#<{}>", kind),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", format_float(*n)),
            Value::String(s) => write!(f, "\"{}\"", escape_string(s)),
            Value::Symbol(s) => write!(f, "{}", s),
            Value::Keyword(k) => write!(f, ":{}", k),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "({})", parts.join(" "))
            }
            Value::Vector(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "[{}]", parts.join(" "))
            }
            Value::Func(func) => write!(f, "{}", format_callable("fn", func.debug_name())),
            Value::Lambda(lambda) => write!(f, "{}", format_callable("fn", lambda.name.as_deref())),
            Value::Macro(lambda) => {
                write!(f, "{}", format_callable("macro", lambda.name.as_deref()))
            }
            Value::Special(form) => write!(f, "{}", format_callable("special", Some(form.name()))),
            Value::Atom(handle) => write!(f, "#atom<{}>", handle.deref()),
            Value::Future(handle) => {
                let state = if handle.is_realized() {
                    "realized"
                } else {
                    "pending"
                };
                write!(f, "#<future {} {}>", handle.id(), state)
            }
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
