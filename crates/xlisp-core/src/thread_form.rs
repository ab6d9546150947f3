use crate::ast::{Value, Vector};
use crate::env::ScopeRef;
use crate::error::XlispError;
use crate::eval::{call_callable, eval};
use crate::namespaces::{BASE_NAMESPACE, NS_SEPARATOR};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThreadStyle {
    First,
    Last,
}

impl ThreadStyle {
    pub fn symbol(self) -> &'static str {
        match self {
            ThreadStyle::First => "->",
            ThreadStyle::Last => "->>",
        }
    }
}

/// The running value of a pipeline: the unevaluated seed, or a step result.
enum Running {
    Form(Value),
    Ready(Value),
}

impl Running {
    fn into_form(self) -> Value {
        match self {
            Running::Form(form) => form,
            Running::Ready(value) => quote_data(value),
        }
    }

    fn into_value(self, scope: &ScopeRef) -> Result<Value, XlispError> {
        match self {
            Running::Form(form) => eval(&form, scope),
            Running::Ready(value) => Ok(value),
        }
    }
}

fn base_symbol(name: &str) -> Value {
    Value::symbol(format!("{}{}{}", BASE_NAMESPACE, NS_SEPARATOR, name))
}

/// Rewrites an evaluated value into a form that evaluates back to it.
fn quote_data(value: Value) -> Value {
    match value {
        Value::List(items) => {
            let mut out = Vector::new();
            out.push_back(base_symbol("list"));
            out.extend(items.into_iter().map(quote_data));
            Value::List(out)
        }
        Value::Vector(items) => Value::Vector(items.into_iter().map(quote_data).collect()),
        Value::Symbol(_) => Value::list(vec![base_symbol("quote"), value]),
        other => other,
    }
}

fn splice(items: &Vector<Value>, arg: Value, style: ThreadStyle) -> Vector<Value> {
    let mut out = items.clone();
    match style {
        ThreadStyle::First => out.insert(1, arg),
        ThreadStyle::Last => out.push_back(arg),
    }
    out
}

fn apply_thread_step(
    step: &Value,
    running: Running,
    scope: &ScopeRef,
    style: ThreadStyle,
) -> Result<Running, XlispError> {
    match step {
        Value::List(items) if !items.is_empty() => {
            let call = splice(items, running.into_form(), style);
            eval(&Value::List(call), scope).map(Running::Ready)
        }
        Value::Symbol(_) => {
            let call = splice(&Vector::unit(step.clone()), running.into_form(), style);
            eval(&Value::List(call), scope).map(Running::Ready)
        }
        callable if callable.is_invokable() => {
            let arg = running.into_value(scope)?;
            call_callable(callable.clone(), vec![arg]).map(Running::Ready)
        }
        other => Err(XlispError::not_invokable(other)),
    }
}

/// `(-> seed form...)` and `(->> seed form...)`.
pub fn eval_thread(
    args: &[Value],
    scope: &ScopeRef,
    style: ThreadStyle,
) -> Result<Value, XlispError> {
    let Some((seed, steps)) = args.split_first().filter(|(_, steps)| !steps.is_empty()) else {
        return Err(XlispError::arity(format!(
            "{} requires a seed and at least one form",
            style.symbol()
        )));
    };
    let mut running = Running::Form(seed.clone());
    for step in steps {
        running = apply_thread_step(step, running, scope, style)?;
    }
    running.into_value(scope)
}
