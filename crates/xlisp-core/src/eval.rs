use std::sync::Arc;

use crate::ast::{Lambda, Value, Vector};
use crate::env::{LocalEnv, ScopeRef};
use crate::error::XlispError;
use crate::loop_form::{push_recur_target, RecurKind};

pub fn eval(form: &Value, scope: &ScopeRef) -> Result<Value, XlispError> {
    match form {
        Value::Symbol(name) => scope.resolve(name),
        Value::List(items) => eval_call(items, scope),
        Value::Vector(items) => items
            .iter()
            .map(|item| eval(item, scope))
            .collect::<Result<Vector<_>, _>>()
            .map(Value::Vector),
        other => Ok(other.clone()),
    }
}

/// Evaluates forms in order and returns the last value, `nil` when empty.
pub fn eval_body(forms: &[Value], scope: &ScopeRef) -> Result<Value, XlispError> {
    let mut result = Value::Nil;
    for form in forms {
        result = eval(form, scope)?;
    }
    Ok(result)
}

fn eval_call(items: &Vector<Value>, scope: &ScopeRef) -> Result<Value, XlispError> {
    let Some(head_form) = items.front() else {
        return Ok(Value::List(Vector::new()));
    };
    let head = eval(head_form, scope)?;
    let args: Vec<Value> = items.iter().skip(1).cloned().collect();
    match head {
        Value::Special(form) => form.call(&args, scope),
        Value::Macro(mac) => {
            let expansion = apply_lambda(&mac, args)?;
            eval(&expansion, scope)
        }
        callable => {
            let evaluated = args
                .iter()
                .map(|arg| eval(arg, scope))
                .collect::<Result<Vec<_>, _>>()?;
            call_callable(callable, evaluated)
        }
    }
}

/// Expands `form` once if its head names a macro.
pub fn macroexpand(form: &Value, scope: &ScopeRef) -> Result<(Value, bool), XlispError> {
    let Value::List(items) = form else {
        return Ok((form.clone(), false));
    };
    let Some(Value::Symbol(head)) = items.front() else {
        return Ok((form.clone(), false));
    };
    match scope.resolve(head) {
        Ok(Value::Macro(mac)) => {
            let args: Vec<Value> = items.iter().skip(1).cloned().collect();
            Ok((apply_lambda(&mac, args)?, true))
        }
        _ => Ok((form.clone(), false)),
    }
}

pub fn call_callable(callable: Value, args: Vec<Value>) -> Result<Value, XlispError> {
    match callable {
        Value::Func(func) => {
            if !func.arity().accepts(args.len()) {
                return Err(XlispError::arity(format!(
                    "{} expects {} argument(s), got {}",
                    func.debug_name().unwrap_or("fn"),
                    func.arity(),
                    args.len()
                )));
            }
            func.call(&args)
        }
        Value::Lambda(lambda) => apply_lambda(&lambda, args),
        other => Err(XlispError::not_invokable(&other)),
    }
}

fn lambda_label(lambda: &Lambda) -> String {
    lambda.name.clone().unwrap_or_else(|| "fn".into())
}

fn bind_params(frame: &LocalEnv, lambda: &Lambda, mut args: Vec<Value>) {
    let rest: Vector<Value> = if args.len() > lambda.params.len() {
        args.split_off(lambda.params.len()).into_iter().collect()
    } else {
        Vector::new()
    };
    for (param, value) in lambda.params.iter().zip(args) {
        frame.set(param, value);
    }
    if let Some(rest_name) = &lambda.rest {
        frame.set(rest_name, Value::List(rest));
    }
}

/// Calls a lambda (or expands a macro) with `recur` re-entering the body.
fn apply_lambda(lambda: &Arc<Lambda>, args: Vec<Value>) -> Result<Value, XlispError> {
    if !lambda.arity().accepts(args.len()) {
        return Err(XlispError::arity(format!(
            "{} expects {} argument(s), got {}",
            lambda_label(lambda),
            lambda.arity(),
            args.len()
        )));
    }
    let frame = Arc::new(LocalEnv::new_child(lambda.env.clone()));
    let frame_scope: ScopeRef = frame.clone();
    bind_params(&frame, lambda, args);
    let guard = push_recur_target(
        RecurKind::Function,
        lambda.recur_arity(),
        lambda.name.clone(),
    );
    loop {
        match eval_body(&lambda.body, &frame_scope) {
            Err(XlispError::RecurSignal { target, values }) if target == guard.id() => {
                let mut values = values.into_iter();
                for param in &lambda.params {
                    frame.set(param, values.next().unwrap_or(Value::Nil));
                }
                if let Some(rest_name) = &lambda.rest {
                    frame.set(rest_name, values.next().unwrap_or(Value::Nil));
                }
            }
            other => return other,
        }
    }
}
