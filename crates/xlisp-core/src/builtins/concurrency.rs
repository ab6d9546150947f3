use std::thread;
use std::time::Duration;

use crate::ast::{FnArity, Value};
use crate::builtins::{def_builtin, def_special, err, expect_int};
use crate::concurrency::{spawn_future, AtomHandle};
use crate::env::ScopeRef;
use crate::error::XlispError;
use crate::eval::eval;
use crate::namespaces::Environment;

/// Evaluates a `swap!` operand, reporting any failure as a resolution error.
fn resolve_operand(form: &Value, scope: &ScopeRef) -> Result<Value, XlispError> {
    eval(form, scope)
        .map_err(|e| XlispError::unresolved(format!("unable to resolve {}: {}", form, e)))
}

fn eval_swap(args: &[Value], scope: &ScopeRef) -> Result<Value, XlispError> {
    let [atom_form, func_form, extra_forms @ ..] = args else {
        return Err(XlispError::arity(format!(
            "swap! expects at least 2 arguments, got {}",
            args.len()
        )));
    };
    let atom = match resolve_operand(atom_form, scope)? {
        Value::Atom(handle) => handle,
        other => {
            return Err(XlispError::unresolved(format!(
                "{} does not resolve to an atom (got {})",
                atom_form,
                other.type_name()
            )))
        }
    };
    let func = resolve_operand(func_form, scope)?;
    if !func.is_invokable() {
        return Err(XlispError::unresolved(format!(
            "{} does not resolve to a function (got {})",
            func_form,
            func.type_name()
        )));
    }
    let extras = extra_forms
        .iter()
        .map(|form| eval(form, scope))
        .collect::<Result<Vec<_>, _>>()?;
    atom.update_state(func, extras)
}

fn eval_deref(args: &[Value], scope: &ScopeRef) -> Result<Value, XlispError> {
    let [form] = args else {
        return Err(XlispError::arity(format!(
            "deref expects 1 argument, got {}",
            args.len()
        )));
    };
    let bound_symbol = match form {
        Value::Symbol(name) => name.clone(),
        other => other.to_string(),
    };
    match eval(form, scope)? {
        Value::Future(handle) => handle.deref(scope, &bound_symbol),
        Value::Atom(handle) => Ok(handle.deref()),
        other => Err(XlispError::type_mismatch("future or atom", other.type_name())),
    }
}

pub(crate) fn install(env: &Environment) {
    // --- Atoms ---
    def_builtin!(env, "atom", FnArity::exact(1), |args| {
        Ok(Value::Atom(AtomHandle::new(args[0].clone())))
    });
    def_builtin!(env, "atom?", FnArity::exact(1), |args| {
        Ok(Value::Bool(matches!(args[0], Value::Atom(_))))
    });
    def_special!(env, "swap!", |args, scope| eval_swap(args, scope));

    // --- Futures ---
    def_special!(env, "future", |args, scope| {
        let [expr] = args else {
            return Err(XlispError::arity(format!(
                "future expects 1 argument, got {}",
                args.len()
            )));
        };
        spawn_future(expr.clone(), scope.clone()).map(Value::Future)
    });
    def_builtin!(env, "future?", FnArity::exact(1), |args| {
        Ok(Value::Bool(matches!(args[0], Value::Future(_))))
    });
    def_builtin!(env, "future-realized?", FnArity::exact(1), |args| {
        match &args[0] {
            Value::Future(handle) => Ok(Value::Bool(handle.is_realized())),
            other => Err(XlispError::type_mismatch("future", other.type_name())),
        }
    });
    def_special!(env, "deref", |args, scope| eval_deref(args, scope));

    def_builtin!(env, "sleep", FnArity::exact(1), |args| {
        let ms = expect_int(&args[0], "sleep", 0)?;
        if ms < 0 {
            return err(format!("sleep expects a non-negative duration, got {}", ms));
        }
        thread::sleep(Duration::from_millis(ms as u64));
        Ok(Value::Nil)
    });
}
