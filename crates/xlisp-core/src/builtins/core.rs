use std::sync::Arc;
use std::time::Instant;

use log::info;

use crate::ast::{FnArity, Lambda, Value};
use crate::builtins::{def_builtin, def_special, expect_symbol, seq_items};
use crate::case_form::eval_case;
use crate::env::{root_scope, LocalEnv, ScopeRef};
use crate::error::XlispError;
use crate::eval::{eval, eval_body, macroexpand};
use crate::loop_form::{eval_loop, eval_recur};
use crate::namespaces::{Environment, UNSAFE_NAMESPACE};
use crate::thread_form::{eval_thread, ThreadStyle};

pub(crate) fn install(env: &Environment) {
    // --- Evaluation ---
    def_special!(env, "quote", |args, _scope| {
        match args {
            [form] => Ok(form.clone()),
            _ => Err(XlispError::arity(format!(
                "quote expects 1 argument, got {}",
                args.len()
            ))),
        }
    });
    def_special!(env, "do", |args, scope| eval_body(args, scope));
    def_special!(env, "if", |args, scope| {
        let (test, then, otherwise) = match args {
            [test, then] => (test, then, None),
            [test, then, otherwise] => (test, then, Some(otherwise)),
            _ => {
                return Err(XlispError::arity(format!(
                    "if expects 2 or 3 arguments, got {}",
                    args.len()
                )))
            }
        };
        if eval(test, scope)?.truthy() {
            eval(then, scope)
        } else {
            otherwise.map_or(Ok(Value::Nil), |form| eval(form, scope))
        }
    });
    def_special!(env, "def", |args, scope| {
        let [name, value_form] = args else {
            return Err(XlispError::arity(format!(
                "def expects 2 arguments, got {}",
                args.len()
            )));
        };
        let name = expect_symbol(name, "def")?;
        let value = match eval(value_form, scope)? {
            Value::Lambda(lambda) if lambda.name.is_none() => {
                Value::Lambda(Arc::new(named_lambda(&lambda, name)))
            }
            other => other,
        };
        root_scope(scope).bind(name, value.clone())?;
        Ok(value)
    });
    def_special!(env, "eval", |args, scope| {
        let [form] = args else {
            return Err(XlispError::arity(format!(
                "eval expects 1 argument, got {}",
                args.len()
            )));
        };
        let code = eval(form, scope)?;
        eval(&code, scope)
    });
    def_special!(env, "macroexpand", |args, scope| {
        let [form] = args else {
            return Err(XlispError::arity(format!(
                "macroexpand expects 1 argument, got {}",
                args.len()
            )));
        };
        let code = eval(form, scope)?;
        macroexpand(&code, scope).map(|(expanded, _)| expanded)
    });
    def_special!(env, "bound?", |args, scope| {
        let [form] = args else {
            return Err(XlispError::arity(format!(
                "bound? expects 1 argument, got {}",
                args.len()
            )));
        };
        let name = expect_symbol(form, "bound?")?;
        Ok(Value::Bool(scope.resolve(name).is_ok()))
    });
    def_special!(env, "resolve", |args, scope| {
        let [form] = args else {
            return Err(XlispError::arity(format!(
                "resolve expects 1 argument, got {}",
                args.len()
            )));
        };
        let target = eval(form, scope)?;
        let name = expect_symbol(&target, "resolve")?;
        Ok(scope.resolve(name).unwrap_or(Value::Nil))
    });
    env.define_in(
        UNSAFE_NAMESPACE,
        "mutate",
        Value::special_form("unsafe/mutate", eval_mutate),
    );

    // --- Functions and bindings ---
    for name in ["fn", "fn*"] {
        def_special!(env, name, |args, scope| {
            make_lambda("fn", args, scope).map(|lambda| Value::Lambda(Arc::new(lambda)))
        });
    }
    for name in ["macro", "macro*"] {
        def_special!(env, name, |args, scope| {
            make_lambda("macro", args, scope).map(|lambda| Value::Macro(Arc::new(lambda)))
        });
    }
    for name in ["let", "let*"] {
        def_special!(env, name, |args, scope| eval_let(args, scope));
    }

    // --- Control constructs ---
    def_special!(env, "loop", |args, scope| eval_loop(args, scope));
    def_special!(env, "recur", |args, scope| eval_recur(args, scope));
    def_special!(env, "->", |args, scope| eval_thread(args, scope, ThreadStyle::First));
    def_special!(env, "->>", |args, scope| eval_thread(args, scope, ThreadStyle::Last));
    def_special!(env, "case", |args, scope| eval_case(args, scope));
    def_special!(env, "doseq", |args, scope| eval_doseq(args, scope));
    def_special!(env, "and", |args, scope| {
        for form in args {
            if !eval(form, scope)?.truthy() {
                return Ok(Value::Bool(false));
            }
        }
        Ok(Value::Bool(true))
    });
    def_special!(env, "or", |args, scope| {
        for form in args {
            if eval(form, scope)?.truthy() {
                return Ok(Value::Bool(true));
            }
        }
        Ok(Value::Bool(false))
    });
    def_special!(env, "time", |args, scope| {
        let started = Instant::now();
        let result = eval_body(args, scope)?;
        info!("elapsed time: {:?}", started.elapsed());
        Ok(result)
    });

    // --- Misc ---
    def_builtin!(env, "throw", FnArity::at_least(0), |args| {
        Err(XlispError::thrown(display_concat(args)))
    });
    def_builtin!(env, "str", FnArity::at_least(0), |args| {
        Ok(Value::String(display_concat(args)))
    });
    def_builtin!(env, "type", FnArity::exact(1), |args| {
        Ok(Value::String(args[0].type_name().to_string()))
    });
    def_builtin!(env, "not", FnArity::exact(1), |args| {
        Ok(Value::Bool(!args[0].truthy()))
    });
    def_builtin!(env, "nil?", FnArity::exact(1), |args| {
        Ok(Value::Bool(matches!(args[0], Value::Nil)))
    });
    def_builtin!(env, "realize", FnArity::exact(1), |args| {
        Ok(Value::list(seq_items(&args[0], "realize")?))
    });
}

/// Concatenates printed forms, with strings unquoted and `nil` empty.
fn display_concat(args: &[Value]) -> String {
    let mut out = String::new();
    for arg in args {
        match arg {
            Value::String(s) => out.push_str(s),
            Value::Nil => {}
            other => out.push_str(&other.to_string()),
        }
    }
    out
}

fn named_lambda(lambda: &Lambda, name: &str) -> Lambda {
    Lambda {
        params: lambda.params.clone(),
        rest: lambda.rest.clone(),
        body: lambda.body.clone(),
        env: lambda.env.clone(),
        name: Some(name.to_string()),
    }
}

fn parse_params(form: &Value, op: &str) -> Result<(Vec<String>, Option<String>), XlispError> {
    let Value::Vector(items) = form else {
        return Err(XlispError::binding(format!(
            "{} parameters must be a vector, not {}",
            op,
            form.type_name()
        )));
    };
    let mut params = Vec::new();
    let mut iter = items.iter();
    while let Some(item) = iter.next() {
        let name = item.as_symbol().ok_or_else(|| {
            XlispError::binding(format!(
                "{} parameter must be a symbol, not {}",
                op,
                item.type_name()
            ))
        })?;
        if name == "&" {
            let rest = iter.next().and_then(Value::as_symbol).ok_or_else(|| {
                XlispError::binding(format!("{} expects one symbol after &", op))
            })?;
            if iter.next().is_some() {
                return Err(XlispError::binding(format!(
                    "{} expects exactly one symbol after &",
                    op
                )));
            }
            return Ok((params, Some(rest.to_string())));
        }
        params.push(name.to_string());
    }
    Ok((params, None))
}

/// `(fn name? [params] body...)`.
fn make_lambda(op: &str, args: &[Value], scope: &ScopeRef) -> Result<Lambda, XlispError> {
    let (name, rest) = match args.split_first() {
        Some((Value::Symbol(name), rest)) => (Some(name.clone()), rest),
        _ => (None, args),
    };
    let Some((params_form, body)) = rest.split_first() else {
        return Err(XlispError::arity(format!(
            "{} expects a parameter vector",
            op
        )));
    };
    let (params, rest) = parse_params(params_form, op)?;
    Ok(Lambda {
        params,
        rest,
        body: body.to_vec(),
        env: scope.clone(),
        name,
    })
}

fn binding_pairs(form: &Value, op: &str) -> Result<Vec<(String, Value)>, XlispError> {
    let Value::Vector(items) = form else {
        return Err(XlispError::binding(format!(
            "{} bindings must be a vector, not {}",
            op,
            form.type_name()
        )));
    };
    if items.len() % 2 != 0 {
        return Err(XlispError::binding(format!(
            "{} bindings must contain an even number of forms",
            op
        )));
    }
    let items: Vec<Value> = items.iter().cloned().collect();
    items
        .chunks(2)
        .map(|pair| {
            let name = pair[0].as_symbol().ok_or_else(|| {
                XlispError::binding(format!(
                    "{} binding name must be a symbol, not {}",
                    op,
                    pair[0].type_name()
                ))
            })?;
            Ok((name.to_string(), pair[1].clone()))
        })
        .collect()
}

fn eval_let(args: &[Value], scope: &ScopeRef) -> Result<Value, XlispError> {
    let Some((bindings, body)) = args.split_first() else {
        return Err(XlispError::arity("let expects a binding vector"));
    };
    let frame = Arc::new(LocalEnv::new_child(scope.clone()));
    let frame_scope: ScopeRef = frame.clone();
    for (name, init) in binding_pairs(bindings, "let")? {
        let value = eval(&init, &frame_scope)?;
        frame.set(&name, value);
    }
    eval_body(body, &frame_scope)
}

/// `(unsafe/mutate sym expr)`: rebinds `sym` in the nearest frame.
fn eval_mutate(args: &[Value], scope: &ScopeRef) -> Result<Value, XlispError> {
    let [target, value_form] = args else {
        return Err(XlispError::arity(format!(
            "unsafe/mutate expects 2 arguments, got {}",
            args.len()
        )));
    };
    let name = expect_symbol(target, "unsafe/mutate")?;
    let value = eval(value_form, scope)?;
    scope.bind(name, value.clone())?;
    Ok(value)
}

/// `(doseq [x coll] body...)`: returns the last body value, `nil` if `coll` is empty.
fn eval_doseq(args: &[Value], scope: &ScopeRef) -> Result<Value, XlispError> {
    let Some((bindings, body)) = args.split_first() else {
        return Err(XlispError::arity("doseq expects a binding vector"));
    };
    let pairs = binding_pairs(bindings, "doseq")?;
    let [(name, coll_form)] = pairs.as_slice() else {
        return Err(XlispError::binding("doseq expects exactly one binding pair"));
    };
    let items = seq_items(&eval(coll_form, scope)?, "doseq")?;
    let mut result = Value::Nil;
    for item in items {
        let frame = Arc::new(LocalEnv::new_child(scope.clone()));
        frame.set(name, item);
        let frame_scope: ScopeRef = frame;
        result = eval_body(body, &frame_scope)?;
    }
    Ok(result)
}
