use std::sync::{Arc, Weak};

use crate::ast::Value;
use crate::env::ScopeRef;
use crate::error::XlispError;
use crate::namespaces::{Environment, NS_OPERATOR};

mod concurrency;
mod core;
mod math;
mod seq;

macro_rules! def_builtin {
    ($env:expr, $name:expr, $arity:expr, |$args:ident| $body:block) => {
        $env.define_builtin(
            $name,
            $crate::ast::Value::native_fn_with_name($name, $arity, move |$args: &[$crate::ast::Value]| -> Result<$crate::ast::Value, $crate::error::XlispError> {
                $body
            }),
        );
    };
    ($env:expr, $name:expr, $arity:expr, |$args:ident| $body:expr) => {
        $env.define_builtin(
            $name,
            $crate::ast::Value::native_fn_with_name($name, $arity, move |$args: &[$crate::ast::Value]| -> Result<$crate::ast::Value, $crate::error::XlispError> {
                $body
            }),
        );
    };
}

/// Like `def_builtin!`, but the body sees raw argument forms and the scope.
macro_rules! def_special {
    ($env:expr, $name:expr, |$args:ident, $scope:ident| $body:block) => {
        $env.define_builtin(
            $name,
            $crate::ast::Value::special_form($name, move |$args: &[$crate::ast::Value], $scope: &$crate::env::ScopeRef| -> Result<$crate::ast::Value, $crate::error::XlispError> {
                $body
            }),
        );
    };
    ($env:expr, $name:expr, |$args:ident, $scope:ident| $body:expr) => {
        $env.define_builtin(
            $name,
            $crate::ast::Value::special_form($name, move |$args: &[$crate::ast::Value], $scope: &$crate::env::ScopeRef| -> Result<$crate::ast::Value, $crate::error::XlispError> {
                $body
            }),
        );
    };
}

pub(crate) use def_builtin;
pub(crate) use def_special;

/// Binds the whole base library into the `core` namespace.
pub fn install_core(env: &Arc<Environment>) {
    install_ns_operator(env);
    core::install(env);
    math::install(env);
    seq::install(env);
    concurrency::install(env);
}

/// Binds only `ns`, the one operator every environment needs.
pub fn install_ns_operator(env: &Arc<Environment>) {
    let weak: Weak<Environment> = Arc::downgrade(env);
    def_special!(env, NS_OPERATOR, |args, scope| {
        let [target] = args else {
            return Err(XlispError::arity(format!(
                "ns expects 1 argument, got {}",
                args.len()
            )));
        };
        let name = namespace_name(target, scope)?;
        let env = weak
            .upgrade()
            .ok_or_else(|| XlispError::runtime("environment is no longer alive"))?;
        env.switch_namespace(&name);
        Ok(Value::symbol(name))
    });
}

fn namespace_name(target: &Value, scope: &ScopeRef) -> Result<String, XlispError> {
    match target {
        Value::Symbol(name) => Ok(name.clone()),
        other => match crate::eval::eval(other, scope)? {
            Value::Symbol(name) | Value::String(name) => Ok(name),
            value => Err(XlispError::type_mismatch("symbol", value.type_name())),
        },
    }
}

pub fn err<T>(msg: impl Into<String>) -> Result<T, XlispError> {
    Err(XlispError::runtime(msg))
}

pub(crate) fn expect_symbol<'a>(form: &'a Value, op: &str) -> Result<&'a str, XlispError> {
    form.as_symbol().ok_or_else(|| {
        XlispError::type_mismatch(format!("symbol for {}", op), form.type_name())
    })
}

pub(crate) fn expect_int(value: &Value, op: &str, idx: usize) -> Result<i64, XlispError> {
    match value {
        Value::Int(n) => Ok(*n),
        other => Err(XlispError::type_mismatch(
            format!("integer for {} (arg {})", op, idx + 1),
            other.type_name(),
        )),
    }
}

/// Items of a list or vector; `nil` reads as empty.
pub(crate) fn seq_items(value: &Value, op: &str) -> Result<Vec<Value>, XlispError> {
    match value {
        Value::List(items) | Value::Vector(items) => Ok(items.iter().cloned().collect()),
        Value::Nil => Ok(Vec::new()),
        other => Err(XlispError::type_mismatch(
            format!("sequence for {}", op),
            other.type_name(),
        )),
    }
}
