use crate::ast::{FnArity, Value};
use crate::builtins::{def_builtin, err, expect_int};
use crate::error::XlispError;
use crate::namespaces::Environment;

#[derive(Clone, Copy, Debug)]
enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    fn as_f64(self) -> f64 {
        match self {
            Num::Int(n) => n as f64,
            Num::Float(f) => f,
        }
    }

    fn into_value(self) -> Value {
        match self {
            Num::Int(n) => Value::Int(n),
            Num::Float(f) => Value::Float(f),
        }
    }
}

fn as_number(value: &Value, op: &str, idx: usize) -> Result<Num, XlispError> {
    match value {
        Value::Int(n) => Ok(Num::Int(*n)),
        Value::Float(f) => Ok(Num::Float(*f)),
        other => Err(XlispError::type_mismatch(
            format!("number for {} (arg {})", op, idx + 1),
            other.type_name(),
        )),
    }
}

fn overflow(op: &str) -> XlispError {
    XlispError::runtime(format!("integer overflow in {}", op))
}

/// Folds `args` left to right, staying in integers until a float shows up.
fn arith(
    op: &str,
    args: &[Value],
    identity: i64,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, XlispError> {
    let mut iter = args.iter().enumerate();
    let mut acc = match iter.next() {
        Some((idx, first)) => as_number(first, op, idx)?,
        None => return Ok(Value::Int(identity)),
    };
    if args.len() == 1 {
        acc = apply(op, Num::Int(identity), acc, int_op, float_op)?;
    }
    for (idx, arg) in iter {
        acc = apply(op, acc, as_number(arg, op, idx)?, int_op, float_op)?;
    }
    Ok(acc.into_value())
}

fn apply(
    op: &str,
    lhs: Num,
    rhs: Num,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Num, XlispError> {
    match (lhs, rhs) {
        (Num::Int(a), Num::Int(b)) => int_op(a, b).map(Num::Int).ok_or_else(|| overflow(op)),
        (a, b) => Ok(Num::Float(float_op(a.as_f64(), b.as_f64()))),
    }
}

fn divide(lhs: Num, rhs: Num) -> Result<Num, XlispError> {
    match (lhs, rhs) {
        (_, Num::Int(0)) => err("divide by zero"),
        (Num::Int(a), Num::Int(b)) => match a.checked_rem(b) {
            None => Err(overflow("/")),
            Some(0) => a.checked_div(b).map(Num::Int).ok_or_else(|| overflow("/")),
            Some(_) => Ok(Num::Float(a as f64 / b as f64)),
        },
        (a, b) => {
            let divisor = b.as_f64();
            if divisor == 0.0 {
                return err("divide by zero");
            }
            Ok(Num::Float(a.as_f64() / divisor))
        }
    }
}

fn compare_chain(
    op: &str,
    args: &[Value],
    holds: fn(std::cmp::Ordering) -> bool,
) -> Result<Value, XlispError> {
    let nums = args
        .iter()
        .enumerate()
        .map(|(idx, arg)| as_number(arg, op, idx))
        .collect::<Result<Vec<_>, _>>()?;
    for pair in nums.windows(2) {
        let ordering = match (pair[0], pair[1]) {
            (Num::Int(a), Num::Int(b)) => a.cmp(&b),
            (a, b) => match a.as_f64().partial_cmp(&b.as_f64()) {
                Some(ordering) => ordering,
                None => return Ok(Value::Bool(false)),
            },
        };
        if !holds(ordering) {
            return Ok(Value::Bool(false));
        }
    }
    Ok(Value::Bool(true))
}

pub(crate) fn install(env: &Environment) {
    // --- Arithmetic ---
    def_builtin!(env, "+", FnArity::at_least(0), |args| {
        arith("+", args, 0, i64::checked_add, |a, b| a + b)
    });
    def_builtin!(env, "*", FnArity::at_least(0), |args| {
        arith("*", args, 1, i64::checked_mul, |a, b| a * b)
    });
    def_builtin!(env, "-", FnArity::at_least(1), |args| {
        arith("-", args, 0, i64::checked_sub, |a, b| a - b)
    });
    def_builtin!(env, "/", FnArity::at_least(1), |args| {
        let mut acc = as_number(&args[0], "/", 0)?;
        if args.len() == 1 {
            return divide(Num::Int(1), acc).map(Num::into_value);
        }
        for (idx, arg) in args.iter().enumerate().skip(1) {
            acc = divide(acc, as_number(arg, "/", idx)?)?;
        }
        Ok(acc.into_value())
    });
    def_builtin!(env, "mod", FnArity::exact(2), |args| {
        let a = expect_int(&args[0], "mod", 0)?;
        let b = expect_int(&args[1], "mod", 1)?;
        if b == 0 {
            return err("divide by zero");
        }
        a.checked_rem_euclid(b)
            .map(Value::Int)
            .ok_or_else(|| overflow("mod"))
    });
    def_builtin!(env, "inc", FnArity::exact(1), |args| {
        arith("inc", &[args[0].clone(), Value::Int(1)], 0, i64::checked_add, |a, b| a + b)
    });
    def_builtin!(env, "dec", FnArity::exact(1), |args| {
        arith("dec", &[args[0].clone(), Value::Int(1)], 0, i64::checked_sub, |a, b| a - b)
    });

    // --- Comparison ---
    def_builtin!(env, "=", FnArity::at_least(1), |args| {
        Ok(Value::Bool(args.windows(2).all(|pair| pair[0] == pair[1])))
    });
    def_builtin!(env, "<", FnArity::at_least(1), |args| {
        compare_chain("<", args, |o| o.is_lt())
    });
    def_builtin!(env, ">", FnArity::at_least(1), |args| {
        compare_chain(">", args, |o| o.is_gt())
    });
    def_builtin!(env, "<=", FnArity::at_least(1), |args| {
        compare_chain("<=", args, |o| o.is_le())
    });
    def_builtin!(env, ">=", FnArity::at_least(1), |args| {
        compare_chain(">=", args, |o| o.is_ge())
    });
}
