use crate::ast::{FnArity, Value, Vector};
use crate::builtins::{def_builtin, err, expect_int, seq_items};
use crate::error::XlispError;
use crate::namespaces::Environment;

fn range_values(start: i64, end: i64, step: i64) -> Result<Value, XlispError> {
    if step <= 0 {
        return err(format!("range step must be positive, got {}", step));
    }
    let mut out = Vector::new();
    let mut current = start;
    while current < end {
        out.push_back(Value::Int(current));
        current = match current.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(Value::List(out))
}

pub(crate) fn install(env: &Environment) {
    def_builtin!(env, "list", FnArity::at_least(0), |args| {
        Ok(Value::list(args.to_vec()))
    });
    def_builtin!(env, "vector", FnArity::at_least(0), |args| {
        Ok(Value::Vector(args.iter().cloned().collect()))
    });
    def_builtin!(env, "count", FnArity::exact(1), |args| {
        let n = match &args[0] {
            Value::String(s) => s.chars().count(),
            other => seq_items(other, "count")?.len(),
        };
        Ok(Value::Int(n as i64))
    });
    def_builtin!(env, "first", FnArity::exact(1), |args| {
        Ok(seq_items(&args[0], "first")?
            .into_iter()
            .next()
            .unwrap_or(Value::Nil))
    });
    def_builtin!(env, "rest", FnArity::exact(1), |args| {
        Ok(Value::list(seq_items(&args[0], "rest")?.into_iter().skip(1)))
    });
    def_builtin!(env, "cons", FnArity::exact(2), |args| {
        let mut items: Vector<Value> = seq_items(&args[1], "cons")?.into_iter().collect();
        items.push_front(args[0].clone());
        Ok(Value::List(items))
    });
    def_builtin!(env, "range", FnArity::range(1, 3), |args| {
        let ints = args
            .iter()
            .enumerate()
            .map(|(idx, arg)| expect_int(arg, "range", idx))
            .collect::<Result<Vec<_>, _>>()?;
        match ints.as_slice() {
            [end] => range_values(0, *end, 1),
            [start, end] => range_values(*start, *end, 1),
            [start, end, step] => range_values(*start, *end, *step),
            _ => err("range expects 1 to 3 arguments"),
        }
    });
}
