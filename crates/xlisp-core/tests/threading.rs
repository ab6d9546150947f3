mod common;

use common::{ctx, eval, eval_err};
use xlisp_core::error::ErrorKind;
use xlisp_core::Value;

#[test]
fn thread_first_and_last_agree_on_commutative_ops() {
    assert_eq!(eval("(-> 5 (+ 1) (* 2))"), Value::Int(12));
    assert_eq!(eval("(->> 5 (+ 1) (* 2))"), Value::Int(12));
}

#[test]
fn insertion_side_matters_for_subtraction() {
    assert_eq!(eval("(-> 10 (- 3))"), Value::Int(7));
    assert_eq!(eval("(->> 10 (- 3))"), Value::Int(-7));
}

#[test]
fn bare_symbols_are_called_with_the_running_value() {
    assert_eq!(eval("(-> 1 inc inc)"), Value::Int(3));
    assert_eq!(eval("(->> (list 1 2 3) rest count)"), Value::Int(2));
}

#[test]
fn seed_is_evaluated_once_through_the_pipeline() {
    let ctx = ctx();
    ctx.eval_source("(def calls (atom 0))").unwrap();
    let value = ctx
        .eval_source("(-> (swap! calls inc) (+ 10) (* 2))")
        .unwrap();
    assert_eq!(value, Value::Int(22));
    assert_eq!(ctx.eval_source("@calls").unwrap(), Value::Int(1));
}

#[test]
fn list_results_are_threaded_as_data() {
    assert_eq!(eval("(-> (list 1 2 3) (rest) (first))"), Value::Int(2));
    let value = eval("(->> (range 3) (cons 'head))");
    assert_eq!(value.to_string(), "(head 0 1 2)");
    assert_eq!(eval("(-> '(a b) (count))"), Value::Int(2));
}

#[test]
fn lambdas_are_valid_steps() {
    assert_eq!(eval("(-> 4 ((fn [x y] (* x y)) 3))"), Value::Int(12));
    assert_eq!(eval("(->> 4 ((fn [x y] (- x y)) 3))"), Value::Int(-1));
}

#[test]
fn non_invokable_step_is_type_error() {
    let err = eval_err("(-> 1 2)");
    assert_eq!(err.kind(), ErrorKind::Type);
    assert_eq!(err.to_string(), "number is not invokable");
    let err = eval_err("(-> 1 \"str\")");
    assert_eq!(err.kind(), ErrorKind::Type);
}

#[test]
fn threading_requires_a_step() {
    assert_eq!(eval_err("(-> 1)").kind(), ErrorKind::Arity);
    assert_eq!(eval_err("(->>)").kind(), ErrorKind::Arity);
}
