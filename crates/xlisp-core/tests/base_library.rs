mod common;

use common::{ctx, eval, eval_err};
use xlisp_core::error::ErrorKind;
use xlisp_core::{eval_source, Value};

#[test]
fn macros_expand_before_evaluation() {
    let ctx = ctx();
    ctx.eval_source("(def unless (macro [test then else] (list 'if test else then)))")
        .unwrap();
    assert_eq!(ctx.eval_source("(unless false 1 2)").unwrap(), Value::Int(1));
    let expanded = ctx
        .eval_source("(macroexpand '(unless c :a :b))")
        .unwrap();
    assert_eq!(expanded.to_string(), "(if c :b :a)");
    let untouched = ctx.eval_source("(macroexpand '(inc 1))").unwrap();
    assert_eq!(untouched.to_string(), "(inc 1)");
}

#[test]
fn eval_runs_data_as_code() {
    assert_eq!(eval("(eval (list '+ 1 2))"), Value::Int(3));
}

#[test]
fn str_and_type() {
    assert_eq!(eval("(str \"a\" 1 :k nil)"), Value::String("a1:k".into()));
    assert_eq!(eval("(type 1.5)"), Value::String("number".into()));
    assert_eq!(eval("(type (atom 1))"), Value::String("atom".into()));
}

#[test]
fn range_variants() {
    assert_eq!(eval("(range 3)").to_string(), "(0 1 2)");
    assert_eq!(eval("(range 2 5)").to_string(), "(2 3 4)");
    assert_eq!(eval("(range 0 10 4)").to_string(), "(0 4 8)");
    assert_eq!(eval_err("(range 0 10 0)").kind(), ErrorKind::Runtime);
}

#[test]
fn throw_concatenates_message() {
    let err = eval_err("(throw \"x=\" 3)");
    assert_eq!(err.kind(), ErrorKind::Thrown);
    assert_eq!(err.to_string(), "Thrown: x=3");
}

#[test]
fn rest_params_collect_extra_args() {
    assert_eq!(eval("((fn [a & more] (count more)) 1 2 3)"), Value::Int(2));
    assert_eq!(eval_err("((fn [a b] a) 1)").kind(), ErrorKind::Arity);
}

#[test]
fn arithmetic_and_comparison() {
    assert_eq!(eval("(/ 7 2)"), Value::Float(3.5));
    assert_eq!(eval("(mod -7 3)"), Value::Int(2));
    assert_eq!(eval("(< 1 2 3)"), Value::Bool(true));
    assert_eq!(eval("(>= 3 3 4)"), Value::Bool(false));
    assert_eq!(eval("(= (list 1 2) (list 1 2))"), Value::Bool(true));
    assert_eq!(eval_err("(/ 1 0)").kind(), ErrorKind::Runtime);
    assert_eq!(eval_err("(+ 1 \"a\")").kind(), ErrorKind::Type);
}

#[test]
fn shebang_scripts_run() {
    let value = eval_source("#!/usr/bin/env xlisp\n(+ 1 2)", None).unwrap();
    assert_eq!(value, Value::Int(3));
}

#[test]
fn parse_errors_carry_source_name() {
    let err = eval_err("(+ 1");
    assert_eq!(err.kind(), ErrorKind::Parse);
    assert!(err.to_string().contains("test:1:5"));
}

#[test]
fn and_or_short_circuit() {
    assert_eq!(eval("(and 1 :k true)"), Value::Bool(true));
    assert_eq!(eval("(and 1 nil (throw \"unreached\"))"), Value::Bool(false));
    assert_eq!(eval("(or false nil 0)"), Value::Bool(true));
    assert_eq!(eval("(or true (throw \"unreached\"))"), Value::Bool(true));
    assert_eq!(eval("(and)"), Value::Bool(true));
    assert_eq!(eval("(or)"), Value::Bool(false));
}

#[test]
fn time_returns_last_value() {
    assert_eq!(eval("(time (def t 1) (+ t 2))"), Value::Int(3));
    assert_eq!(eval("(time)"), Value::Nil);
    assert_eq!(eval_err("(time (missing))").kind(), ErrorKind::Resolution);
}

#[test]
fn resolve_returns_value_or_nil() {
    assert_eq!(eval("(def x 5) (resolve 'x)"), Value::Int(5));
    assert_eq!(eval("(resolve 'nowhere)"), Value::Nil);
    assert_eq!(eval("(let [y 2] (resolve 'y))"), Value::Int(2));
    assert_eq!(eval_err("(resolve 3)").kind(), ErrorKind::Type);
}

#[test]
fn realize_collects_into_a_list() {
    assert_eq!(eval("(realize [1 2 3])").to_string(), "(1 2 3)");
    assert_eq!(eval("(realize (range 2))").to_string(), "(0 1)");
    assert_eq!(eval("(count (realize nil))"), Value::Int(0));
    assert_eq!(eval_err("(realize 4)").kind(), ErrorKind::Type);
}

#[test]
fn unsafe_mutate_rebinds_in_place() {
    let ctx = ctx();
    ctx.eval_source("(def n 1)").unwrap();
    assert_eq!(ctx.eval_source("(unsafe/mutate n (+ n 1))").unwrap(), Value::Int(2));
    assert_eq!(ctx.eval_source("n").unwrap(), Value::Int(2));
    assert_eq!(
        ctx.eval_source("(let [m 1] (unsafe/mutate m 10) m)").unwrap(),
        Value::Int(10)
    );
    assert_eq!(ctx.eval_source("(bound? m)").unwrap(), Value::Bool(false));
    let err = ctx.eval_source("(unsafe/mutate other/n 3)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Access);
    assert_eq!(ctx.eval_source("(unsafe/mutate 1 2)").unwrap_err().kind(), ErrorKind::Type);
}
