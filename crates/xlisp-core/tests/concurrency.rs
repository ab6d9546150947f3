mod common;

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::{ctx, eval, eval_err};
use xlisp_core::error::ErrorKind;
use xlisp_core::Value;

fn wait_until(mut done: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !done() && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn swap_from_many_threads_loses_no_updates() {
    let ctx = Arc::new(ctx());
    ctx.eval_source("(def counter (atom 5))").unwrap();
    let tasks = 8;
    let rounds = 250;
    let workers: Vec<_> = (0..tasks)
        .map(|_| {
            let ctx = Arc::clone(&ctx);
            thread::spawn(move || {
                for _ in 0..rounds {
                    ctx.eval_source("(swap! counter inc)").unwrap();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
    assert_eq!(
        ctx.eval_source("@counter").unwrap(),
        Value::Int(tasks * rounds + 5)
    );
}

#[test]
fn swap_from_futures_loses_no_updates() {
    let src = "(def a (atom 0))
               (def work (fn [] (loop [i 0] (if (< i 100) (do (swap! a + 1) (recur (inc i))) i))))
               (def f1 (future (work)))
               (def f2 (future (work)))
               (def f3 (future (work)))
               (+ @f1 @f2 @f3 @a)";
    let value = eval(src);
    let total = match value {
        Value::Int(n) => n,
        other => panic!("expected integer, got {}", other),
    };
    assert_eq!(total, 300 + 300);
}

#[test]
fn swap_returns_new_value_and_appends_extra_args() {
    assert_eq!(eval("(def a (atom 1)) (swap! a + 2 3)"), Value::Int(6));
    assert_eq!(eval("(def a (atom [1])) (swap! a (fn [v x] (cons x v)) 0)").to_string(), "(0 1)");
}

#[test]
fn swap_with_unresolvable_operands_leaves_atom_unchanged() {
    let ctx = ctx();
    ctx.eval_source("(def a (atom 1))").unwrap();
    let err = ctx.eval_source("(swap! a missing-fn)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resolution);
    let err = ctx.eval_source("(swap! a 42)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resolution);
    let err = ctx.eval_source("(swap! nope inc)").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resolution);
    assert_eq!(ctx.eval_source("@a").unwrap(), Value::Int(1));
}

#[test]
fn failing_update_function_keeps_value() {
    let ctx = ctx();
    ctx.eval_source("(def a (atom 1))").unwrap();
    let err = ctx
        .eval_source("(swap! a (fn [_] (throw \"boom\")))")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Thrown);
    assert_eq!(ctx.eval_source("@a").unwrap(), Value::Int(1));
}

#[test]
fn nested_swap_on_same_atom_is_rejected() {
    let ctx = ctx();
    ctx.eval_source("(def a (atom 1))").unwrap();
    let err = ctx
        .eval_source("(swap! a (fn [v] (swap! a inc) v))")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Runtime);
    assert_eq!(ctx.eval_source("(swap! a inc)").unwrap(), Value::Int(2));
}

#[test]
fn deref_waits_for_the_value() {
    assert_eq!(eval("(def f (future (do (sleep 20) 42))) @f"), Value::Int(42));
}

#[test]
fn repeated_deref_returns_the_cached_value() {
    let ctx = ctx();
    ctx.eval_source("(def f (future (list 1 2)))").unwrap();
    let first = ctx.eval_source("@f").unwrap();
    let second = ctx.eval_source("(deref f)").unwrap();
    assert_eq!(first.to_string(), "(1 2)");
    assert_eq!(first, second);
    assert_eq!(
        ctx.eval_source("__deref__f__result__").unwrap().to_string(),
        "(1 2)"
    );
}

#[test]
fn deref_after_completion_does_not_block() {
    let ctx = ctx();
    ctx.eval_source("(def f (future 7))").unwrap();
    wait_until(|| ctx.eval_source("(future-realized? f)").unwrap() == Value::Bool(true));
    let started = Instant::now();
    assert_eq!(ctx.eval_source("@f").unwrap(), Value::Int(7));
    assert_eq!(ctx.eval_source("@f").unwrap(), Value::Int(7));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[test]
fn future_realized_never_blocks() {
    let ctx = ctx();
    ctx.eval_source("(def slow (future (do (sleep 300) :done)))").unwrap();
    let started = Instant::now();
    assert_eq!(
        ctx.eval_source("(future-realized? slow)").unwrap(),
        Value::Bool(false)
    );
    assert!(started.elapsed() < Duration::from_millis(200));
    assert_eq!(ctx.eval_source("@slow").unwrap(), Value::Keyword("done".into()));
    wait_until(|| ctx.eval_source("(future-realized? slow)").unwrap() == Value::Bool(true));
    assert_eq!(
        ctx.eval_source("(future-realized? slow)").unwrap(),
        Value::Bool(true)
    );
}

#[test]
fn future_failure_reaches_deref() {
    let ctx = ctx();
    ctx.eval_source("(def f (future (throw \"bad \" 1)))").unwrap();
    let err = ctx.eval_source("@f").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Thrown);
    assert_eq!(err.to_string(), "Thrown: bad 1");
    let again = ctx.eval_source("@f").unwrap_err();
    assert_eq!(again.kind(), ErrorKind::Thrown);
}

#[test]
fn future_sees_bindings_from_spawn_scope() {
    let value = eval("(def base 40) (let [n 2] (def f (future (+ base n)))) @f");
    assert_eq!(value, Value::Int(42));
}

#[test]
fn predicates_distinguish_handles() {
    assert_eq!(eval("(atom? (atom 1))"), Value::Bool(true));
    assert_eq!(eval("(future? (future 1))"), Value::Bool(true));
    assert_eq!(eval("(future? (atom 1))"), Value::Bool(false));
    assert_eq!(eval_err("(future-realized? 1)").kind(), ErrorKind::Type);
}

#[test]
fn deref_inside_fn_body_survives_repeated_calls() {
    let ctx = ctx();
    ctx.eval_source("(def f (future (+ 4 5))) (def g (fn [] @f))").unwrap();
    assert_eq!(ctx.eval_source("(g)").unwrap(), Value::Int(9));
    wait_until(|| ctx.eval_source("(future-realized? f)").unwrap() == Value::Bool(true));
    assert_eq!(ctx.eval_source("(g)").unwrap(), Value::Int(9));
    assert_eq!(ctx.eval_source("@f").unwrap(), Value::Int(9));
}

#[test]
fn deref_inside_let_caches_for_top_level() {
    let ctx = ctx();
    ctx.eval_source("(def f (future 9))").unwrap();
    assert_eq!(ctx.eval_source("(let [x 1] @f)").unwrap(), Value::Int(9));
    wait_until(|| ctx.eval_source("(future-realized? f)").unwrap() == Value::Bool(true));
    assert_eq!(ctx.eval_source("@f").unwrap(), Value::Int(9));
    assert_eq!(ctx.eval_source("user/__deref__f__result__").unwrap(), Value::Int(9));
}

#[test]
fn one_future_through_two_symbols() {
    let ctx = ctx();
    ctx.eval_source("(def f (future :v)) (def h f)").unwrap();
    assert_eq!(ctx.eval_source("@f").unwrap(), Value::Keyword("v".into()));
    wait_until(|| ctx.eval_source("(future-realized? h)").unwrap() == Value::Bool(true));
    assert_eq!(ctx.eval_source("@h").unwrap(), Value::Keyword("v".into()));
    assert_eq!(ctx.eval_source("@h").unwrap(), Value::Keyword("v".into()));
    assert_eq!(ctx.eval_source("@f").unwrap(), Value::Keyword("v".into()));
}
