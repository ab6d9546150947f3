use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::ast::Value;
use crate::env::{LocalEnv, ScopeRef};
use crate::error::XlispError;
use crate::eval::{eval, eval_body};

thread_local! {
    static RECUR_STACK: RefCell<Vec<RecurContext>> = RefCell::new(Vec::new());
}

static RECUR_COUNTER: AtomicUsize = AtomicUsize::new(0);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RecurKind {
    Loop,
    Function,
}

#[derive(Clone, Debug)]
pub(crate) struct RecurContext {
    pub id: usize,
    pub arity: usize,
    pub kind: RecurKind,
    pub name: Option<String>,
}

fn describe_recur_target(ctx: &RecurContext) -> String {
    match ctx.kind {
        RecurKind::Loop => "loop".into(),
        RecurKind::Function => ctx
            .name
            .clone()
            .map(|n| format!("function {}", n))
            .unwrap_or_else(|| "anonymous function".into()),
    }
}

pub(crate) struct RecurGuard {
    id: usize,
}

impl RecurGuard {
    pub fn id(&self) -> usize {
        self.id
    }
}

impl Drop for RecurGuard {
    fn drop(&mut self) {
        RECUR_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

/// Registers a new innermost recur target for the current thread.
pub(crate) fn push_recur_target(kind: RecurKind, arity: usize, name: Option<String>) -> RecurGuard {
    let id = RECUR_COUNTER.fetch_add(1, Ordering::SeqCst);
    RECUR_STACK.with(|stack| {
        stack.borrow_mut().push(RecurContext {
            id,
            arity,
            kind,
            name,
        });
    });
    RecurGuard { id }
}

fn current_recur_context() -> Option<RecurContext> {
    RECUR_STACK.with(|stack| stack.borrow().last().cloned())
}

#[derive(Clone, Debug)]
pub struct LoopBinding {
    pub name: String,
    pub init: Value,
}

/// Outcome of one pass over a loop body.
#[derive(Debug)]
pub enum LoopStep {
    Done(Value),
    Recur(Vec<Value>),
}

/// A parsed `(loop [name init ...] body...)` form.
#[derive(Clone, Debug)]
pub struct LoopForm {
    bindings: Vec<LoopBinding>,
    body: Vec<Value>,
}

impl LoopForm {
    pub fn parse(args: &[Value]) -> Result<Self, XlispError> {
        let (bindings_form, body) = match args.split_first() {
            Some((first, rest)) if !rest.is_empty() => (first, rest),
            _ => {
                return Err(XlispError::arity(
                    "loop requires at least bindings and one body form",
                ))
            }
        };
        let items: Vec<Value> = match bindings_form {
            Value::Vector(items) => items.iter().cloned().collect(),
            other => {
                return Err(XlispError::binding(format!(
                    "loop bindings must be a vector, not {}",
                    other.type_name()
                )))
            }
        };
        if items.len() % 2 != 0 {
            return Err(XlispError::binding(
                "loop bindings must contain an even number of forms",
            ));
        }
        let mut bindings = Vec::with_capacity(items.len() / 2);
        for (idx, pair) in items.chunks(2).enumerate() {
            let name = match &pair[0] {
                Value::Symbol(name) => name.clone(),
                other => {
                    return Err(XlispError::binding(format!(
                        "item at {} must be a symbol, not {}",
                        idx * 2,
                        other.type_name()
                    )))
                }
            };
            bindings.push(LoopBinding {
                name,
                init: pair[1].clone(),
            });
        }
        Ok(Self {
            bindings,
            body: body.to_vec(),
        })
    }

    /// Runs the loop in a child frame of `scope`. Each `recur` rebinds the
    /// names by position and the body runs again in the same frame.
    pub fn invoke(&self, scope: &ScopeRef) -> Result<Value, XlispError> {
        let frame = Arc::new(LocalEnv::new_child(scope.clone()));
        let frame_scope: ScopeRef = frame.clone();
        for binding in &self.bindings {
            let value = eval(&binding.init, &frame_scope)?;
            frame.set(&binding.name, value);
        }
        let guard = push_recur_target(RecurKind::Loop, self.bindings.len(), None);
        loop {
            match self.step(guard.id(), eval_body(&self.body, &frame_scope))? {
                LoopStep::Done(value) => return Ok(value),
                LoopStep::Recur(values) => {
                    for (binding, value) in self.bindings.iter().zip(values) {
                        frame.set(&binding.name, value);
                    }
                }
            }
        }
    }

    fn step(&self, id: usize, result: Result<Value, XlispError>) -> Result<LoopStep, XlispError> {
        match result {
            Ok(value) => Ok(LoopStep::Done(value)),
            Err(XlispError::RecurSignal { target, values }) if target == id => {
                if values.len() != self.bindings.len() {
                    return Err(XlispError::arity(format!(
                        "recur expects {} argument(s) for loop, got {}",
                        self.bindings.len(),
                        values.len()
                    )));
                }
                Ok(LoopStep::Recur(values))
            }
            Err(err) => Err(err),
        }
    }
}

pub fn eval_loop(args: &[Value], scope: &ScopeRef) -> Result<Value, XlispError> {
    LoopForm::parse(args)?.invoke(scope)
}

/// Evaluates every argument first, then signals the innermost loop or fn.
pub fn eval_recur(args: &[Value], scope: &ScopeRef) -> Result<Value, XlispError> {
    let ctx = current_recur_context().ok_or_else(|| {
        XlispError::runtime("recur is only allowed within loop or function bodies")
    })?;
    if args.len() != ctx.arity {
        return Err(XlispError::arity(format!(
            "recur expects {} argument(s) for {}, got {}",
            ctx.arity,
            describe_recur_target(&ctx),
            args.len()
        )));
    }
    let values = args
        .iter()
        .map(|arg| eval(arg, scope))
        .collect::<Result<Vec<_>, _>>()?;
    Err(XlispError::RecurSignal {
        target: ctx.id,
        values,
    })
}
