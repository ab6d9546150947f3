use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, RwLock};
use std::thread::{self, ThreadId};

use crossbeam_channel::{bounded, Receiver};
use log::{debug, error};
use once_cell::sync::OnceCell;

use crate::ast::Value;
use crate::env::{root_scope, ScopeRef};
use crate::error::XlispError;
use crate::eval::{call_callable, eval};
use crate::namespaces::NS_SEPARATOR;

static NEXT_FUTURE_ID: AtomicUsize = AtomicUsize::new(1);

fn panic_payload_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "panic occurred".to_string()
    }
}

fn eval_guarded(expr: &Value, scope: &ScopeRef) -> Result<Value, XlispError> {
    match panic::catch_unwind(AssertUnwindSafe(|| eval(expr, scope))) {
        Ok(result) => result,
        Err(payload) => Err(XlispError::runtime(format!(
            "panic: {}",
            panic_payload_message(payload)
        ))),
    }
}

#[derive(Clone)]
pub struct AtomHandle {
    inner: Arc<AtomInner>,
}

pub(crate) struct AtomInner {
    value: RwLock<Value>,
    updater: Mutex<Option<ThreadId>>,
    turn: Condvar,
}

/// Held for the duration of one update; hands the turn to the next waiter on drop.
struct UpdateTurn<'a> {
    inner: &'a AtomInner,
}

impl Drop for UpdateTurn<'_> {
    fn drop(&mut self) {
        let mut owner = self.inner.updater.lock().unwrap_or_else(|e| e.into_inner());
        *owner = None;
        self.inner.turn.notify_one();
    }
}

impl AtomHandle {
    pub fn new(initial: Value) -> Self {
        Self {
            inner: Arc::new(AtomInner {
                value: RwLock::new(initial),
                updater: Mutex::new(None),
                turn: Condvar::new(),
            }),
        }
    }

    pub fn deref(&self) -> Value {
        self.inner
            .value
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn begin_update(&self) -> Result<UpdateTurn<'_>, XlispError> {
        let me = thread::current().id();
        let mut owner = self.inner.updater.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            let current = *owner;
            match current {
                None => {
                    *owner = Some(me);
                    return Ok(UpdateTurn { inner: &self.inner });
                }
                Some(id) if id == me => {
                    return Err(XlispError::runtime(
                        "swap! re-entered on an atom that is already being updated",
                    ));
                }
                Some(_) => {
                    owner = self
                        .inner
                        .turn
                        .wait(owner)
                        .unwrap_or_else(|e| e.into_inner());
                }
            }
        }
    }

    /// Applies `func` to the current value (followed by `extra_args`) and
    /// stores the result. Updates on one atom never interleave; on error the
    /// stored value is left as it was.
    pub fn update_state(&self, func: Value, extra_args: Vec<Value>) -> Result<Value, XlispError> {
        let _turn = self.begin_update()?;
        let mut args = Vec::with_capacity(1 + extra_args.len());
        args.push(self.deref());
        args.extend(extra_args);
        let next = call_callable(func, args)?;
        *self.inner.value.write().unwrap_or_else(|e| e.into_inner()) = next.clone();
        Ok(next)
    }
}

#[derive(Clone)]
pub struct FutureHandle {
    inner: Arc<FutureInner>,
}

pub(crate) struct FutureInner {
    id: usize,
    receiver: Receiver<Result<Value, XlispError>>,
    realized: AtomicBool,
    failure: OnceCell<XlispError>,
    delivered: OnceCell<Value>,
}

/// Binding name under which a dereferenced future's value is cached.
pub fn deref_cache_key(bound_symbol: &str) -> String {
    let flattened = bound_symbol.replace(NS_SEPARATOR, "__");
    format!("__deref__{}__result__", flattened)
}

impl FutureHandle {
    pub fn id(&self) -> usize {
        self.inner.id
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// True once the producer has finished and closed the channel. Never blocks.
    pub fn is_realized(&self) -> bool {
        self.inner.realized.load(Ordering::SeqCst)
    }

    /// Blocks until the value is delivered and caches it in the root
    /// Environment of `scope` under [`deref_cache_key`]. Once the channel is
    /// drained, later calls read the cache instead. A symbol that never saw
    /// the delivery (an alias of the handle) is seeded from the value the
    /// handle received.
    pub fn deref(&self, scope: &ScopeRef, bound_symbol: &str) -> Result<Value, XlispError> {
        let cache_key = deref_cache_key(bound_symbol);
        let env = root_scope(scope);
        match self.inner.receiver.recv() {
            Ok(Ok(value)) => {
                let _ = self.inner.delivered.set(value.clone());
                env.bind(&cache_key, value.clone())?;
                Ok(value)
            }
            Ok(Err(err)) => Err(err),
            Err(_) => {
                if let Some(err) = self.inner.failure.get() {
                    return Err(err.clone());
                }
                if let Ok(cached) = env.resolve(&cache_key) {
                    return Ok(cached);
                }
                let Some(value) = self.inner.delivered.get() else {
                    return Err(XlispError::unresolved(format!(
                        "future #{} has no cached result for '{}'",
                        self.inner.id, bound_symbol
                    )));
                };
                env.bind(&cache_key, value.clone())?;
                Ok(value.clone())
            }
        }
    }
}

/// Evaluates `expr` on a new thread against `scope`.
pub fn spawn_future(expr: Value, scope: ScopeRef) -> Result<FutureHandle, XlispError> {
    let (sender, receiver) = bounded(1);
    let id = NEXT_FUTURE_ID.fetch_add(1, Ordering::SeqCst);
    let handle = FutureHandle {
        inner: Arc::new(FutureInner {
            id,
            receiver,
            realized: AtomicBool::new(false),
            failure: OnceCell::new(),
            delivered: OnceCell::new(),
        }),
    };
    let producer = handle.inner.clone();
    debug!("spawning future #{}", id);
    thread::Builder::new()
        .name(format!("xlisp-future-{}", id))
        .spawn(move || {
            let result = eval_guarded(&expr, &scope);
            if let Err(err) = &result {
                error!("future #{} failed: {}", id, err);
                let _ = producer.failure.set(err.clone());
            }
            let _ = sender.send(result);
            drop(sender);
            producer.realized.store(true, Ordering::SeqCst);
            debug!("future #{} delivered", id);
        })
        .map_err(|e| XlispError::runtime(format!("failed to spawn future: {}", e)))?;
    Ok(handle)
}
