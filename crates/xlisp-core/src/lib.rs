pub mod ast;
pub mod builtins;
pub mod case_form;
pub mod concurrency;
pub mod env;
pub mod error;
pub mod eval;
pub mod loop_form;
pub mod namespaces;
pub mod options;
pub mod reader;
pub mod runtime;
pub mod thread_form;

pub use ast::{FnArity, Value};
pub use env::{Scope, ScopeRef};
pub use error::{ErrorKind, XlispError};
pub use namespaces::{Environment, QualifiedSymbol};
pub use options::EvalOptions;
pub use runtime::RuntimeCtx;

pub fn eval_source(src: &str, options: Option<EvalOptions>) -> Result<Value, XlispError> {
    RuntimeCtx::new(options.unwrap_or_default()).eval_source(src)
}
