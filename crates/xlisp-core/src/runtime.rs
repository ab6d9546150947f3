use std::sync::Arc;

use log::debug;

use crate::ast::Value;
use crate::builtins::{install_core, install_ns_operator};
use crate::env::ScopeRef;
use crate::error::XlispError;
use crate::eval::eval;
use crate::namespaces::Environment;
use crate::options::EvalOptions;
use crate::reader::{Reader, ReaderOptions};

/// An Environment with the base library installed, ready to evaluate source.
pub struct RuntimeCtx {
    env: Arc<Environment>,
    reader_opts: ReaderOptions,
}

impl RuntimeCtx {
    pub fn new(opts: EvalOptions) -> Self {
        let env = Arc::new(Environment::new());
        if opts.no_core {
            install_ns_operator(&env);
        } else {
            install_core(&env);
        }
        env.set_checked(opts.check_namespaces);
        env.switch_namespace(&opts.default_namespace);
        debug!(
            "runtime ready in namespace {} (checked: {}, core: {})",
            opts.default_namespace, opts.check_namespaces, !opts.no_core
        );
        Self {
            env,
            reader_opts: ReaderOptions {
                source_name: opts.source_name,
            },
        }
    }

    pub fn env(&self) -> Arc<Environment> {
        self.env.clone()
    }

    pub fn scope(&self) -> ScopeRef {
        self.env.clone()
    }

    /// Binds a host value in the current namespace.
    pub fn bind_value(&self, name: &str, value: Value) -> Result<(), XlispError> {
        self.env.bind(name, value)
    }

    pub fn read(&self, src: &str) -> Result<Vec<Value>, XlispError> {
        Reader::new_with_options(src, self.reader_opts.clone()).read_all()
    }

    pub fn eval_source(&self, src: &str) -> Result<Value, XlispError> {
        let forms = self.read(src)?;
        self.eval_forms(&forms)
    }

    pub fn eval_forms(&self, forms: &[Value]) -> Result<Value, XlispError> {
        let scope = self.scope();
        let mut result = Value::Nil;
        for form in forms {
            result = eval(form, &scope)?;
        }
        Ok(result)
    }
}

impl Default for RuntimeCtx {
    fn default() -> Self {
        Self::new(EvalOptions::default())
    }
}
