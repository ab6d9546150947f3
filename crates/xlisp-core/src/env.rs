use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::ast::Value;
use crate::error::XlispError;
use crate::namespaces::NS_SEPARATOR;

/// Anything symbols can be bound into and looked up from.
pub trait Scope: Send + Sync {
    fn bind(&self, name: &str, value: Value) -> Result<(), XlispError>;
    fn resolve(&self, name: &str) -> Result<Value, XlispError>;
    fn parent(&self) -> Option<ScopeRef>;
}

pub type ScopeRef = Arc<dyn Scope>;

/// Walks `parent()` links up to the outermost scope.
pub fn root_scope(scope: &ScopeRef) -> ScopeRef {
    let mut current = scope.clone();
    while let Some(parent) = current.parent() {
        current = parent;
    }
    current
}

fn is_qualified(name: &str) -> bool {
    name != "/" && name.contains(NS_SEPARATOR)
}

/// Lexical frame used by `let`, `loop`, `doseq` and lambda calls.
pub struct LocalEnv {
    data: RwLock<HashMap<String, Value>>,
    outer: ScopeRef,
}

impl LocalEnv {
    pub fn new_child(outer: ScopeRef) -> Self {
        Self {
            data: RwLock::new(HashMap::new()),
            outer,
        }
    }

    pub fn set(&self, key: &str, value: Value) {
        self.data
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), value);
    }

    pub fn get_local(&self, key: &str) -> Option<Value> {
        self.data
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

impl Scope for LocalEnv {
    fn bind(&self, name: &str, value: Value) -> Result<(), XlispError> {
        if is_qualified(name) {
            return self.outer.bind(name, value);
        }
        self.set(name, value);
        Ok(())
    }

    fn resolve(&self, name: &str) -> Result<Value, XlispError> {
        if !is_qualified(name) {
            if let Some(value) = self.get_local(name) {
                return Ok(value);
            }
        }
        self.outer.resolve(name)
    }

    fn parent(&self) -> Option<ScopeRef> {
        Some(self.outer.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespaces::Environment;

    #[test]
    fn local_frame_shadows_then_falls_back() {
        let env = Arc::new(Environment::new());
        env.bind("x", Value::Int(1)).unwrap();
        let root: ScopeRef = env;
        let frame = LocalEnv::new_child(root.clone());
        assert_eq!(frame.resolve("x").unwrap(), Value::Int(1));
        frame.set("x", Value::Int(2));
        assert_eq!(frame.resolve("x").unwrap(), Value::Int(2));
        assert_eq!(root.resolve("x").unwrap(), Value::Int(1));
    }

    #[test]
    fn qualified_names_skip_local_frames() {
        let env = Arc::new(Environment::new());
        env.bind("user/y", Value::Int(7)).unwrap();
        let frame = LocalEnv::new_child(env);
        frame.set("user/y", Value::Int(0));
        assert_eq!(frame.resolve("user/y").unwrap(), Value::Int(7));
    }

    #[test]
    fn root_scope_reaches_environment() {
        let env = Arc::new(Environment::new());
        let root: ScopeRef = env;
        let inner: ScopeRef = Arc::new(LocalEnv::new_child(Arc::new(LocalEnv::new_child(
            root.clone(),
        ))));
        assert!(root_scope(&inner).parent().is_none());
    }
}
