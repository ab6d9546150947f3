use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use log::{debug, trace};

use crate::ast::Value;
use crate::env::{Scope, ScopeRef};
use crate::error::XlispError;

pub const NS_SEPARATOR: char = '/';
pub const DEFAULT_NAMESPACE: &str = "user";
pub const BASE_NAMESPACE: &str = "core";
/// Name of the namespace-switch operator; always resolved in the base namespace.
pub const NS_OPERATOR: &str = "ns";
pub const CURRENT_NS_MARKER: &str = "*ns*";
/// Home of operators that rebind names in place.
pub const UNSAFE_NAMESPACE: &str = "unsafe";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct QualifiedSymbol {
    pub namespace: String,
    pub name: String,
}

impl QualifiedSymbol {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Splits `ns/name`, defaulting the namespace to `current_ns`.
    ///
    /// A lone `/` names itself in the current namespace, and `ns//` keeps `/`
    /// as the name. Any other second separator is malformed.
    pub fn parse(symbol: &str, current_ns: &str) -> Result<Self, XlispError> {
        if symbol == "/" {
            return Ok(Self::new(current_ns, symbol));
        }
        match symbol.split_once(NS_SEPARATOR) {
            None => Ok(Self::new(current_ns, symbol)),
            Some((ns, name)) => {
                if name.contains(NS_SEPARATOR) && name != "/" {
                    return Err(XlispError::invalid_symbol(symbol));
                }
                if ns.is_empty() || name.is_empty() {
                    return Err(XlispError::invalid_symbol(symbol));
                }
                Ok(Self::new(ns, name))
            }
        }
    }

    pub fn in_namespace(&self, namespace: &str) -> Self {
        Self::new(namespace, self.name.clone())
    }
}

impl fmt::Display for QualifiedSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.namespace, NS_SEPARATOR, self.name)
    }
}

struct EnvState {
    current_ns: String,
    check_ns: bool,
    bindings: HashMap<QualifiedSymbol, Value>,
}

/// The process-wide symbol table.
///
/// Bare symbols resolve in the current namespace first and then in
/// [`BASE_NAMESPACE`]. With namespace checking on, bindings may only be
/// created in the current namespace.
pub struct Environment {
    state: RwLock<EnvState>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    /// Empty table in [`DEFAULT_NAMESPACE`] with checking off.
    pub fn new() -> Self {
        Self::with_namespace(DEFAULT_NAMESPACE)
    }

    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(EnvState {
                current_ns: namespace.into(),
                check_ns: false,
                bindings: HashMap::new(),
            }),
        }
    }

    pub fn set_checked(&self, enabled: bool) {
        self.state
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .check_ns = enabled;
    }

    pub fn is_checked(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .check_ns
    }

    pub fn current_namespace(&self) -> String {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .current_ns
            .clone()
    }

    pub fn bind(&self, symbol: &str, value: Value) -> Result<(), XlispError> {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        let qualified = QualifiedSymbol::parse(symbol, &state.current_ns)?;
        if state.check_ns && qualified.namespace != state.current_ns {
            return Err(XlispError::access(format!(
                "cannot bind outside current namespace: {} (current namespace is {})",
                qualified, state.current_ns
            )));
        }
        trace!("bind {}", qualified);
        state.bindings.insert(qualified, value);
        Ok(())
    }

    /// Installs a base-library binding regardless of namespace checking.
    pub fn define_builtin(&self, name: &str, value: Value) {
        self.define_in(BASE_NAMESPACE, name, value);
    }

    /// Binds `namespace/name` directly, bypassing the namespace check.
    pub fn define_in(&self, namespace: &str, name: &str, value: Value) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state
            .bindings
            .insert(QualifiedSymbol::new(namespace, name), value);
    }

    pub fn resolve(&self, symbol: &str) -> Result<Value, XlispError> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        let lookup = if symbol == NS_OPERATOR {
            QualifiedSymbol::new(BASE_NAMESPACE, NS_OPERATOR)
        } else {
            QualifiedSymbol::parse(symbol, &state.current_ns)?
        };
        if let Some(value) = state.bindings.get(&lookup) {
            return Ok(value.clone());
        }
        if let Some(value) = state.bindings.get(&lookup.in_namespace(BASE_NAMESPACE)) {
            return Ok(value.clone());
        }
        Err(XlispError::unresolved(format!(
            "unable to resolve symbol: {}",
            symbol
        )))
    }

    /// Makes `namespace` current and binds [`CURRENT_NS_MARKER`] inside it.
    pub fn switch_namespace(&self, namespace: &str) {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.current_ns = namespace.to_string();
        state.bindings.insert(
            QualifiedSymbol::new(namespace, CURRENT_NS_MARKER),
            Value::symbol(namespace),
        );
        debug!("switched to namespace {}", namespace);
    }
}

impl Scope for Environment {
    fn bind(&self, name: &str, value: Value) -> Result<(), XlispError> {
        Environment::bind(self, name, value)
    }

    fn resolve(&self, name: &str) -> Result<Value, XlispError> {
        Environment::resolve(self, name)
    }

    fn parent(&self) -> Option<ScopeRef> {
        None
    }
}
