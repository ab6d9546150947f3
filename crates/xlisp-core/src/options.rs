use std::env;

use crate::namespaces::DEFAULT_NAMESPACE;

fn env_flag(name: &str) -> bool {
    let Ok(value) = env::var(name) else {
        return false;
    };
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub fn default_namespace_from_env() -> String {
    env::var("XLISP_NS")
        .ok()
        .map(|ns| ns.trim().to_string())
        .filter(|ns| !ns.is_empty())
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string())
}

pub fn unchecked_namespaces_from_env() -> bool {
    env_flag("XLISP_UNCHECKED_NS")
}

#[derive(Clone, Debug)]
pub struct EvalOptions {
    pub default_namespace: String,
    pub check_namespaces: bool,
    /// Skip installing the base library; only `ns` is bound.
    pub no_core: bool,
    pub source_name: Option<String>,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            default_namespace: default_namespace_from_env(),
            check_namespaces: !unchecked_namespaces_from_env(),
            no_core: false,
            source_name: None,
        }
    }
}
