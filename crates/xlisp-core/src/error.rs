use crate::ast::Value;
use thiserror::Error;

/// Coarse classification of [`XlispError`], stable across message changes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Arity,
    Binding,
    Access,
    Resolution,
    Type,
    NoMatch,
    Parse,
    Thrown,
    Runtime,
    Recur,
}

#[derive(Error, Debug, Clone)]
pub enum XlispError {
    #[error("Arity mismatch: {0}")]
    Arity(String),

    #[error("Binding error: {0}")]
    Binding(String),

    #[error("Access error: {0}")]
    Access(String),

    #[error("{0}")]
    Unresolved(String),

    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("{0} is not invokable")]
    NotInvokable(String),

    #[error("No matching clause: {0}")]
    NoMatch(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Thrown: {0}")]
    Thrown(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("internal recur signal")]
    RecurSignal { target: usize, values: Vec<Value> },
}

impl XlispError {
    pub fn arity(message: impl Into<String>) -> Self {
        XlispError::Arity(message.into())
    }

    pub fn binding(message: impl Into<String>) -> Self {
        XlispError::Binding(message.into())
    }

    pub fn access(message: impl Into<String>) -> Self {
        XlispError::Access(message.into())
    }

    pub fn unresolved(message: impl Into<String>) -> Self {
        XlispError::Unresolved(message.into())
    }

    pub fn invalid_symbol(symbol: impl Into<String>) -> Self {
        XlispError::InvalidSymbol(format!("'{}'", symbol.into()))
    }

    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        XlispError::TypeMismatch {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    pub fn not_invokable(value: &Value) -> Self {
        XlispError::NotInvokable(value.type_name().to_string())
    }

    pub fn no_match(message: impl Into<String>) -> Self {
        XlispError::NoMatch(message.into())
    }

    pub fn parse(message: impl Into<String>) -> Self {
        XlispError::Parse(message.into())
    }

    pub fn thrown(message: impl Into<String>) -> Self {
        XlispError::Thrown(message.into())
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        XlispError::Runtime(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            XlispError::Arity(_) => ErrorKind::Arity,
            XlispError::Binding(_) => ErrorKind::Binding,
            XlispError::Access(_) => ErrorKind::Access,
            XlispError::Unresolved(_) | XlispError::InvalidSymbol(_) => ErrorKind::Resolution,
            XlispError::TypeMismatch { .. } | XlispError::NotInvokable(_) => ErrorKind::Type,
            XlispError::NoMatch(_) => ErrorKind::NoMatch,
            XlispError::Parse(_) => ErrorKind::Parse,
            XlispError::Thrown(_) => ErrorKind::Thrown,
            XlispError::Runtime(_) => ErrorKind::Runtime,
            XlispError::RecurSignal { .. } => ErrorKind::Recur,
        }
    }
}
