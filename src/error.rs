use thiserror::Error;

/// Failures raised while binding or evaluating. None of them are recovered
/// inside the core; they surface to whoever drives the interpreter.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("'{0}' is already defined in this scope or an enclosing one")]
    DuplicateBinding(String),
    #[error("'{0}' is only permitted at the root scope")]
    RootOnly(String),
    #[error("cannot watch from '{0}': no state with that name has been declared")]
    UnknownWatcher(String),
    #[error("undefined name {0}")]
    UndefinedName(String),
    #[error("arity mismatch: expected {expected} components, found {found}")]
    Arity { expected: usize, found: usize },
    #[error("{0} is not callable")]
    NotCallable(String),
    #[error("no expression recorded for state '{0}'")]
    MissingExpression(String),
    #[error("state '{0}' has no body")]
    MissingStateBody(String),
    #[error("state '{state}' can only watch names, found {found}")]
    InvalidWatch { state: String, found: String },
    #[error("{name}: {message}")]
    Builtin { name: String, message: String },
}

pub type EvalResult<T> = Result<T, EvalError>;

impl EvalError {
    pub fn builtin<S: Into<String>>(name: &str, message: S) -> Self {
        EvalError::Builtin {
            name: name.to_string(),
            message: message.into(),
        }
    }
}
