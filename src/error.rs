use thiserror::Error;

/// Matrix stack discipline failures. These abort the frame being rendered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StackError {
    #[error("matrix stack underflow: pop without a matching push")]
    Underflow,
    #[error("matrix stack left unbalanced by `{object}`: depth {before} before, {after} after")]
    Unbalanced {
        object: String,
        before: usize,
        after: usize,
    },
}

/// Errors raised when the parameter panel is asked to edit a field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PanelError {
    #[error("invalid field path `{0}`")]
    InvalidPath(String),
    #[error("no control is bound to `{0}`")]
    UnknownField(String),
    #[error("control `{0}` is read-only")]
    ReadOnly(String),
    #[error("control `{path}` expects a {expected} value")]
    TypeMismatch { path: String, expected: &'static str },
}
