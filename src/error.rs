use std::{
    error::Error,
    fmt::{self, Display},
    io,
};

/// The result type used in the entire crate.
pub type Result<T> = std::result::Result<T, OptimErr>;

/// The crate's error type.
#[derive(Debug)]
pub enum OptimErr {
    /// A strategy variant that is declared but has no implementation.
    NotImplemented { what: &'static str },
    /// An operation was applied to a `Value` variant it does not support.
    TypeMismatch { op: &'static str, got: &'static str },
    /// Two tensors could not be combined.
    ShapeMismatch {
        op: &'static str,
        lhs: Vec<usize>,
        rhs: Vec<usize>,
    },
    /// A configuration or data invariant was violated.
    InvalidInput(&'static str),
    Io(io::Error),
    Json(serde_json::Error),
}

impl Display for OptimErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimErr::NotImplemented { what } => write!(f, "{what} is not implemented"),
            OptimErr::TypeMismatch { op, got } => {
                write!(f, "{op} does not support a value of kind {got}")
            }
            OptimErr::ShapeMismatch { op, lhs, rhs } => write!(
                f,
                "There's a shape mismatch in {op}, got {lhs:?} and {rhs:?}"
            ),
            OptimErr::InvalidInput(msg) => write!(f, "invalid input: {msg}"),
            OptimErr::Io(e) => write!(f, "io error: {e}"),
            OptimErr::Json(e) => write!(f, "invalid configuration: {e}"),
        }
    }
}

impl Error for OptimErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            OptimErr::Io(e) => Some(e),
            OptimErr::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for OptimErr {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for OptimErr {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}
