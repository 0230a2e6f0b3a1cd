use thiserror::Error;

/// Failures that stop a PT-JPL run before or during field resolution.
///
/// Numerical degeneracies (zero denominators and the like) are never errors;
/// every kernel resolves them to a fixed fallback value instead.
#[derive(Error, Debug)]
pub enum PtJplError {
    #[error("field `{field}` has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        field: &'static str,
        expected: (usize, usize),
        found: (usize, usize),
    },
    #[error("missing input `{field}` required by {needed_by}")]
    MissingInput {
        field: &'static str,
        needed_by: &'static str,
    },
    #[error("{estimator} could not produce a value: {reason}")]
    EstimatorFailed {
        estimator: &'static str,
        reason: String,
    },
    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience type for `Result<T, PtJplError>`.
pub type Result<T> = std::result::Result<T, PtJplError>;

#[cfg(feature = "python")]
impl From<PtJplError> for pyo3::PyErr {
    fn from(err: PtJplError) -> Self {
        match err {
            PtJplError::Io(e) => pyo3::exceptions::PyIOError::new_err(e.to_string()),
            other => pyo3::exceptions::PyValueError::new_err(other.to_string()),
        }
    }
}
