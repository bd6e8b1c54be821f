//! Error types for the peercheck core library.

/// Top-level error enum for the peercheck core library.
///
/// Only the feature loader and configuration layer can fail; the walker and
/// the NAP spec resolver record problems as issues or warnings instead.
#[derive(Debug, thiserror::Error)]
pub enum PeercheckError {
    #[error("Load error: {0}")]
    Load(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(feature = "python")]
impl From<PeercheckError> for pyo3::PyErr {
    fn from(err: PeercheckError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
        match &err {
            PeercheckError::Load(_) => PyRuntimeError::new_err(err.to_string()),
            PeercheckError::Config(_) => PyValueError::new_err(err.to_string()),
            PeercheckError::Io(_) => PyIOError::new_err(err.to_string()),
            PeercheckError::Json(_) => PyValueError::new_err(err.to_string()),
        }
    }
}

pub type PeercheckResult<T> = Result<T, PeercheckError>;
