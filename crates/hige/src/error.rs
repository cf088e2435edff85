//! Error types for the hige renderer.

use std::convert::Infallible;

use thiserror::Error;

pub use hige_ast::{LoaderError, ParseError};

/// All errors that can occur in hige
#[derive(Error, Debug)]
pub enum HigeError {
    #[error("Key not found: '{key}'")]
    KeyNotFound { key: String },

    #[error("Unsupported binding type: {message}")]
    UnsupportedBindingType { message: String },

    #[error("Recursion limit of {limit} exceeded while expanding '{name}'")]
    RecursionLimitExceeded { name: String, limit: usize },

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Partial error: {message}")]
    Partial { message: String },

    #[error("Partial loader error: {0}")]
    Loader(LoaderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<Infallible> for HigeError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

/// Result type alias for hige operations
pub type Result<T> = std::result::Result<T, HigeError>;
