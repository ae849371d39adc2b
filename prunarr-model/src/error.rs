use std::fmt::{self, Display};

/// Errors produced by model constructors and criteria parsing.
#[derive(Debug)]
pub enum ModelError {
    InvalidCriteria(String),
    Serialization(serde_json::Error),
}

impl Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::InvalidCriteria(msg) => {
                write!(f, "invalid criteria: {msg}")
            }
            ModelError::Serialization(err) => {
                write!(f, "serialization error: {err}")
            }
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::InvalidCriteria(_) => None,
            ModelError::Serialization(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::Serialization(err)
    }
}

pub type Result<T> = std::result::Result<T, ModelError>;
