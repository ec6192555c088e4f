//! AST loading errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported JSON value in AST: {0}")]
    UnsupportedValue(String),

    #[error("Malformed scanner token '{tag}': {reason}")]
    MalformedToken { tag: String, reason: String },

    #[error("Expected an AST node, found {0}")]
    NotANode(String),
}

pub type LoadResult<T> = Result<T, LoadError>;
