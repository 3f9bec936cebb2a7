use thiserror::Error;

#[derive(Error, Debug)]
pub enum KerndiscError {
    #[error("Shape mismatch: x has {x_len} values, y has {y_len}")]
    ShapeMismatch { x_len: usize, y_len: usize },

    #[error("Invalid bound: {0}")]
    InvalidBound(String),

    #[error("Invalid kernel expression: {0}")]
    InvalidExpression(String),

    #[error("Invalid kernel node: {0}")]
    InvalidNode(String),

    #[error("Grammar generated an invalid expression: {0}")]
    GrammarViolation(String),

    #[error("Kernel is not decomposable: {0}")]
    NotDecomposable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Configuration source error: {0}")]
    ConfigSource(#[from] ::config::ConfigError),

    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, KerndiscError>;
