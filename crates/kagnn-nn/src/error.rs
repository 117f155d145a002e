//! Error types for kagnn-nn.

use thiserror::Error;

/// Graph model error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Candle tensor error.
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// KAN construction error.
    #[error("KAN error: {0}")]
    Kan(#[from] kagnn_kan::Error),

    /// Invalid configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Malformed graph input (connectivity or assignment).
    #[error("invalid graph: {0}")]
    InvalidGraph(String),

    /// Categorical index outside its vocabulary.
    #[error("feature column {column}: index {value} out of range for cardinality {cardinality}")]
    FeatureOutOfRange {
        column: usize,
        value: i64,
        cardinality: usize,
    },

    /// Raw value with no vocabulary entry and no `misc` bucket.
    #[error("value {value} is not in the {feature} vocabulary")]
    UnknownFeatureValue { feature: &'static str, value: String },

    /// Config (de)serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
