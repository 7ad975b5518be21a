use thiserror::Error;

pub type Result<T> = std::result::Result<T, KnnSurvivalError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum KnnSurvivalError {
    #[error("bad input: {message}")]
    InvalidInput { message: String },

    #[error("feature dimensions don't match: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("invalid k = {k} (reference pool has {available} subjects)")]
    InvalidK { k: usize, available: usize },

    #[error("model not fitted yet - call fit() first")]
    ModelNotFitted,

    #[error("no comparable pairs - concordance is undefined")]
    NoComparablePairs,

    #[error("bad parameter: {parameter} = {value}")]
    InvalidParameter { parameter: String, value: String },

    #[error("survival data is broken: {message}")]
    InvalidSurvivalData { message: String },

    #[error("serialization failed: {message}")]
    Serialization { message: String },
}

impl KnnSurvivalError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput { message: message.into() }
    }

    pub fn dimension_mismatch(expected: usize, got: usize) -> Self {
        Self::DimensionMismatch { expected, got }
    }

    pub fn invalid_k(k: usize, available: usize) -> Self {
        Self::InvalidK { k, available }
    }

    pub fn invalid_parameter(parameter: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.into(),
            value: value.into(),
        }
    }

    pub fn invalid_survival_data(message: impl Into<String>) -> Self {
        Self::InvalidSurvivalData { message: message.into() }
    }
}

impl From<serde_json::Error> for KnnSurvivalError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization { message: err.to_string() }
    }
}
