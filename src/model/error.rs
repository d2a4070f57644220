//! Error types for model fitting and comparison

use thiserror::Error;

use crate::pipeline::schema::SchemaError;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model '{model}': no complete observations for {formula}")]
    NoObservations { model: String, formula: String },

    #[error("model '{model}': variable '{variable}' not found in the regression table")]
    MissingVariable { model: String, variable: String },

    #[error("Poisson outcome must be non-negative, found {value} at row {row}")]
    NegativeCount { row: usize, value: f64 },

    #[error("design matrix has no estimable columns")]
    EmptyDesign,

    #[error("cannot compare '{reduced}' with '{full}': {reason}")]
    IncompatibleModels {
        reduced: String,
        full: String,
        reason: String,
    },

    #[error("distribution error: {0}")]
    Distribution(String),

    #[error(transparent)]
    Schema(#[from] SchemaError),
}
