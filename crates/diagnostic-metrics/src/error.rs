use thiserror::Error;

use crate::estimates::Metric;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiagnosticError {
    #[error("Empty margin: {margin} count is zero")]
    EmptyMargin { margin: &'static str },

    #[error("Invalid probability: {name} = {value} is not strictly between 0 and 1")]
    InvalidProbability { name: &'static str, value: f64 },

    #[error("Degenerate variance for logit({metric}): {variance}")]
    DegenerateVariance { metric: Metric, variance: f64 },

    #[error("Non-finite result: {quantity} = {value}")]
    NonFinite { quantity: &'static str, value: f64 },

    #[error("Distribution error: {0}")]
    Distribution(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, DiagnosticError>;

/// Rejects values outside the open unit interval, NaN included.
pub(crate) fn ensure_open_unit(name: &'static str, value: f64) -> Result<f64> {
    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(DiagnosticError::InvalidProbability { name, value })
    }
}
