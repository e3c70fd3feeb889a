//! Diagnostic Metrics
//!
//! Sensitivity, specificity and prevalence-adjusted predictive values for a
//! binary diagnostic test, with confidence intervals: exact binomial
//! intervals for Se/Sp and logit-scale delta-method intervals for PPV/NPV.

pub mod config;
pub mod counts;
pub mod error;
pub mod estimates;
pub mod interval;
pub mod transform;

pub use config::{EstimatorConfig, ValidationMode, DEFAULT_CONFIDENCE};
pub use counts::ConfusionCounts;
pub use error::{DiagnosticError, Result};
pub use estimates::{
    calculate_estimates, calculate_estimates_default, logit_predictive_variances,
    predictive_values, DiagnosticEstimates, Estimator, Metric,
};
pub use interval::{
    binomial_count_interval, logit_delta_interval, z_quantile, ConfidenceInterval, IntervalMethod,
};
pub use transform::{inv_logit, logit};
