use std::env;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ensure_open_unit, DiagnosticError, Result};
use crate::interval::IntervalMethod;

pub const DEFAULT_CONFIDENCE: f64 = 0.95;

/// How the estimator reacts to edge-of-domain inputs and results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Reject empty margins, out-of-range probabilities and non-finite results.
    #[default]
    Strict,
    /// Evaluate the formulas as written and let NaN/inf reach the caller.
    Unchecked,
}

impl ValidationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationMode::Strict => "strict",
            ValidationMode::Unchecked => "unchecked",
        }
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationMode {
    type Err = DiagnosticError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(ValidationMode::Strict),
            "unchecked" | "raw" => Ok(ValidationMode::Unchecked),
            other => Err(DiagnosticError::Config(format!(
                "unknown validation mode '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    /// Two-sided confidence level for every interval (e.g., 0.95 = 95%)
    pub confidence: f64,

    /// Method for the sensitivity and specificity intervals
    pub interval_method: IntervalMethod,

    pub validation: ValidationMode,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            confidence: DEFAULT_CONFIDENCE,
            interval_method: IntervalMethod::default(),
            validation: ValidationMode::default(),
        }
    }
}

impl EstimatorConfig {
    /// Reads `DIAGNOSTIC_CONFIDENCE`, `DIAGNOSTIC_INTERVAL_METHOD` and
    /// `DIAGNOSTIC_VALIDATION`, falling back to the defaults.
    pub fn from_env() -> Result<Self> {
        let confidence = env::var("DIAGNOSTIC_CONFIDENCE")
            .unwrap_or_else(|_| DEFAULT_CONFIDENCE.to_string())
            .parse::<f64>()
            .map_err(|e| DiagnosticError::Config(format!("DIAGNOSTIC_CONFIDENCE: {}", e)))?;
        let interval_method = env::var("DIAGNOSTIC_INTERVAL_METHOD")
            .unwrap_or_else(|_| IntervalMethod::default().to_string())
            .parse::<IntervalMethod>()?;
        let validation = env::var("DIAGNOSTIC_VALIDATION")
            .unwrap_or_else(|_| ValidationMode::default().to_string())
            .parse::<ValidationMode>()?;

        let config = Self {
            confidence,
            interval_method,
            validation,
        };
        config.validate()?;

        tracing::debug!(
            confidence = config.confidence,
            interval_method = %config.interval_method,
            validation = %config.validation,
            "Loaded estimator config from environment"
        );

        Ok(config)
    }

    /// Loads a `.env` file, if present, before reading the environment.
    pub fn from_dotenv() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    pub fn validate(&self) -> Result<()> {
        ensure_open_unit("confidence", self.confidence)?;
        Ok(())
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_interval_method(mut self, interval_method: IntervalMethod) -> Self {
        self.interval_method = interval_method;
        self
    }

    pub fn with_validation(mut self, validation: ValidationMode) -> Self {
        self.validation = validation;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        env::remove_var("DIAGNOSTIC_CONFIDENCE");
        env::remove_var("DIAGNOSTIC_INTERVAL_METHOD");
        env::remove_var("DIAGNOSTIC_VALIDATION");
    }

    #[test]
    fn test_defaults() {
        let config = EstimatorConfig::default();

        assert_eq!(config.confidence, 0.95);
        assert_eq!(config.interval_method, IntervalMethod::ClopperPearson);
        assert_eq!(config.validation, ValidationMode::Strict);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_env_defaults() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        assert_eq!(EstimatorConfig::from_env().unwrap(), EstimatorConfig::default());
    }

    #[test]
    fn test_from_env_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("DIAGNOSTIC_CONFIDENCE", "0.9");
        env::set_var("DIAGNOSTIC_INTERVAL_METHOD", "binomial-quantile");
        env::set_var("DIAGNOSTIC_VALIDATION", "unchecked");

        let config = EstimatorConfig::from_env().unwrap();
        clear_env();

        assert_eq!(config.confidence, 0.9);
        assert_eq!(config.interval_method, IntervalMethod::BinomialQuantile);
        assert_eq!(config.validation, ValidationMode::Unchecked);
    }

    #[test]
    fn test_from_env_rejects_bad_values() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();

        env::set_var("DIAGNOSTIC_CONFIDENCE", "ninety");
        assert!(matches!(
            EstimatorConfig::from_env(),
            Err(DiagnosticError::Config(_))
        ));

        env::set_var("DIAGNOSTIC_CONFIDENCE", "1.5");
        assert!(matches!(
            EstimatorConfig::from_env(),
            Err(DiagnosticError::InvalidProbability { name: "confidence", .. })
        ));

        clear_env();
        env::set_var("DIAGNOSTIC_VALIDATION", "lenient");
        assert!(EstimatorConfig::from_env().is_err());
        clear_env();
    }

    #[test]
    fn test_builders() {
        let config = EstimatorConfig::default()
            .with_confidence(0.99)
            .with_interval_method(IntervalMethod::BinomialQuantile)
            .with_validation(ValidationMode::Unchecked);

        assert_eq!(config.confidence, 0.99);
        assert_eq!(config.interval_method, IntervalMethod::BinomialQuantile);
        assert_eq!(config.validation, ValidationMode::Unchecked);
    }
}
