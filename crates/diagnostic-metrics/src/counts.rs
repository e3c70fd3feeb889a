use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::estimates::{DiagnosticEstimates, Estimator};

/// A 2x2 confusion table of test outcome against true condition.
///
/// ```text
///               condition +   condition -
///   test +        x11 (TP)      x10 (FP)
///   test -        x01 (FN)      x00 (TN)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfusionCounts {
    pub true_positive: u64,
    pub false_positive: u64,
    pub false_negative: u64,
    pub true_negative: u64,
}

impl ConfusionCounts {
    /// Builds the table in `(x11, x10, x01, x00)` order.
    pub fn new(
        true_positive: u64,
        false_positive: u64,
        false_negative: u64,
        true_negative: u64,
    ) -> Self {
        Self {
            true_positive,
            false_positive,
            false_negative,
            true_negative,
        }
    }

    /// n1 = TP + FN
    pub fn condition_positive(&self) -> u64 {
        self.true_positive + self.false_negative
    }

    /// n0 = FP + TN
    pub fn condition_negative(&self) -> u64 {
        self.false_positive + self.true_negative
    }

    pub fn total(&self) -> u64 {
        self.condition_positive() + self.condition_negative()
    }

    /// TP / (TP + FN). NaN when there are no condition-positive subjects.
    pub fn sensitivity(&self) -> f64 {
        self.true_positive as f64 / self.condition_positive() as f64
    }

    /// TN / (FP + TN). NaN when there are no condition-negative subjects.
    pub fn specificity(&self) -> f64 {
        self.true_negative as f64 / self.condition_negative() as f64
    }

    /// Estimates with the default configuration at the given confidence.
    pub fn estimate(&self, prevalence: f64, confidence: f64) -> Result<DiagnosticEstimates> {
        Estimator::with_confidence(confidence).estimate(self, prevalence)
    }
}
