use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::config::{EstimatorConfig, ValidationMode, DEFAULT_CONFIDENCE};
use crate::counts::ConfusionCounts;
use crate::error::{ensure_open_unit, DiagnosticError, Result};
use crate::interval::{
    binomial_count_interval, logit_delta_interval, z_quantile, ConfidenceInterval,
};

/// The four reported test performance metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    Sensitivity,
    Specificity,
    #[serde(rename = "PPV")]
    Ppv,
    #[serde(rename = "NPV")]
    Npv,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Sensitivity,
        Metric::Specificity,
        Metric::Ppv,
        Metric::Npv,
    ];

    /// Key of the point estimate in the result record
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Sensitivity => "Sensitivity",
            Metric::Specificity => "Specificity",
            Metric::Ppv => "PPV",
            Metric::Npv => "NPV",
        }
    }

    /// Key of the interval in the result record
    pub fn interval_name(&self) -> &'static str {
        match self {
            Metric::Sensitivity => "Sensitivity CI",
            Metric::Specificity => "Specificity CI",
            Metric::Ppv => "PPV CI",
            Metric::Npv => "NPV CI",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Point estimates and confidence intervals for one confusion table at one
/// prevalence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticEstimates {
    #[serde(rename = "Sensitivity")]
    pub sensitivity: f64,

    #[serde(rename = "Specificity")]
    pub specificity: f64,

    /// Exact binomial interval on n1 = TP + FN
    #[serde(rename = "Sensitivity CI")]
    pub sensitivity_ci: ConfidenceInterval,

    /// Exact binomial interval on n0 = FP + TN
    #[serde(rename = "Specificity CI")]
    pub specificity_ci: ConfidenceInterval,

    /// Prevalence-adjusted positive predictive value
    #[serde(rename = "PPV")]
    pub ppv: f64,

    /// Prevalence-adjusted negative predictive value
    #[serde(rename = "NPV")]
    pub npv: f64,

    /// Delta-method interval on the logit scale
    #[serde(rename = "PPV CI")]
    pub ppv_ci: ConfidenceInterval,

    /// Delta-method interval on the logit scale
    #[serde(rename = "NPV CI")]
    pub npv_ci: ConfidenceInterval,
}

impl DiagnosticEstimates {
    pub fn point(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Sensitivity => self.sensitivity,
            Metric::Specificity => self.specificity,
            Metric::Ppv => self.ppv,
            Metric::Npv => self.npv,
        }
    }

    pub fn interval(&self, metric: Metric) -> ConfidenceInterval {
        match metric {
            Metric::Sensitivity => self.sensitivity_ci,
            Metric::Specificity => self.specificity_ci,
            Metric::Ppv => self.ppv_ci,
            Metric::Npv => self.npv_ci,
        }
    }

    /// LR+ = Se / (1 - Sp)
    pub fn positive_likelihood_ratio(&self) -> f64 {
        self.sensitivity / (1.0 - self.specificity)
    }

    /// LR- = (1 - Se) / Sp
    pub fn negative_likelihood_ratio(&self) -> f64 {
        (1.0 - self.sensitivity) / self.specificity
    }

    /// The record as a JSON object keyed by metric name. Non-finite values
    /// become `null`.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for metric in Metric::ALL {
            let ci = self.interval(metric);
            map.insert(metric.name().to_string(), json!(self.point(metric)));
            map.insert(metric.interval_name().to_string(), json!([ci.lower, ci.upper]));
        }
        Value::Object(map)
    }

    fn ensure_finite(&self) -> Result<()> {
        let quantities = [
            ("Sensitivity", self.sensitivity),
            ("Specificity", self.specificity),
            ("PPV", self.ppv),
            ("NPV", self.npv),
            ("Sensitivity CI lower", self.sensitivity_ci.lower),
            ("Sensitivity CI upper", self.sensitivity_ci.upper),
            ("Specificity CI lower", self.specificity_ci.lower),
            ("Specificity CI upper", self.specificity_ci.upper),
            ("PPV CI lower", self.ppv_ci.lower),
            ("PPV CI upper", self.ppv_ci.upper),
            ("NPV CI lower", self.npv_ci.lower),
            ("NPV CI upper", self.npv_ci.upper),
        ];
        match quantities.iter().find(|(_, value)| !value.is_finite()) {
            Some(&(quantity, value)) => Err(DiagnosticError::NonFinite { quantity, value }),
            None => Ok(()),
        }
    }
}

/// Prevalence-adjusted (PPV, NPV) by Bayes' rule.
pub fn predictive_values(sensitivity: f64, specificity: f64, prevalence: f64) -> (f64, f64) {
    let (se, sp, prev) = (sensitivity, specificity, prevalence);
    let ppv = se * prev / (se * prev + (1.0 - sp) * (1.0 - prev));
    let npv = sp * (1.0 - prev) / ((1.0 - se) * prev + sp * (1.0 - prev));
    (ppv, npv)
}

/// Asymptotic variances of (logit PPV, logit NPV) by the delta method.
///
/// Both are infinite when Se or Sp sits exactly on 0 or 1.
pub fn logit_predictive_variances(
    sensitivity: f64,
    specificity: f64,
    n1: f64,
    n0: f64,
) -> (f64, f64) {
    let (se, sp) = (sensitivity, specificity);
    let var_ppv = 1.0 / (se * (1.0 - se) * n1) + 1.0 / ((1.0 - sp) * sp * n0);
    let var_npv = 1.0 / ((1.0 - se) * se * n1) + 1.0 / (sp * (1.0 - sp) * n0);
    (var_ppv, var_npv)
}

/// Computes [`DiagnosticEstimates`] under a fixed [`EstimatorConfig`].
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Estimator {
    config: EstimatorConfig,
}

impl Estimator {
    pub fn new(config: EstimatorConfig) -> Self {
        Self { config }
    }

    /// Default configuration at the given confidence level
    pub fn with_confidence(confidence: f64) -> Self {
        Self::new(EstimatorConfig::default().with_confidence(confidence))
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    pub fn estimate(
        &self,
        counts: &ConfusionCounts,
        prevalence: f64,
    ) -> Result<DiagnosticEstimates> {
        let strict = self.config.validation == ValidationMode::Strict;
        let confidence = self.config.confidence;
        let n1 = counts.condition_positive();
        let n0 = counts.condition_negative();

        if strict {
            if n1 == 0 {
                return Err(DiagnosticError::EmptyMargin {
                    margin: "condition-positive",
                });
            }
            if n0 == 0 {
                return Err(DiagnosticError::EmptyMargin {
                    margin: "condition-negative",
                });
            }
            ensure_open_unit("prevalence", prevalence)?;
            ensure_open_unit("confidence", confidence)?;
        }

        let se = counts.sensitivity();
        let sp = counts.specificity();
        let (ppv, npv) = predictive_values(se, sp, prevalence);

        let (n1f, n0f) = (n1 as f64, n0 as f64);
        let method = self.config.interval_method;
        let sensitivity_ci =
            binomial_count_interval(counts.true_positive, n1, confidence, method)?.scaled_down(n1f);
        let specificity_ci =
            binomial_count_interval(counts.true_negative, n0, confidence, method)?.scaled_down(n0f);

        let (var_ppv, var_npv) = logit_predictive_variances(se, sp, n1f, n0f);

        tracing::debug!(
            n1,
            n0,
            sensitivity = se,
            specificity = sp,
            ppv,
            npv,
            var_logit_ppv = var_ppv,
            var_logit_npv = var_npv,
            "Computed diagnostic point estimates"
        );

        for (metric, variance) in [(Metric::Ppv, var_ppv), (Metric::Npv, var_npv)] {
            if !variance.is_finite() {
                tracing::warn!(
                    "Delta-method variance for logit({}) is {} (Se = {:.4}, Sp = {:.4})",
                    metric,
                    variance,
                    se,
                    sp
                );
                if strict {
                    return Err(DiagnosticError::DegenerateVariance { metric, variance });
                }
            }
        }

        let z = z_quantile(confidence)?;
        let estimates = DiagnosticEstimates {
            sensitivity: se,
            specificity: sp,
            sensitivity_ci,
            specificity_ci,
            ppv,
            npv,
            ppv_ci: logit_delta_interval(ppv, var_ppv, z),
            npv_ci: logit_delta_interval(npv, var_npv, z),
        };

        if strict {
            estimates.ensure_finite()?;
        }

        Ok(estimates)
    }
}

/// Sensitivity, specificity, PPV and NPV with confidence intervals for the
/// table `x11` (TP), `x10` (FP), `x01` (FN), `x00` (TN) at `prevalence`.
///
/// Uses Clopper-Pearson intervals for Se/Sp and logit delta-method intervals
/// for PPV/NPV, with strict validation.
pub fn calculate_estimates(
    x11: u64,
    x10: u64,
    x01: u64,
    x00: u64,
    prevalence: f64,
    confidence: f64,
) -> Result<DiagnosticEstimates> {
    ConfusionCounts::new(x11, x10, x01, x00).estimate(prevalence, confidence)
}

/// [`calculate_estimates`] at the default 95% confidence level.
pub fn calculate_estimates_default(
    x11: u64,
    x10: u64,
    x01: u64,
    x00: u64,
    prevalence: f64,
) -> Result<DiagnosticEstimates> {
    calculate_estimates(x11, x10, x01, x00, prevalence, DEFAULT_CONFIDENCE)
}
