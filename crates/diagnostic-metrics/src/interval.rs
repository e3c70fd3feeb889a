//! Interval primitives: exact binomial bounds on the count scale, the
//! normal z-quantile, and the logit-scale delta interval.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use statrs::distribution::{Beta, Binomial, ContinuousCDF, DiscreteCDF, Normal};

use crate::error::{ensure_open_unit, DiagnosticError, Result};
use crate::transform::{inv_logit, logit};

/// Bisection steps for beta quantiles; enough to reach f64 resolution on [0, 1].
const BISECTION_STEPS: usize = 64;

/// A two-sided interval, serialised as the pair `[lower, upper]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

impl ConfidenceInterval {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    /// Like [`contains`](Self::contains) with both bounds relaxed by `tolerance`.
    pub fn contains_with_tolerance(&self, value: f64, tolerance: f64) -> bool {
        self.lower - tolerance <= value && value <= self.upper + tolerance
    }

    pub fn is_finite(&self) -> bool {
        self.lower.is_finite() && self.upper.is_finite()
    }

    /// Divides both bounds, e.g. to turn a count interval into a proportion.
    pub fn scaled_down(&self, divisor: f64) -> Self {
        Self::new(self.lower / divisor, self.upper / divisor)
    }
}

impl From<(f64, f64)> for ConfidenceInterval {
    fn from((lower, upper): (f64, f64)) -> Self {
        Self::new(lower, upper)
    }
}

impl From<ConfidenceInterval> for (f64, f64) {
    fn from(ci: ConfidenceInterval) -> Self {
        (ci.lower, ci.upper)
    }
}

/// How sensitivity and specificity bounds are derived from the binomial model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum IntervalMethod {
    /// Exact Clopper-Pearson interval from beta quantiles.
    #[default]
    ClopperPearson,
    /// Central interval of Binomial(n, p̂): the counts expected to hold the
    /// middle `confidence` share of outcomes if p̂ were the true rate.
    BinomialQuantile,
}

impl IntervalMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntervalMethod::ClopperPearson => "clopper-pearson",
            IntervalMethod::BinomialQuantile => "binomial-quantile",
        }
    }
}

impl fmt::Display for IntervalMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntervalMethod {
    type Err = DiagnosticError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "clopper-pearson" | "clopper_pearson" | "exact" => Ok(IntervalMethod::ClopperPearson),
            "binomial-quantile" | "binomial_quantile" | "quantile" => {
                Ok(IntervalMethod::BinomialQuantile)
            }
            other => Err(DiagnosticError::Config(format!(
                "unknown interval method '{}'",
                other
            ))),
        }
    }
}

/// Two-sided binomial interval for `successes` out of `trials`, on the count
/// scale. Divide by `trials` to get bounds on the proportion.
pub fn binomial_count_interval(
    successes: u64,
    trials: u64,
    confidence: f64,
    method: IntervalMethod,
) -> Result<ConfidenceInterval> {
    ensure_open_unit("confidence", confidence)?;
    if successes > trials {
        return Err(DiagnosticError::Distribution(format!(
            "{} successes exceed {} trials",
            successes, trials
        )));
    }

    let alpha = 1.0 - confidence;
    match method {
        IntervalMethod::ClopperPearson => clopper_pearson(successes, trials, alpha),
        IntervalMethod::BinomialQuantile => binomial_quantile(successes, trials, alpha),
    }
}

/// Standard normal quantile for a two-sided interval at `confidence`.
pub fn z_quantile(confidence: f64) -> Result<f64> {
    ensure_open_unit("confidence", confidence)?;
    let normal =
        Normal::new(0.0, 1.0).map_err(|e| DiagnosticError::Distribution(e.to_string()))?;
    Ok(normal.inverse_cdf(1.0 - (1.0 - confidence) / 2.0))
}

/// Symmetric interval on the logit scale, mapped back to probabilities.
///
/// `variance` is the asymptotic variance of `logit(estimate)`.
pub fn logit_delta_interval(estimate: f64, variance: f64, z: f64) -> ConfidenceInterval {
    let center = logit(estimate);
    let half_width = z * variance.sqrt();
    ConfidenceInterval::new(inv_logit(center - half_width), inv_logit(center + half_width))
}

fn clopper_pearson(x: u64, n: u64, alpha: f64) -> Result<ConfidenceInterval> {
    let (xf, nf) = (x as f64, n as f64);

    let lower = if x == 0 {
        0.0
    } else {
        beta_quantile(xf, nf - xf + 1.0, alpha / 2.0)?
    };
    let upper = if x == n {
        1.0
    } else {
        beta_quantile(xf + 1.0, nf - xf, 1.0 - alpha / 2.0)?
    };

    Ok(ConfidenceInterval::new(lower * nf, upper * nf))
}

fn binomial_quantile(x: u64, n: u64, alpha: f64) -> Result<ConfidenceInterval> {
    let p = x as f64 / n as f64;
    let binomial =
        Binomial::new(p, n).map_err(|e| DiagnosticError::Distribution(e.to_string()))?;

    let lower = smallest_count_reaching(&binomial, n, alpha / 2.0);
    let upper = smallest_count_reaching(&binomial, n, 1.0 - alpha / 2.0);

    Ok(ConfidenceInterval::new(lower as f64, upper as f64))
}

/// Smallest k in [0, n] with CDF(k) >= q.
fn smallest_count_reaching(binomial: &Binomial, n: u64, q: f64) -> u64 {
    let (mut lo, mut hi) = (0u64, n);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if binomial.cdf(mid) >= q {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }
    lo
}

/// Quantile of Beta(a, b) by bisection on the CDF.
fn beta_quantile(a: f64, b: f64, p: f64) -> Result<f64> {
    let beta = Beta::new(a, b).map_err(|e| DiagnosticError::Distribution(e.to_string()))?;

    let (mut lo, mut hi) = (0.0_f64, 1.0_f64);
    for _ in 0..BISECTION_STEPS {
        let mid = 0.5 * (lo + hi);
        if beta.cdf(mid) < p {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok(0.5 * (lo + hi))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_clopper_pearson_reference() {
        // 95/100 at 95%: (0.8872, 0.9836)
        let ci = binomial_count_interval(95, 100, 0.95, IntervalMethod::ClopperPearson)
            .unwrap()
            .scaled_down(100.0);

        assert_abs_diff_eq!(ci.lower, 0.88716, epsilon = 1e-4);
        assert_abs_diff_eq!(ci.upper, 0.98357, epsilon = 1e-4);
    }

    #[test]
    fn test_clopper_pearson_extremes() {
        let none = binomial_count_interval(0, 20, 0.95, IntervalMethod::ClopperPearson).unwrap();
        assert_eq!(none.lower, 0.0);
        // Upper bound for 0/n is 1 - (alpha/2)^(1/n)
        let expected = 1.0 - 0.025_f64.powf(1.0 / 20.0);
        assert_abs_diff_eq!(none.upper / 20.0, expected, epsilon = 1e-9);

        let all = binomial_count_interval(20, 20, 0.95, IntervalMethod::ClopperPearson).unwrap();
        assert_eq!(all.upper, 20.0);
        assert_abs_diff_eq!(all.lower / 20.0, 0.025_f64.powf(1.0 / 20.0), epsilon = 1e-9);
    }

    #[test]
    fn test_binomial_quantile_counts() {
        let ci = binomial_count_interval(95, 100, 0.95, IntervalMethod::BinomialQuantile).unwrap();

        assert_eq!(ci.lower, 90.0);
        assert_eq!(ci.upper, 99.0);
    }

    #[test]
    fn test_binomial_quantile_degenerate_rate() {
        let ci = binomial_count_interval(10, 10, 0.95, IntervalMethod::BinomialQuantile).unwrap();

        assert_eq!(ci.lower, 10.0);
        assert_eq!(ci.upper, 10.0);
    }

    #[test]
    fn test_interval_rejects_bad_input() {
        assert!(binomial_count_interval(5, 10, 1.0, IntervalMethod::ClopperPearson).is_err());
        assert!(binomial_count_interval(5, 10, 0.0, IntervalMethod::BinomialQuantile).is_err());
        assert!(binomial_count_interval(11, 10, 0.95, IntervalMethod::ClopperPearson).is_err());
    }

    #[test]
    fn test_z_quantile() {
        assert_relative_eq!(z_quantile(0.95).unwrap(), 1.959964, epsilon = 1e-5);
        assert_relative_eq!(z_quantile(0.90).unwrap(), 1.644854, epsilon = 1e-5);
        assert_relative_eq!(z_quantile(0.99).unwrap(), 2.575829, epsilon = 1e-5);
        assert!(z_quantile(1.2).is_err());
    }

    #[test]
    fn test_logit_delta_interval_brackets_estimate() {
        let ci = logit_delta_interval(0.3, 0.04, 1.96);

        assert!(ci.lower > 0.0 && ci.upper < 1.0);
        assert!(ci.contains(0.3));
        // Symmetric on the logit scale, not on the probability scale
        assert_relative_eq!(
            logit(ci.upper) - logit(0.3),
            logit(0.3) - logit(ci.lower),
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_logit_delta_interval_infinite_variance() {
        let ci = logit_delta_interval(0.3, f64::INFINITY, 1.96);

        assert_eq!(ci.lower, 0.0);
        assert_eq!(ci.upper, 1.0);
    }

    #[test]
    fn test_interval_method_parsing() {
        assert_eq!(
            "Clopper-Pearson".parse::<IntervalMethod>().unwrap(),
            IntervalMethod::ClopperPearson
        );
        assert_eq!(
            "binomial_quantile".parse::<IntervalMethod>().unwrap(),
            IntervalMethod::BinomialQuantile
        );
        assert!("wald".parse::<IntervalMethod>().is_err());
        assert_eq!(IntervalMethod::BinomialQuantile.to_string(), "binomial-quantile");
    }

    #[test]
    fn test_interval_serialises_as_pair() {
        let ci = ConfidenceInterval::new(0.25, 0.75);
        assert_eq!(serde_json::to_string(&ci).unwrap(), "[0.25,0.75]");

        let back: ConfidenceInterval = serde_json::from_str("[0.1,0.2]").unwrap();
        assert_eq!(back, ConfidenceInterval::new(0.1, 0.2));
    }
}
