//! Log-odds transforms used to keep predictive-value intervals inside (0, 1).

/// Log-odds of a probability: `ln(p / (1 - p))`.
///
/// Defined for `p` in (0, 1). Returns `-inf` at 0, `+inf` at 1 and NaN
/// outside [0, 1].
pub fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

/// Logistic function, the inverse of [`logit`]: `exp(l) / (1 + exp(l))`.
///
/// Evaluated as `1 / (1 + exp(-l))` for non-negative `l` so large inputs
/// saturate at 1 instead of overflowing to NaN.
pub fn inv_logit(l: f64) -> f64 {
    if l >= 0.0 {
        1.0 / (1.0 + (-l).exp())
    } else {
        let e = l.exp();
        e / (1.0 + e)
    }
}
