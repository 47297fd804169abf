// src/math.rs
//
// Small, dependency-free numeric helpers shared by the policy forward pass,
// the uncertainty estimators, and the acquisition scorer.
// - stabilised softmax (max subtraction before exponentiation)
// - Shannon entropy in bits (log2)
// - dot product / Euclidean distance
// - population mean / variance
// - canonical state keys (fixed-precision rounding, joined)
//
// Intentionally simple + deterministic.

/// Decimal precision used when canonicalising state vectors into cache keys.
pub const CANONICAL_PRECISION: u32 = 4;

/// Softmax with max subtraction for numerical stability.
///
/// Returns a uniform distribution for an empty or all-non-finite input
/// rather than NaN-propagating.
pub fn softmax(scores: &[f64]) -> Vec<f64> {
    if scores.is_empty() {
        return Vec::new();
    }

    let max = scores
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);

    if !max.is_finite() {
        let p = 1.0 / scores.len() as f64;
        return vec![p; scores.len()];
    }

    let exps: Vec<f64> = scores.iter().map(|&s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    if sum <= 0.0 || !sum.is_finite() {
        let p = 1.0 / scores.len() as f64;
        return vec![p; scores.len()];
    }

    exps.into_iter().map(|e| e / sum).collect()
}

/// Shannon entropy of a probability distribution, in bits.
///
/// Zero-probability entries contribute nothing (0 * log2(0) := 0).
pub fn entropy_bits(probs: &[f64]) -> f64 {
    probs
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| -p * p.log2())
        .sum()
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Euclidean distance between two vectors. Trailing coordinates of the
/// longer vector are compared against zero, so vectors of different
/// lengths still produce a finite distance.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().max(b.len());
    let mut sum = 0.0;
    for i in 0..n {
        let x = a.get(i).copied().unwrap_or(0.0);
        let y = b.get(i).copied().unwrap_or(0.0);
        let d = x - y;
        sum += d * d;
    }
    sum.sqrt()
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Population variance (divide by n).
pub fn variance_population(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|&v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64
}

/// Canonicalise a state vector into a stable string key.
///
/// Coordinates are rounded to `CANONICAL_PRECISION` decimals and joined
/// with commas. Two states that round to the same coordinates share a key,
/// which is exactly the granularity the uncertainty cache and the
/// duplicate-query guard want.
pub fn canonical_state_key(state: &[f64]) -> String {
    let scale = 10f64.powi(CANONICAL_PRECISION as i32);
    let parts: Vec<String> = state
        .iter()
        .map(|&v| {
            let r = (v * scale).round() / scale;
            // Normalise -0.0 so it keys identically to 0.0.
            let r = if r == 0.0 { 0.0 } else { r };
            format!("{:.prec$}", r, prec = CANONICAL_PRECISION as usize)
        })
        .collect();
    parts.join(",")
}
