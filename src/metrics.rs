// src/metrics.rs
//
// Sample-efficiency accounting plus small online-stats helpers for the
// research harness. Everything here is derived from the exploration
// history; nothing mutates engine state.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::math;

/// Window length for the learning-curve slope.
const SLOPE_WINDOW: usize = 10;
/// Assumed candidate-universe size for the soft coverage normalisation.
const COVERAGE_UNIVERSE: f64 = 100.0;

/// One (state, action, observed reward) query outcome. Append-only; the
/// canonical ground truth for sample-efficiency metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplorationRecord {
    pub state: Vec<f64>,
    pub action: usize,
    pub reward: f64,
}

/// Sample-efficiency summary derived from the full exploration history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleEfficiency {
    /// Total queries made (history length).
    pub total_samples: usize,
    /// Distinct canonical state keys ever queried.
    pub effective_samples: usize,
    /// 1 - effective / total. Zero for an empty history.
    pub redundancy_rate: f64,
    /// effective / (effective + 100): soft normalisation against an
    /// assumed universe size.
    pub coverage: f64,
    /// Normalized reward delta over the last 10 records.
    pub learning_curve_slope: f64,
}

impl SampleEfficiency {
    pub fn from_history(history: &[ExplorationRecord]) -> Self {
        let total_samples = history.len();

        let mut keys: HashSet<String> = HashSet::with_capacity(total_samples);
        for record in history {
            keys.insert(math::canonical_state_key(&record.state));
        }
        let effective_samples = keys.len();

        let redundancy_rate = if total_samples > 0 {
            1.0 - effective_samples as f64 / total_samples as f64
        } else {
            0.0
        };

        let coverage = effective_samples as f64 / (effective_samples as f64 + COVERAGE_UNIVERSE);

        Self {
            total_samples,
            effective_samples,
            redundancy_rate,
            coverage,
            learning_curve_slope: learning_curve_slope(history),
        }
    }
}

/// Reward delta across the trailing window, normalized by window span.
fn learning_curve_slope(history: &[ExplorationRecord]) -> f64 {
    let window_start = history.len().saturating_sub(SLOPE_WINDOW);
    let window = &history[window_start..];
    if window.len() < 2 {
        return 0.0;
    }
    let first = window[0].reward;
    let last = window[window.len() - 1].reward;
    (last - first) / (window.len() - 1) as f64
}

/// Welford running mean/variance. Used by the harness to summarise
/// per-run outcomes without keeping every sample around.
#[derive(Debug, Clone, Copy, Default)]
pub struct OnlineStats {
    n: u64,
    mean: f64,
    m2: f64,
}

impl OnlineStats {
    /// Adds a sample if finite. Non-finite samples are ignored.
    pub fn add(&mut self, x: f64) {
        if !x.is_finite() {
            return;
        }
        self.n += 1;
        let delta = x - self.mean;
        self.mean += delta / (self.n as f64);
        self.m2 += delta * (x - self.mean);
    }

    pub fn n(&self) -> u64 {
        self.n
    }

    pub fn mean(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            self.mean
        }
    }

    pub fn stddev_population(&self) -> f64 {
        if self.n == 0 {
            0.0
        } else {
            (self.m2 / self.n as f64).sqrt()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(x: f64, reward: f64) -> ExplorationRecord {
        ExplorationRecord {
            state: vec![x, 0.0],
            action: 0,
            reward,
        }
    }

    #[test]
    fn test_empty_history() {
        let eff = SampleEfficiency::from_history(&[]);
        assert_eq!(eff.total_samples, 0);
        assert_eq!(eff.effective_samples, 0);
        assert_eq!(eff.redundancy_rate, 0.0);
        assert_eq!(eff.coverage, 0.0);
        assert_eq!(eff.learning_curve_slope, 0.0);
    }

    #[test]
    fn test_all_unique_has_zero_redundancy() {
        let history: Vec<_> = (0..5).map(|i| record(i as f64, 0.0)).collect();
        let eff = SampleEfficiency::from_history(&history);
        assert_eq!(eff.total_samples, 5);
        assert_eq!(eff.effective_samples, 5);
        assert!(eff.redundancy_rate.abs() < 1e-12);
    }

    #[test]
    fn test_duplicates_raise_redundancy() {
        let history = vec![record(1.0, 0.0), record(1.0, 0.0), record(2.0, 0.0), record(2.0, 0.0)];
        let eff = SampleEfficiency::from_history(&history);
        assert_eq!(eff.effective_samples, 2);
        assert!((eff.redundancy_rate - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_coverage_soft_normalisation() {
        let history: Vec<_> = (0..100).map(|i| record(i as f64, 0.0)).collect();
        let eff = SampleEfficiency::from_history(&history);
        assert!((eff.coverage - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_slope_improving_rewards() {
        let history: Vec<_> = (0..10).map(|i| record(i as f64, i as f64 * 0.1)).collect();
        let eff = SampleEfficiency::from_history(&history);
        assert!((eff.learning_curve_slope - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_slope_uses_trailing_window_only() {
        // 20 flat rewards then a jump inside the final window.
        let mut history: Vec<_> = (0..19).map(|i| record(i as f64, 0.0)).collect();
        history.push(record(99.0, 0.9));
        let eff = SampleEfficiency::from_history(&history);
        assert!((eff.learning_curve_slope - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_online_stats_mean_and_stddev() {
        let mut stats = OnlineStats::default();
        for x in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            stats.add(x);
        }
        assert!((stats.mean() - 5.0).abs() < 1e-12);
        assert!((stats.stddev_population() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_online_stats_ignores_non_finite() {
        let mut stats = OnlineStats::default();
        stats.add(f64::NAN);
        stats.add(1.0);
        assert_eq!(stats.n(), 1);
    }
}
