// src/acquisition.rs
//
// Acquisition scoring and batch query selection.
//
// The score blends uncertainty, anticipated information gain, and batch
// diversity:
//
//   priority = (1 - w) * entropy + w * diversity + 0.1 * value_of_information
//
// Diversity is greedy-sequential, not batch-joint: each pick scores the
// remaining candidates against the selections already made in this batch
// (tanh of the minimum Euclidean distance, 1.0 while the batch is empty),
// so later picks are pushed away from earlier ones.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::gain::InformationGain;
use crate::math;
use crate::uncertainty::UncertaintyEstimate;

/// Weight of the anticipated information gain term in the priority score.
const GAIN_WEIGHT: f64 = 0.1;

/// Per-batch selection record. Created fresh for each batch-selection
/// call; never persisted beyond the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySelection {
    /// Index of the state in the caller's candidate list.
    pub state_index: usize,
    pub state: Vec<f64>,
    pub uncertainty: UncertaintyEstimate,
    pub information_gain: InformationGain,
    /// Diversity relative to earlier picks in this batch at selection time.
    pub diversity: f64,
    /// Final blended acquisition score.
    pub priority: f64,
}

/// Select up to `batch_size` queries from the candidates.
///
/// Candidates whose canonical key is already in `queried` are skipped, so
/// the no-repeat guarantee holds within and across batches. `estimate` is
/// called once per surviving candidate; the engine backs it with its
/// uncertainty cache.
pub fn select_query_batch<F>(
    candidates: &[Vec<f64>],
    batch_size: usize,
    diversity_weight: f64,
    queried: &HashSet<String>,
    mut estimate: F,
) -> EngineResult<Vec<QuerySelection>>
where
    F: FnMut(&[f64]) -> EngineResult<(UncertaintyEstimate, InformationGain)>,
{
    struct Scored {
        state_index: usize,
        uncertainty: UncertaintyEstimate,
        gain: InformationGain,
    }

    // 1) Drop already-queried candidates and dedupe within the call, so
    //    two candidates rounding to the same key cannot both be picked.
    let mut seen: HashSet<String> = HashSet::new();
    let mut pool: Vec<Scored> = Vec::new();
    for (i, state) in candidates.iter().enumerate() {
        let key = math::canonical_state_key(state);
        if queried.contains(&key) || !seen.insert(key) {
            continue;
        }
        let (uncertainty, gain) = estimate(state)?;
        pool.push(Scored {
            state_index: i,
            uncertainty,
            gain,
        });
    }

    // 2) Greedy sequential selection: re-score the pool against the
    //    accumulating batch and take the best each round.
    let mut selected: Vec<QuerySelection> = Vec::new();
    while selected.len() < batch_size && !pool.is_empty() {
        let mut best: Option<(usize, f64, f64)> = None; // (pool idx, priority, diversity)

        for (pi, cand) in pool.iter().enumerate() {
            let state = &candidates[cand.state_index];
            let diversity = batch_diversity(state, &selected);
            let priority = (1.0 - diversity_weight) * cand.uncertainty.entropy
                + diversity_weight * diversity
                + GAIN_WEIGHT * cand.gain.value_of_information;

            let better = match best {
                None => true,
                Some((_, best_priority, _)) => priority > best_priority,
            };
            if better {
                best = Some((pi, priority, diversity));
            }
        }

        let (pi, priority, diversity) = match best {
            Some(b) => b,
            None => break,
        };
        let picked = pool.swap_remove(pi);
        selected.push(QuerySelection {
            state_index: picked.state_index,
            state: candidates[picked.state_index].clone(),
            uncertainty: picked.uncertainty,
            information_gain: picked.gain,
            diversity,
            priority,
        });
    }

    Ok(selected)
}

/// tanh of the minimum Euclidean distance to any already-selected state;
/// 1.0 while the batch is empty.
fn batch_diversity(state: &[f64], selected: &[QuerySelection]) -> f64 {
    if selected.is_empty() {
        return 1.0;
    }
    let min_dist = selected
        .iter()
        .map(|s| math::euclidean_distance(state, &s.state))
        .fold(f64::INFINITY, f64::min);
    min_dist.tanh()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_estimate(entropy: f64) -> (UncertaintyEstimate, InformationGain) {
        let est = UncertaintyEstimate {
            state: vec![],
            action: 0,
            mean: 0.0,
            variance: 0.0,
            entropy,
            confidence: 1.0 - entropy.min(1.0),
        };
        let gain = InformationGain::prospective(&est, 2);
        (est, gain)
    }

    #[test]
    fn test_skips_already_queried() {
        let candidates = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let mut queried = HashSet::new();
        queried.insert(math::canonical_state_key(&candidates[0]));

        let batch = select_query_batch(&candidates, 5, 0.3, &queried, |_| Ok(fake_estimate(0.5)))
            .unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].state_index, 1);
    }

    #[test]
    fn test_dedupes_within_call() {
        let candidates = vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0]];
        let queried = HashSet::new();
        let batch = select_query_batch(&candidates, 5, 0.3, &queried, |_| Ok(fake_estimate(0.5)))
            .unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_respects_batch_size() {
        let candidates: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 0.0]).collect();
        let queried = HashSet::new();
        let batch = select_query_batch(&candidates, 3, 0.3, &queried, |_| Ok(fake_estimate(0.5)))
            .unwrap();
        assert_eq!(batch.len(), 3);
    }

    #[test]
    fn test_prefers_high_entropy_with_zero_diversity_weight() {
        let candidates = vec![vec![1.0], vec![2.0], vec![3.0]];
        let queried = HashSet::new();
        let batch = select_query_batch(&candidates, 1, 0.0, &queried, |s| {
            // candidate [2.0] is the most uncertain
            let e = if (s[0] - 2.0).abs() < 1e-9 { 0.9 } else { 0.1 };
            Ok(fake_estimate(e))
        })
        .unwrap();
        assert_eq!(batch[0].state_index, 1);
    }

    #[test]
    fn test_first_pick_has_unit_diversity() {
        let candidates = vec![vec![1.0, 1.0]];
        let queried = HashSet::new();
        let batch = select_query_batch(&candidates, 1, 0.5, &queried, |_| Ok(fake_estimate(0.5)))
            .unwrap();
        assert!((batch[0].diversity - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_diversity_spreads_picks() {
        // Two near-duplicates plus one distant point, equal entropy. With a
        // heavy diversity weight the second pick must be the distant point.
        let candidates = vec![vec![0.0, 0.0], vec![0.01, 0.0], vec![5.0, 5.0]];
        let queried = HashSet::new();
        let batch = select_query_batch(&candidates, 2, 0.9, &queried, |_| Ok(fake_estimate(0.5)))
            .unwrap();
        assert_eq!(batch.len(), 2);
        let picked: Vec<usize> = batch.iter().map(|s| s.state_index).collect();
        assert!(picked.contains(&2), "distant point should be selected: {:?}", picked);
    }

    #[test]
    fn test_fewer_candidates_than_batch() {
        let candidates = vec![vec![1.0], vec![2.0]];
        let queried = HashSet::new();
        let batch = select_query_batch(&candidates, 10, 0.3, &queried, |_| Ok(fake_estimate(0.5)))
            .unwrap();
        assert_eq!(batch.len(), 2);
    }
}
