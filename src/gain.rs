// src/gain.rs
//
// Information-gain accounting.
//
// Two forms:
// - prospective: from a single pre-query estimate, used by the acquisition
//   scorer to rank candidates before any label exists
// - realized: from the pre/post-update estimate pair of an executed query,
//   appended to the run history and aggregated by simple mean
//
// The KL term is a proxy: prospectively it is the divergence of the score
// distribution from uniform (log2(n) - entropy); realized it is the
// Gaussian KL between the post and pre (mean, variance) summaries with
// variance floored to keep the log finite.

use serde::{Deserialize, Serialize};

use crate::uncertainty::UncertaintyEstimate;

/// Floor applied to variances inside the Gaussian KL proxy.
const VARIANCE_FLOOR: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InformationGain {
    /// Realized or anticipated entropy reduction, in bits.
    pub mutual_information: f64,
    /// KL proxy (see module docs).
    pub kl_divergence: f64,
    /// Expected uncertainty reduction: entropy * (1 - confidence).
    pub expected_reduction: f64,
    /// Blended scalar used by the acquisition score.
    pub value_of_information: f64,
}

impl InformationGain {
    /// Anticipated gain from querying a state, before any label exists.
    pub fn prospective(estimate: &UncertaintyEstimate, n_actions: usize) -> Self {
        let anticipated = estimate.entropy * (1.0 - estimate.confidence);
        let max_entropy = (n_actions.max(2) as f64).log2();
        let kl = (max_entropy - estimate.entropy).max(0.0);

        Self {
            mutual_information: anticipated,
            kl_divergence: kl,
            expected_reduction: anticipated,
            value_of_information: blend(anticipated, kl, anticipated),
        }
    }

    /// Realized gain from one executed query, given the estimates computed
    /// immediately before and after the policy update.
    pub fn realized(pre: &UncertaintyEstimate, post: &UncertaintyEstimate) -> Self {
        let mi = (pre.entropy - post.entropy).max(0.0);
        let kl = gaussian_kl(post.mean, post.variance, pre.mean, pre.variance);
        let expected = pre.entropy * (1.0 - pre.confidence);

        Self {
            mutual_information: mi,
            kl_divergence: kl,
            expected_reduction: expected,
            value_of_information: blend(mi, kl, expected),
        }
    }

    /// Simple per-field mean across a history of gains. Zeroed when empty.
    pub fn mean_of(gains: &[InformationGain]) -> Self {
        if gains.is_empty() {
            return Self {
                mutual_information: 0.0,
                kl_divergence: 0.0,
                expected_reduction: 0.0,
                value_of_information: 0.0,
            };
        }
        let n = gains.len() as f64;
        Self {
            mutual_information: gains.iter().map(|g| g.mutual_information).sum::<f64>() / n,
            kl_divergence: gains.iter().map(|g| g.kl_divergence).sum::<f64>() / n,
            expected_reduction: gains.iter().map(|g| g.expected_reduction).sum::<f64>() / n,
            value_of_information: gains.iter().map(|g| g.value_of_information).sum::<f64>() / n,
        }
    }
}

fn blend(mutual_information: f64, kl: f64, expected_reduction: f64) -> f64 {
    0.6 * mutual_information + 0.3 * expected_reduction + 0.1 * kl.min(1.0)
}

/// KL( N(m1, v1) || N(m0, v0) ) with floored variances.
fn gaussian_kl(m1: f64, v1: f64, m0: f64, v0: f64) -> f64 {
    let v1 = v1.max(VARIANCE_FLOOR);
    let v0 = v0.max(VARIANCE_FLOOR);
    let d = m1 - m0;
    0.5 * ((v0 / v1).ln() + (v1 + d * d) / v0 - 1.0).max(0.0)
}
