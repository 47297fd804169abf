// src/bin/explore.rs
//
// Research harness: runs the active learning engine against a synthetic
// noisy-linear oracle over randomly drawn candidate states and prints a
// per-run summary plus aggregate stats.
//
// Run examples:
//   cargo run --bin explore -- --runs 5 --budget 40 --candidates 200 --seed 1
//   cargo run --bin explore -- --method variance --ensemble-size 7 --budget 60

use anyhow::Result;
use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use erotema::{
    ActiveRlEngine, EngineConfig, ExploreTask, OnlineStats, RewardFn, UncertaintyMethod,
};

#[derive(Debug, Parser)]
#[command(name = "explore", about = "Active learning exploration harness")]
struct Args {
    /// Number of independent runs (seed offsets from --seed).
    #[arg(long, default_value_t = 3)]
    runs: u64,

    /// Labeling budget per run.
    #[arg(long, default_value_t = 40)]
    budget: usize,

    /// Number of candidate states drawn per run.
    #[arg(long, default_value_t = 200)]
    candidates: usize,

    /// State vector dimension.
    #[arg(long, default_value_t = 4)]
    state_dim: usize,

    /// Policy vector length.
    #[arg(long, default_value_t = 16)]
    policy_len: usize,

    /// Uncertainty method: entropy | variance | disagreement | vote_entropy.
    #[arg(long, default_value = "entropy")]
    method: String,

    /// Ensemble size (used by the QBC methods).
    #[arg(long, default_value_t = 5)]
    ensemble_size: usize,

    /// Queries per batch.
    #[arg(long, default_value_t = 5)]
    batch_size: usize,

    /// Base RNG seed.
    #[arg(long, default_value_t = 1)]
    seed: u64,

    /// Suppress per-run output.
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let method = UncertaintyMethod::parse(&args.method)
        .ok_or_else(|| anyhow::anyhow!("unknown uncertainty method '{}'", args.method))?;

    let mut score_stats = OnlineStats::default();
    let mut reduction_stats = OnlineStats::default();

    for run in 0..args.runs {
        let seed = args.seed + run;
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        // Hidden linear target the oracle scores actions against, plus a
        // small noise term so rewards are not exactly learnable.
        let target: Vec<f64> = (0..args.state_dim).map(|_| rng.gen_range(-1.0..1.0)).collect();

        let initial_policy: Vec<f64> = (0..args.policy_len)
            .map(|_| rng.gen_range(-0.1..0.1))
            .collect();

        let candidates: Vec<Vec<f64>> = (0..args.candidates)
            .map(|_| (0..args.state_dim).map(|_| rng.gen_range(-1.0..1.0)).collect())
            .collect();

        let cfg = EngineConfig::default()
            .with_uncertainty_method(method)
            .with_labeling_budget(args.budget)
            .with_batch_size(args.batch_size)
            .with_seed(seed);

        let mut engine = ActiveRlEngine::new(initial_policy, cfg)?;
        if method.requires_ensemble() {
            engine.initialize_ensemble(args.ensemble_size)?;
        }

        let mut oracle_rng = ChaCha8Rng::seed_from_u64(seed ^ 0x9e3779b97f4a7c15);
        let target_for_oracle = target.clone();
        let mut oracle = RewardFn::new(move |state: &[f64], action| {
            let signal: f64 = state
                .iter()
                .zip(&target_for_oracle)
                .map(|(s, t)| s * t)
                .sum();
            let noise = oracle_rng.gen_range(-0.05..0.05);
            (signal * (1.0 + action as f64 * 0.1)).tanh() + noise
        });

        let task = ExploreTask::default().with_task_id(run).with_name("synthetic");
        let outcome = engine.explore(&task, &candidates, &mut oracle).await?;

        score_stats.add(outcome.exploration_score);
        reduction_stats.add(outcome.uncertainty_reduction);

        if !args.quiet {
            println!(
                "run {:>3} seed {:>4}: queries={:<3} score={:.4} reduction={:+.4} \
                 effective={} redundancy={:.3} reason={:?}",
                run,
                seed,
                outcome.queries_made,
                outcome.exploration_score,
                outcome.uncertainty_reduction,
                outcome.sample_efficiency.effective_samples,
                outcome.sample_efficiency.redundancy_rate,
                outcome.termination_reason,
            );
        }
    }

    println!();
    println!("=== Aggregate ({} runs, method={}) ===", args.runs, method.as_str());
    println!(
        "exploration score: mean {:.4} stddev {:.4}",
        score_stats.mean(),
        score_stats.stddev_population()
    );
    println!(
        "uncertainty reduction: mean {:+.4} stddev {:.4}",
        reduction_stats.mean(),
        reduction_stats.stddev_population()
    );

    Ok(())
}
