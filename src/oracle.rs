// src/oracle.rs
//
// Label oracle boundary: the one external collaborator of the engine.
//
// Callers supply something that maps a proposed (state, action) pair to an
// observed reward/label — a simulation environment, a remote labeling
// service, or a human-in-the-loop UI. The trait returns a boxed future so
// both synchronous closures and genuinely async labelers plug in; the
// exploration loop awaits each call strictly sequentially because every
// policy update depends on the immediately preceding one.
//
// No timeout is imposed here: a hanging oracle blocks the loop, and a
// production wrapper should put a wall-clock bound around each call.

use std::future::Future;
use std::pin::Pin;

use crate::error::OracleFailure;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub type OracleResult = Result<f64, OracleFailure>;

/// External labeler: observed reward for a proposed (state, action) pair.
pub trait LabelOracle: Send {
    fn label(&mut self, state: &[f64], action: usize) -> BoxFuture<'_, OracleResult>;
}

/// Adapter for plain synchronous closures.
///
/// `FnOracle::new(|state, action| ...)` is the common path for tests and
/// simulation environments that don't need to await anything.
pub struct FnOracle<F>
where
    F: FnMut(&[f64], usize) -> OracleResult + Send,
{
    f: F,
}

impl<F> FnOracle<F>
where
    F: FnMut(&[f64], usize) -> OracleResult + Send,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> LabelOracle for FnOracle<F>
where
    F: FnMut(&[f64], usize) -> OracleResult + Send,
{
    fn label(&mut self, state: &[f64], action: usize) -> BoxFuture<'_, OracleResult> {
        let result = (self.f)(state, action);
        Box::pin(async move { result })
    }
}

/// Infallible closure adapter for oracles that always produce a reward.
pub struct RewardFn<F>
where
    F: FnMut(&[f64], usize) -> f64 + Send,
{
    f: F,
}

impl<F> RewardFn<F>
where
    F: FnMut(&[f64], usize) -> f64 + Send,
{
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> LabelOracle for RewardFn<F>
where
    F: FnMut(&[f64], usize) -> f64 + Send,
{
    fn label(&mut self, state: &[f64], action: usize) -> BoxFuture<'_, OracleResult> {
        let result = Ok((self.f)(state, action));
        Box::pin(async move { result })
    }
}
