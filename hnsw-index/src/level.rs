//! Exponential-decay level assignment (§4.D).
//!
//! `probs[l] = exp(-l/mL) * (1 - exp(-1/mL))`, `mL = 1/ln(M)`, truncated
//! once a term falls below `1e-9`. Drawing a level samples `r` uniformly in
//! `[0, 1)` and returns the smallest `l` with `r < probs[l]`, falling back
//! to the last index.
//!
//! Production code draws `r` from a real RNG; tests inject a fixed
//! sequence through [`FixedLevelSampler`] — this is the "expose this seam"
//! requirement, made concrete as a trait object rather than a promise.

use rand::Rng;
use std::fmt;

const PROB_FLOOR: f64 = 1e-9;

/// Precomputes the level-selection distribution for a given `M`.
pub fn level_probs(m: usize) -> Vec<f64> {
    let m_l = 1.0 / (m as f64).ln();
    let mut probs = Vec::new();
    let mut level = 0u32;
    loop {
        let p = (-(level as f64) / m_l).exp() * (1.0 - (-1.0 / m_l).exp());
        if p < PROB_FLOOR && level > 0 {
            break;
        }
        probs.push(p);
        level += 1;
    }
    probs
}

/// Returns the smallest `l` with `r < probs[l]`, else `probs.len() - 1`.
pub fn select_level(probs: &[f64], r: f64) -> usize {
    for (level, &p) in probs.iter().enumerate() {
        if r < p {
            return level;
        }
    }
    probs.len().saturating_sub(1)
}

/// Draws a node's top level at insertion time.
pub trait LevelSampler: fmt::Debug {
    fn sample(&mut self) -> usize;
}

/// The production sampler: precomputed `probs` plus an injectable RNG.
pub struct ExponentialLevelSampler<R> {
    probs: Vec<f64>,
    rng: R,
}

impl<R: Rng> ExponentialLevelSampler<R> {
    pub fn with_rng(m: usize, rng: R) -> Self {
        Self {
            probs: level_probs(m),
            rng,
        }
    }
}

impl ExponentialLevelSampler<rand::rngs::ThreadRng> {
    pub fn new(m: usize) -> Self {
        Self::with_rng(m, rand::rng())
    }
}

impl<R> fmt::Debug for ExponentialLevelSampler<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExponentialLevelSampler")
            .field("probs", &self.probs)
            .finish()
    }
}

impl<R: Rng> LevelSampler for ExponentialLevelSampler<R> {
    fn sample(&mut self) -> usize {
        let r: f64 = self.rng.random();
        select_level(&self.probs, r)
    }
}

/// A deterministic sampler that replays an injected sequence of levels,
/// repeating the last one once exhausted. Used by tests (scenario 3) and
/// by callers who need reproducible graph construction.
///
/// Pulls from the source iterator lazily rather than eagerly collecting
/// it, so an infinite source (`std::iter::repeat(0)`, used throughout
/// this crate's tests for "every node at level 0") works without
/// collecting forever.
pub struct FixedLevelSampler {
    remaining: Box<dyn Iterator<Item = usize>>,
    last: usize,
}

impl FixedLevelSampler {
    pub fn new<I>(levels: I) -> Self
    where
        I: IntoIterator<Item = usize>,
        I::IntoIter: 'static,
    {
        Self {
            remaining: Box::new(levels.into_iter()),
            last: 0,
        }
    }
}

impl fmt::Debug for FixedLevelSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedLevelSampler")
            .field("last", &self.last)
            .finish()
    }
}

impl LevelSampler for FixedLevelSampler {
    fn sample(&mut self) -> usize {
        match self.remaining.next() {
            Some(level) => {
                self.last = level;
                level
            }
            None => self.last,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_level_scenario_2() {
        let probs = vec![0.5, 0.3, 0.2];
        assert_eq!(select_level(&probs, 0.2), 0);
        assert_eq!(select_level(&probs, 0.6), 1);
        assert_eq!(select_level(&probs, 0.95), 2);
    }

    #[test]
    fn level_probs_are_descending_and_truncated() {
        let probs = level_probs(16);
        assert!(probs.windows(2).all(|w| w[0] >= w[1]));
        assert!(*probs.last().unwrap() >= 0.0);
        assert!(probs.len() < 64);
    }

    #[test]
    fn fixed_level_sampler_replays_then_repeats_last() {
        let mut s = FixedLevelSampler::new([0, 3, 1]);
        assert_eq!(s.sample(), 0);
        assert_eq!(s.sample(), 3);
        assert_eq!(s.sample(), 1);
        assert_eq!(s.sample(), 1);
    }
}
