//! Sources of fair binary step choices
//!
//! Every walker owns exactly one [`StepSource`]. Sources are never shared
//! between walkers: a shared generator would couple walks that must stay
//! independent.
//!
//! # Seeding
//!
//! Production walkers use [`RngStepSource`], a xoshiro256++ generator seeded
//! from a coarse wall-clock value plus the walker's rank (see [`walker_seed`]).
//! Two walkers started in the same second still get distinct sequences because
//! their ranks differ.
//!
//! # Example
//!
//! ```
//! use random_walk::walker::step_source::{FixedSteps, Step, StepSource};
//!
//! let mut steps = FixedSteps::new(vec![Step::Right, Step::Left]).unwrap();
//! assert_eq!(steps.next_step(), Step::Right);
//! assert_eq!(steps.next_step(), Step::Left);
//! assert_eq!(steps.next_step(), Step::Right); // cycles
//! ```

use crate::transport::Rank;
use crate::Result;
use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::time::{SystemTime, UNIX_EPOCH};

/// One unit move on the line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Left,
    Right,
}

impl Step {
    #[inline]
    pub fn delta(self) -> i64 {
        match self {
            Step::Left => -1,
            Step::Right => 1,
        }
    }
}

/// Stream of fair binary choices
///
/// Must be `Send` so a walker can be moved onto its own thread.
pub trait StepSource: Send {
    /// Draw the next step
    fn next_step(&mut self) -> Step;
}

/// Pseudo-random step source backed by xoshiro256++
pub struct RngStepSource {
    rng: Xoshiro256PlusPlus,
}

impl RngStepSource {
    /// Seed for walker `rank` on top of a shared base value
    pub fn for_rank(rank: Rank, seed_base: u64) -> Self {
        Self::with_seed(walker_seed(rank, seed_base))
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Xoshiro256PlusPlus::seed_from_u64(seed),
        }
    }
}

impl StepSource for RngStepSource {
    #[inline(always)]
    fn next_step(&mut self) -> Step {
        if self.rng.gen_bool(0.5) {
            Step::Right
        } else {
            Step::Left
        }
    }
}

/// Replays a fixed pattern of steps, cycling when it runs out
pub struct FixedSteps {
    pattern: Vec<Step>,
    cursor: usize,
}

impl FixedSteps {
    pub fn new(pattern: Vec<Step>) -> Result<Self> {
        anyhow::ensure!(!pattern.is_empty(), "step pattern must not be empty");
        Ok(Self { pattern, cursor: 0 })
    }

    /// Build from signed unit moves (`-1` or `+1`)
    pub fn from_deltas(deltas: &[i8]) -> Result<Self> {
        let pattern = deltas
            .iter()
            .map(|&d| match d {
                -1 => Ok(Step::Left),
                1 => Ok(Step::Right),
                other => Err(anyhow::anyhow!("step delta must be -1 or +1, got {}", other)),
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(pattern)
    }
}

impl StepSource for FixedSteps {
    fn next_step(&mut self) -> Step {
        let step = self.pattern[self.cursor];
        self.cursor = (self.cursor + 1) % self.pattern.len();
        step
    }
}

/// Per-walker seed: base value offset by rank
pub fn walker_seed(rank: Rank, seed_base: u64) -> u64 {
    seed_base.wrapping_add(rank as u64)
}

/// Coarse (whole seconds) wall-clock value used as the default seed base
pub fn time_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draw(source: &mut dyn StepSource, n: usize) -> Vec<Step> {
        (0..n).map(|_| source.next_step()).collect()
    }

    #[test]
    fn test_step_delta() {
        assert_eq!(Step::Left.delta(), -1);
        assert_eq!(Step::Right.delta(), 1);
    }

    #[test]
    fn test_rng_source_seeded_is_repeatable() {
        let mut a = RngStepSource::with_seed(12345);
        let mut b = RngStepSource::with_seed(12345);
        assert_eq!(draw(&mut a, 64), draw(&mut b, 64));
    }

    #[test]
    fn test_distinct_ranks_get_distinct_sequences() {
        let base = 1_700_000_000;
        let mut one = RngStepSource::for_rank(1, base);
        let mut two = RngStepSource::for_rank(2, base);
        assert_ne!(draw(&mut one, 64), draw(&mut two, 64));
    }

    #[test]
    fn test_rng_source_is_roughly_fair() {
        let mut source = RngStepSource::with_seed(42);
        let rights = draw(&mut source, 10_000)
            .into_iter()
            .filter(|s| *s == Step::Right)
            .count();

        // Allow 5% deviation from 5000
        assert!(rights > 4750 && rights < 5250, "Right count {} outside expected range", rights);
    }

    #[test]
    fn test_fixed_steps_cycle() {
        let mut source = FixedSteps::from_deltas(&[1, 1, -1]).unwrap();
        assert_eq!(
            draw(&mut source, 5),
            vec![Step::Right, Step::Right, Step::Left, Step::Right, Step::Right]
        );
    }

    #[test]
    fn test_fixed_steps_rejects_bad_input() {
        assert!(FixedSteps::new(vec![]).is_err());
        assert!(FixedSteps::from_deltas(&[1, 0]).is_err());
        assert!(FixedSteps::from_deltas(&[2]).is_err());
    }

    #[test]
    fn test_walker_seed_offsets_by_rank() {
        assert_eq!(walker_seed(0, 100), 100);
        assert_eq!(walker_seed(3, 100), 103);
        assert_eq!(walker_seed(1, u64::MAX), 0);
    }
}
