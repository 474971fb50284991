//! Walker implementation
//!
//! A walker performs one bounded random walk on the integer line and then
//! reports to the coordinator exactly once.
//!
//! # Termination
//!
//! Starting at position 0, the walker draws one fair step at a time. It stops
//! as soon as either:
//!
//! - **Boundary escape**: `|position| > domain_bound` after a step
//! - **Budget exhaustion**: `steps_taken == step_budget` without escaping
//!
//! Both outcomes are normal. The coordinator treats them identically.
//!
//! # Exactly-once signalling
//!
//! [`Walker::walk`] consumes the walker and yields a [`FinishedWalker`];
//! [`FinishedWalker::signal`] consumes that in turn. A walker therefore cannot
//! signal before it has finished, and cannot signal twice.
//!
//! # Example
//!
//! ```
//! use random_walk::walker::{self, TerminationReason};
//! use random_walk::walker::step_source::FixedSteps;
//!
//! let mut steps = FixedSteps::from_deltas(&[1, 1]).unwrap();
//! let report = walker::run(1, 10, &mut steps);
//!
//! assert_eq!(report.reason, TerminationReason::BoundaryEscape);
//! assert_eq!(report.steps, 2);
//! ```

pub mod step_source;

use crate::config::SimulationConfig;
use crate::transport::{CompletionSignal, Message, MessageSender, Rank, TransportError, COORDINATOR_RANK};
use serde::{Deserialize, Serialize};
use step_source::{RngStepSource, Step, StepSource};

/// Why a walk ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationReason {
    /// Position left `[-domain_bound, domain_bound]`
    BoundaryEscape,
    /// Took `step_budget` steps without escaping
    BudgetExhausted,
}

/// Outcome of one walk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminationReport {
    pub steps: u64,
    pub final_position: i64,
    pub reason: TerminationReason,
}

/// Mutable state of a single walk
///
/// Owned by exactly one walker and never shared.
#[derive(Debug, Clone)]
pub struct WalkerState {
    position: i64,
    steps_taken: u64,
    domain_bound: u64,
    step_budget: u64,
}

impl WalkerState {
    pub fn new(domain_bound: u64, step_budget: u64) -> Self {
        Self {
            position: 0,
            steps_taken: 0,
            domain_bound,
            step_budget,
        }
    }

    pub fn position(&self) -> i64 {
        self.position
    }

    pub fn steps_taken(&self) -> u64 {
        self.steps_taken
    }

    fn escaped(&self) -> bool {
        self.position.unsigned_abs() > self.domain_bound
    }

    /// Apply one step
    ///
    /// Returns the termination reason if this step ended the walk. Calling
    /// this once the budget is spent is a no-op that reports exhaustion.
    pub fn advance(&mut self, step: Step) -> Option<TerminationReason> {
        if self.steps_taken >= self.step_budget {
            return Some(TerminationReason::BudgetExhausted);
        }

        self.position += step.delta();
        self.steps_taken += 1;

        if self.escaped() {
            Some(TerminationReason::BoundaryEscape)
        } else if self.steps_taken == self.step_budget {
            Some(TerminationReason::BudgetExhausted)
        } else {
            None
        }
    }

    /// Step until the walk terminates
    pub fn walk<S: StepSource + ?Sized>(&mut self, source: &mut S) -> TerminationReport {
        // Zero budget: nothing to draw
        let reason = if self.step_budget == 0 {
            TerminationReason::BudgetExhausted
        } else {
            loop {
                if let Some(reason) = self.advance(source.next_step()) {
                    break reason;
                }
            }
        };

        TerminationReport {
            steps: self.steps_taken,
            final_position: self.position,
            reason,
        }
    }
}

/// Run one bounded walk from position 0
pub fn run<S: StepSource + ?Sized>(domain_bound: u64, step_budget: u64, source: &mut S) -> TerminationReport {
    WalkerState::new(domain_bound, step_budget).walk(source)
}

/// A walker participant that has not walked yet
pub struct Walker {
    rank: Rank,
    simulation: SimulationConfig,
    source: Box<dyn StepSource>,
}

impl Walker {
    /// Create a walker with its own randomly seeded step source
    pub fn new(rank: Rank, simulation: SimulationConfig, seed_base: u64) -> Self {
        Self::with_source(rank, simulation, Box::new(RngStepSource::for_rank(rank, seed_base)))
    }

    pub fn with_source(rank: Rank, simulation: SimulationConfig, source: Box<dyn StepSource>) -> Self {
        Self {
            rank,
            simulation,
            source,
        }
    }

    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Perform the walk
    pub fn walk(mut self) -> FinishedWalker {
        let report = run(
            self.simulation.domain_bound,
            self.simulation.step_budget,
            self.source.as_mut(),
        );
        tracing::debug!(rank = self.rank, steps = report.steps, reason = ?report.reason, "walk finished");

        FinishedWalker {
            rank: self.rank,
            report,
        }
    }

    /// Walk, then signal the coordinator
    pub fn run<T: MessageSender + ?Sized>(self, link: &T) -> Result<TerminationReport, TransportError> {
        self.walk().signal(link)
    }
}

/// A walker whose walk is over but whose signal has not been sent
#[must_use = "a finished walker must signal the coordinator"]
pub struct FinishedWalker {
    rank: Rank,
    report: TerminationReport,
}

impl FinishedWalker {
    pub fn rank(&self) -> Rank {
        self.rank
    }

    pub fn report(&self) -> &TerminationReport {
        &self.report
    }

    /// Send the single completion signal to the coordinator
    pub fn signal<T: MessageSender + ?Sized>(self, link: &T) -> Result<TerminationReport, TransportError> {
        link.send(
            COORDINATOR_RANK,
            Message::Completion(CompletionSignal::from(&self.report)),
        )?;
        Ok(self.report)
    }
}
