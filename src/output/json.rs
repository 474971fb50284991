//! JSON output formatting
//!
//! A run summary holds one record per walker, built from the completion
//! signals the coordinator received, so it looks the same whether walkers ran
//! as local threads or as remote processes.

use crate::config::SimulationConfig;
use crate::coordinator::CompletionSummary;
use crate::transport::Rank;
use crate::util::time::format_duration;
use crate::walker::TerminationReason;
use crate::Result;
use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::time::Duration;

/// Duration with both microseconds and human-readable format
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonDuration {
    pub micros: u64,
    pub human: String,
}

impl JsonDuration {
    pub fn from_duration(d: Duration) -> Self {
        Self {
            micros: d.as_micros() as u64,
            human: format_duration(d),
        }
    }

    pub fn to_duration(&self) -> Duration {
        Duration::from_micros(self.micros)
    }
}

/// One walker's outcome as reported to the coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkerRecord {
    pub rank: Rank,
    pub steps: u64,
    pub reason: TerminationReason,
}

/// Whole-run summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub elapsed: JsonDuration,
    pub domain_bound: u64,
    pub step_budget: u64,
    pub walkers: usize,
    /// Ranks in the order their signals reached the coordinator
    pub arrival_order: Vec<Rank>,
    /// Sorted by rank
    pub records: Vec<WalkerRecord>,
}

impl RunSummary {
    pub fn new(
        simulation: &SimulationConfig,
        completion: &CompletionSummary,
        started_at: DateTime<Utc>,
        elapsed: Duration,
    ) -> Self {
        let mut records: Vec<WalkerRecord> = completion
            .signals
            .iter()
            .map(|(rank, signal)| WalkerRecord {
                rank: *rank,
                steps: signal.steps,
                reason: signal.reason,
            })
            .collect();
        records.sort_by_key(|r| r.rank);

        Self {
            started_at,
            elapsed: JsonDuration::from_duration(elapsed),
            domain_bound: simulation.domain_bound,
            step_budget: simulation.step_budget,
            walkers: completion.walkers,
            arrival_order: completion.arrival_order(),
            records,
        }
    }

    /// Walkers that left the domain
    pub fn escaped(&self) -> usize {
        self.count(TerminationReason::BoundaryEscape)
    }

    /// Walkers that used their whole budget
    pub fn exhausted(&self) -> usize {
        self.count(TerminationReason::BudgetExhausted)
    }

    fn count(&self, reason: TerminationReason) -> usize {
        self.records.iter().filter(|r| r.reason == reason).count()
    }
}

/// Write the summary as pretty-printed JSON
pub fn write_json_output(output_path: &Path, summary: &RunSummary) -> Result<()> {
    let file = File::create(output_path)
        .with_context(|| format!("Failed to create JSON output: {}", output_path.display()))?;
    serde_json::to_writer_pretty(file, summary)
        .with_context(|| format!("Failed to write JSON output: {}", output_path.display()))?;
    Ok(())
}
