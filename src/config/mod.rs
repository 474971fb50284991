//! Configuration module
//!
//! Handles CLI argument parsing, TOML configuration files, and validation.
//!
//! Precedence is CLI over file over defaults. The two simulation parameters
//! have no defaults: a run without them is a configuration error.

pub mod cli;
pub mod toml;
pub mod validator;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Complete run configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub group: GroupConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl Config {
    /// Number of walkers in the group (everyone but the coordinator)
    pub fn walker_count(&self) -> usize {
        self.group.size.saturating_sub(1)
    }
}

/// Walk parameters, replicated read-only to every walker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Walk is confined to `[-domain_bound, domain_bound]`
    pub domain_bound: u64,
    /// Maximum number of steps per walker
    pub step_budget: u64,
}

/// Group topology
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Total participants, coordinator included
    #[serde(default = "default_group_size")]
    pub size: usize,
}

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            size: default_group_size(),
        }
    }
}

/// One walker per core plus the coordinator
fn default_group_size() -> usize {
    num_cpus::get() + 1
}

/// Runtime behavior
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Give up if no signal arrives for this many seconds (unset waits forever)
    #[serde(default)]
    pub receive_timeout_secs: Option<u64>,
    /// Fixed seed base instead of the wall clock (debugging only)
    #[serde(default)]
    pub seed: Option<u64>,
    /// Suppress per-walker and controller records
    #[serde(default)]
    pub quiet: bool,
}

impl RuntimeConfig {
    pub fn receive_timeout(&self) -> Option<Duration> {
        self.receive_timeout_secs.map(Duration::from_secs)
    }
}

impl fmt::Display for SimulationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "domain [-{bound}, {bound}], budget {} steps",
            self.step_budget,
            bound = self.domain_bound
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_walker_count() {
        let mut config = Config {
            simulation: SimulationConfig {
                domain_bound: 10,
                step_budget: 100,
            },
            group: GroupConfig { size: 5 },
            runtime: RuntimeConfig::default(),
        };
        assert_eq!(config.walker_count(), 4);

        config.group.size = 1;
        assert_eq!(config.walker_count(), 0);
    }

    #[test]
    fn test_default_group_has_walkers() {
        assert!(GroupConfig::default().size >= 2);
    }

    #[test]
    fn test_receive_timeout() {
        let runtime = RuntimeConfig {
            receive_timeout_secs: Some(3),
            ..Default::default()
        };
        assert_eq!(runtime.receive_timeout(), Some(Duration::from_secs(3)));
        assert_eq!(RuntimeConfig::default().receive_timeout(), None);
    }

    #[test]
    fn test_simulation_display() {
        let simulation = SimulationConfig {
            domain_bound: 5,
            step_budget: 20,
        };
        assert_eq!(simulation.to_string(), "domain [-5, 5], budget 20 steps");
    }
}
