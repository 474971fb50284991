//! TOML configuration file parsing
//!
//! A complete file looks like:
//!
//! ```toml
//! [simulation]
//! domain_bound = 50
//! step_budget = 10000
//!
//! [group]
//! size = 9
//!
//! [runtime]
//! receive_timeout_secs = 30
//! ```

use super::*;
use crate::config::cli::Cli;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Parse TOML configuration file
pub fn parse_toml_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_toml_string(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Parse TOML configuration from string
pub fn parse_toml_string(contents: &str) -> Result<Config> {
    let config: Config = ::toml::from_str(contents)
        .context("Failed to parse TOML configuration")?;

    Ok(config)
}

/// Build the run configuration from CLI arguments and an optional file
pub fn build_config(cli: &Cli) -> Result<Config> {
    let base = match &cli.config {
        Some(path) => parse_toml_file(path)?,
        None => {
            let (domain_bound, step_budget) = match (cli.domain_size, cli.max_steps) {
                (Some(d), Some(s)) => (d, s),
                _ => anyhow::bail!("DOMAIN_SIZE and MAX_STEPS are required without --config"),
            };
            Config {
                simulation: SimulationConfig {
                    domain_bound,
                    step_budget,
                },
                group: GroupConfig::default(),
                runtime: RuntimeConfig::default(),
            }
        }
    };

    Ok(merge_cli_with_config(cli, base))
}

/// Merge CLI arguments with TOML configuration (CLI takes precedence)
pub fn merge_cli_with_config(cli: &Cli, mut config: Config) -> Config {
    if let Some(domain_size) = cli.domain_size {
        config.simulation.domain_bound = domain_size;
    }
    if let Some(max_steps) = cli.max_steps {
        config.simulation.step_budget = max_steps;
    }
    if let Some(np) = cli.np {
        config.group.size = np;
    }
    if let Some(walkers) = cli.walkers {
        config.group.size = walkers.saturating_add(1);
    }
    if let Some(timeout) = cli.receive_timeout {
        config.runtime.receive_timeout_secs = Some(timeout);
    }
    if let Some(seed) = cli.seed {
        config.runtime.seed = Some(seed);
    }
    if cli.quiet {
        config.runtime.quiet = true;
    }

    config
}
