//! CLI argument parsing using clap

use crate::transport::Role;
use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Execution mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecutionMode {
    /// Standalone mode (default) - whole group as threads in one process
    Standalone,
    /// Coordinator mode - accept completion signals from walker processes over TCP
    Coordinator,
    /// Walker mode - run one walk and report to a remote coordinator
    Walker,
}

/// random-walk - concurrent random walkers with termination detection
#[derive(Parser, Debug)]
#[command(name = "random-walk")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Execution mode: standalone, coordinator, or walker
    #[arg(long, value_enum, default_value = "standalone")]
    pub mode: ExecutionMode,

    /// Half-width of the walk domain; walkers stop once |position| exceeds it
    #[arg(value_name = "DOMAIN_SIZE")]
    pub domain_size: Option<u64>,

    /// Maximum steps per walker
    #[arg(value_name = "MAX_STEPS")]
    pub max_steps: Option<u64>,

    /// Group size including the coordinator (default: CPU count + 1)
    #[arg(short = 'n', long = "np")]
    pub np: Option<usize>,

    /// Number of walker processes to wait for (coordinator mode; same as --np minus one)
    #[arg(long, conflicts_with = "np")]
    pub walkers: Option<usize>,

    /// TOML configuration file
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Address to listen on (coordinator mode only)
    #[arg(long, default_value = "0.0.0.0:9999")]
    pub listen: String,

    /// Coordinator address to report to (walker mode only)
    #[arg(long)]
    pub connect: Option<String>,

    /// This walker's rank, 1..N-1 (walker mode only)
    #[arg(long)]
    pub rank: Option<usize>,

    /// Fail if no completion signal arrives within this many seconds
    #[arg(long, value_name = "SECS")]
    pub receive_timeout: Option<u64>,

    /// Fixed seed base instead of the wall clock
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write a JSON run summary to this path
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Suppress per-walker and controller records
    #[arg(short, long)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, env = "RANDOM_WALK_DEBUG")]
    pub debug: bool,

    /// Validate configuration and exit
    #[arg(long)]
    pub dry_run: bool,
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate mode-specific argument combinations
    ///
    /// Value ranges are checked later by the config validator, once file and
    /// CLI values have been merged.
    pub fn validate(&self) -> Result<()> {
        if self.config.is_none() && (self.domain_size.is_none() || self.max_steps.is_none()) {
            anyhow::bail!(
                "Usage: random-walk [OPTIONS] <DOMAIN_SIZE> <MAX_STEPS> (or --config <FILE>)"
            );
        }

        match self.mode {
            ExecutionMode::Walker => {
                if self.connect.is_none() {
                    anyhow::bail!("--connect is required in walker mode");
                }
                match self.rank {
                    None => anyhow::bail!("--rank is required in walker mode"),
                    Some(rank) if Role::of(rank) == Role::Coordinator => {
                        anyhow::bail!("rank {} is reserved for the coordinator", rank)
                    }
                    Some(_) => {}
                }
            }
            ExecutionMode::Standalone | ExecutionMode::Coordinator => {
                if self.connect.is_some() || self.rank.is_some() {
                    anyhow::bail!("--connect and --rank are only valid in walker mode");
                }
            }
        }

        if self.walkers.is_some() && self.mode != ExecutionMode::Coordinator {
            anyhow::bail!("--walkers is only valid in coordinator mode");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("random-walk").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_positional_arguments() {
        let cli = parse(&["10", "1000", "-n", "5"]);
        assert_eq!(cli.mode, ExecutionMode::Standalone);
        assert_eq!(cli.domain_size, Some(10));
        assert_eq!(cli.max_steps, Some(1000));
        assert_eq!(cli.np, Some(5));
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_missing_parameters_rejected() {
        let cli = parse(&["10"]);
        assert!(cli.validate().is_err());

        let cli = parse(&["--config", "run.toml"]);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_malformed_parameter_rejected() {
        let result = Cli::try_parse_from(["random-walk", "ten", "100"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_walker_mode_requirements() {
        let cli = parse(&["--mode", "walker", "5", "50"]);
        assert!(cli.validate().is_err());

        let cli = parse(&["--mode", "walker", "--connect", "127.0.0.1:9999", "5", "50"]);
        assert!(cli.validate().is_err());

        let cli = parse(&["--mode", "walker", "--connect", "127.0.0.1:9999", "--rank", "0", "5", "50"]);
        assert!(cli.validate().is_err());

        let cli = parse(&["--mode", "walker", "--connect", "127.0.0.1:9999", "--rank", "2", "5", "50"]);
        assert!(cli.validate().is_ok());
    }

    #[test]
    fn test_walkers_flag_coordinator_only() {
        let cli = parse(&["--mode", "coordinator", "--walkers", "3", "5", "50"]);
        assert_eq!(cli.walkers, Some(3));
        assert!(cli.validate().is_ok());

        let cli = parse(&["--walkers", "3", "5", "50"]);
        assert!(cli.validate().is_err());

        assert!(Cli::try_parse_from(["random-walk", "--walkers", "3", "-n", "4", "5", "50"]).is_err());
    }

    #[test]
    fn test_rank_rejected_outside_walker_mode() {
        let cli = parse(&["--rank", "1", "5", "50"]);
        assert!(cli.validate().is_err());
    }
}
