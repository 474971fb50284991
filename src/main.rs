//! random-walk CLI entry point

use anyhow::{Context, Result};
use chrono::Utc;
use random_walk::config::cli::{Cli, ExecutionMode};
use random_walk::config::toml::build_config;
use random_walk::config::validator::validate_config;
use random_walk::config::Config;
use random_walk::distributed::{CoordinatorService, RemoteLink};
use random_walk::output::json::{write_json_output, RunSummary};
use random_walk::output::text::{self, RecordSink};
use random_walk::simulation::run_local;
use random_walk::util::logging::init_logging;
use random_walk::util::time::Timestamp;
use random_walk::walker::step_source::time_seed;
use random_walk::walker::Walker;

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logging(cli.debug);
    cli.validate()?;

    // Configuration errors stop the run before any participant starts
    let config = build_config(&cli)?;
    validate_config(&config).context("Configuration validation failed")?;

    if !config.runtime.quiet {
        text::print_configuration(&config, cli.mode);
        println!();
    }

    if cli.dry_run {
        println!("Dry run mode - configuration validated successfully");
        return Ok(());
    }

    let records = if config.runtime.quiet {
        RecordSink::discard()
    } else {
        RecordSink::stdout()
    };

    match cli.mode {
        ExecutionMode::Standalone => run_standalone(&cli, &config, &records),
        ExecutionMode::Coordinator => run_coordinator(&cli, &config, &records),
        ExecutionMode::Walker => run_walker(&cli, &config, &records),
    }
}

/// Run the whole group as threads in this process
fn run_standalone(cli: &Cli, config: &Config, records: &RecordSink) -> Result<()> {
    let summary = run_local(config, records)?;
    finish(cli, config, &summary)
}

/// Wait for walker processes to report over TCP
fn run_coordinator(cli: &Cli, config: &Config, records: &RecordSink) -> Result<()> {
    let started_at = Utc::now();
    let start = Timestamp::now();

    let service = CoordinatorService::bind(&cli.listen, config.walker_count())?
        .with_receive_timeout(config.runtime.receive_timeout());
    if !config.runtime.quiet {
        println!("Listening on {} for {} walkers", service.local_addr(), config.walker_count());
    }

    let completion = service.run()?;
    records
        .completion(completion.walkers)
        .context("Failed to write controller record")?;

    let summary = RunSummary::new(&config.simulation, &completion, started_at, start.elapsed());
    finish(cli, config, &summary)
}

/// Run one walk and report it to a remote coordinator
fn run_walker(cli: &Cli, config: &Config, records: &RecordSink) -> Result<()> {
    // Both are checked by Cli::validate
    let addr = cli.connect.as_deref().context("--connect is required in walker mode")?;
    let rank = cli.rank.context("--rank is required in walker mode")?;

    let link = RemoteLink::connect(addr, rank)
        .with_context(|| format!("Failed to connect to coordinator at {}", addr))?;

    let seed_base = config.runtime.seed.unwrap_or_else(time_seed);
    let finished = Walker::new(rank, config.simulation, seed_base).walk();
    records
        .walker(rank, finished.report())
        .context("Failed to write walker record")?;

    finished
        .signal(&link)
        .with_context(|| format!("Walker {} could not signal completion", rank))?;
    Ok(())
}

/// Print the summary and write the JSON file when requested
fn finish(cli: &Cli, config: &Config, summary: &RunSummary) -> Result<()> {
    if !config.runtime.quiet {
        text::print_summary(summary);
    }

    if let Some(ref path) = cli.json {
        write_json_output(path, summary)?;
        if !config.runtime.quiet {
            println!("JSON summary written to {}", path.display());
        }
    }

    Ok(())
}
