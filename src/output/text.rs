//! Human-readable text output

use crate::config::cli::ExecutionMode;
use crate::config::Config;
use crate::output::json::RunSummary;
use crate::transport::Rank;
use crate::util::time::format_duration;
use crate::walker::{TerminationReason, TerminationReport};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Record a walker prints once its walk is over
pub fn format_walker_record(rank: Rank, report: &TerminationReport) -> String {
    match report.reason {
        TerminationReason::BoundaryEscape => {
            format!("Rank {}: Walker finished in {} steps.", rank, report.steps)
        }
        TerminationReason::BudgetExhausted => {
            format!(
                "Rank {}: Walker finished in {} steps (max steps reached).",
                rank, report.steps
            )
        }
    }
}

/// Record the coordinator prints once every walker has reported
pub fn format_completion_record(walkers: usize) -> String {
    format!("Controller: All {} walkers have finished.", walkers)
}

/// Shared destination for walker and controller records
///
/// Cloned into every walker thread. Each record is written and flushed while
/// holding the lock, so lines from concurrent walkers never interleave.
#[derive(Clone)]
pub struct RecordSink {
    out: Option<Arc<Mutex<Box<dyn Write + Send>>>>,
}

impl RecordSink {
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            out: Some(Arc::new(Mutex::new(Box::new(writer)))),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Drop every record (`--quiet`)
    pub fn discard() -> Self {
        Self { out: None }
    }

    pub fn walker(&self, rank: Rank, report: &TerminationReport) -> io::Result<()> {
        self.write_line(&format_walker_record(rank, report))
    }

    pub fn completion(&self, walkers: usize) -> io::Result<()> {
        self.write_line(&format_completion_record(walkers))
    }

    fn write_line(&self, line: &str) -> io::Result<()> {
        let out = match &self.out {
            Some(out) => out,
            None => return Ok(()),
        };

        let mut out = out
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "record writer lock poisoned"))?;
        writeln!(out, "{}", line)?;
        out.flush()
    }
}

/// Print the run configuration banner
pub fn print_configuration(config: &Config, mode: ExecutionMode) {
    println!("Configuration:");
    println!("  Mode:         {:?}", mode);
    println!("  Domain:       [-{}, {}]", config.simulation.domain_bound, config.simulation.domain_bound);
    println!("  Step budget:  {}", config.simulation.step_budget);
    if mode != ExecutionMode::Walker {
        println!("  Group size:   {} ({} walkers)", config.group.size, config.walker_count());
    }
    match config.runtime.receive_timeout_secs {
        Some(secs) => println!("  Recv timeout: {}s", secs),
        None => println!("  Recv timeout: none"),
    }
    if let Some(seed) = config.runtime.seed {
        println!("  Seed base:    {}", seed);
    }
}

/// Print the end-of-run summary
pub fn print_summary(summary: &RunSummary) {
    println!();
    println!("Summary:");
    println!("  Walkers:          {}", summary.walkers);
    println!("  Boundary escapes: {}", summary.escaped());
    println!("  Budget exhausted: {}", summary.exhausted());
    println!("  Elapsed:          {}", format_duration(summary.elapsed.to_duration()));
}

/// In-memory writer for asserting on records
#[cfg(test)]
pub(crate) mod capture {
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    pub struct CapturedRecords(Arc<Mutex<Vec<u8>>>);

    impl CapturedRecords {
        pub fn lines(&self) -> Vec<String> {
            String::from_utf8(self.0.lock().unwrap().clone())
                .unwrap()
                .lines()
                .map(str::to_string)
                .collect()
        }
    }

    impl Write for CapturedRecords {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }
}
