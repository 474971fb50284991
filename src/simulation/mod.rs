//! Standalone runner
//!
//! Runs a whole group inside one process: rank 0 (the coordinator) on the
//! calling thread and every walker rank on its own thread, all connected by
//! the in-process transport.
//!
//! # Failure handling
//!
//! A walker whose completion signal cannot be delivered sends an abort notice
//! instead (best effort), so the coordinator stops rather than waiting for a
//! signal that will never come. If a walker thread dies without either, the
//! coordinator's inbox disconnects once the remaining walkers are gone and the
//! run fails with a transport error.

use crate::config::Config;
use crate::coordinator::{CompletionSummary, Coordinator};
use crate::output::json::RunSummary;
use crate::output::text::RecordSink;
use crate::transport::{self, AbortNotice, Endpoint, Message, MessageSender, Role, COORDINATOR_RANK};
use crate::util::time::Timestamp;
use crate::walker::step_source::time_seed;
use crate::walker::{TerminationReport, Walker};
use crate::Result;
use anyhow::Context;
use chrono::Utc;
use std::thread;
use tracing::{debug, warn};

/// Run a full group locally and return the run summary
///
/// Writes each walker's record to `records` as it finishes and the controller
/// record once, after the last signal.
pub fn run_local(config: &Config, records: &RecordSink) -> Result<RunSummary> {
    let started_at = Utc::now();
    let start = Timestamp::now();

    let seed_base = config.runtime.seed.unwrap_or_else(time_seed);
    debug!(size = config.group.size, seed_base, "starting local group");

    let mut coordinator_endpoint = None;
    let mut handles = Vec::with_capacity(config.walker_count());
    for endpoint in transport::group(config.group.size) {
        match Role::of(endpoint.rank()) {
            Role::Coordinator => coordinator_endpoint = Some(endpoint),
            Role::Walker => {
                let walker = Walker::new(endpoint.rank(), config.simulation, seed_base);
                let rank = walker.rank();
                let records = records.clone();

                let handle = thread::Builder::new()
                    .name(format!("walker-{}", rank))
                    .spawn(move || walker_thread(walker, endpoint, records))
                    .with_context(|| format!("Failed to spawn walker {}", rank))?;

                handles.push(handle);
            }
        }
    }
    let coordinator_endpoint =
        coordinator_endpoint.context("Group must contain at least the coordinator")?;

    let coordinator = Coordinator::new(config.walker_count())
        .with_receive_timeout(config.runtime.receive_timeout());
    let outcome = coordinator.run(&coordinator_endpoint.into_inbox());

    if let Ok(completion) = &outcome {
        if let Err(e) = records.completion(completion.walkers) {
            warn!(error = %e, "failed to write controller record");
        }
    }

    // Walkers always terminate (finite budget), so joining cannot hang
    let mut walker_failures = Vec::new();
    for handle in handles {
        match handle.join() {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => walker_failures.push(e),
            Err(_) => walker_failures.push(anyhow::anyhow!("Walker thread panicked")),
        }
    }

    let completion: CompletionSummary = outcome.context("Coordinator failed")?;
    if let Some(first) = walker_failures.into_iter().next() {
        return Err(first.context("Walker failed"));
    }

    Ok(RunSummary::new(&config.simulation, &completion, started_at, start.elapsed()))
}

/// Body of one walker thread
fn walker_thread(walker: Walker, endpoint: Endpoint, records: RecordSink) -> Result<TerminationReport> {
    let finished = walker.walk();
    let rank = finished.rank();

    // Record first, so it is written before the coordinator can finish
    if let Err(e) = records.walker(rank, finished.report()) {
        warn!(rank, error = %e, "failed to write walker record");
    }

    match finished.signal(&endpoint) {
        Ok(report) => Ok(report),
        Err(e) => {
            warn!(rank, error = %e, "completion signal failed");
            let notice = AbortNotice::new(format!("completion signal failed: {}", e));
            if let Err(abort_err) = endpoint.send(COORDINATOR_RANK, Message::Abort(notice)) {
                warn!(rank, error = %abort_err, "abort notice failed");
            }
            Err(e).with_context(|| format!("Walker {} could not signal completion", rank))
        }
    }
}
