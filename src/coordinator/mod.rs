//! Coordinator module
//!
//! Detects global termination by counting completion signals.
//!
//! The coordinator knows how many walkers exist and nothing else about them.
//! It blocks on an any-source receive, counts one unit per completion signal,
//! and returns once the count reaches the walker total. Arrival order never
//! matters: the signals are treated as an unordered multiset of known size.
//!
//! The count is owned by the single receive loop in [`Coordinator::run`], so no
//! synchronization beyond the receive itself is needed.
//!
//! # Protocol violations
//!
//! Each walker signals exactly once, so a second signal from the same rank, a
//! signal from a rank outside the walker range, or a signal still queued after
//! the count completed all mean the protocol was broken. These are reported as
//! errors, never absorbed.
//!
//! The excess check after completion is a single non-blocking look at the
//! inbox: it catches signals already queued when the count completes, not
//! ones sent after the coordinator has returned.
//!
//! Rank 0 never walks, so an abort notice carrying the coordinator's own rank
//! comes from the coordinator's infrastructure (a connection that failed
//! before identifying itself) and is reported as [`CoordinatorError::ServiceFailure`].

use crate::transport::{AnySourceReceiver, CompletionSignal, Message, Rank, TransportError, COORDINATOR_RANK};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Reasons the coordinator stops before declaring completion
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("transport failed after {received}/{expected} completion signals: {source}")]
    Transport {
        received: usize,
        expected: usize,
        #[source]
        source: TransportError,
    },

    #[error("walker {rank} aborted: {reason}")]
    WalkerAborted { rank: Rank, reason: String },

    #[error("coordinator service failed: {reason}")]
    ServiceFailure { reason: String },

    #[error("duplicate completion signal from walker {rank}")]
    DuplicateSignal { rank: Rank },

    #[error("stray completion signal from rank {rank} (walkers are 1..={walkers})")]
    StraySignal { rank: Rank, walkers: usize },

    #[error("completion signal from rank {rank} arrived after all {expected} walkers had reported")]
    ExcessSignal { rank: Rank, expected: usize },
}

/// Counting state, owned by the receive loop
#[derive(Debug)]
pub struct CoordinatorState {
    expected_count: usize,
    received_count: usize,
    /// Ranks already counted; grows with arrivals, not with `expected_count`
    reported: HashSet<Rank>,
}

impl CoordinatorState {
    pub fn new(expected_count: usize) -> Self {
        Self {
            expected_count,
            received_count: 0,
            reported: HashSet::new(),
        }
    }

    pub fn expected_count(&self) -> usize {
        self.expected_count
    }

    pub fn received_count(&self) -> usize {
        self.received_count
    }

    pub fn is_complete(&self) -> bool {
        self.received_count == self.expected_count
    }

    /// Count one completion signal from `rank`
    pub fn record(&mut self, rank: Rank) -> Result<(), CoordinatorError> {
        if self.is_complete() {
            return Err(CoordinatorError::ExcessSignal {
                rank,
                expected: self.expected_count,
            });
        }

        if rank == COORDINATOR_RANK || rank > self.expected_count {
            return Err(CoordinatorError::StraySignal {
                rank,
                walkers: self.expected_count,
            });
        }
        if !self.reported.insert(rank) {
            return Err(CoordinatorError::DuplicateSignal { rank });
        }

        self.received_count += 1;
        Ok(())
    }
}

/// Result of a completed run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionSummary {
    /// Number of walkers that reported
    pub walkers: usize,
    /// Signals in the order they were received
    pub signals: Vec<(Rank, CompletionSignal)>,
}

impl CompletionSummary {
    pub fn arrival_order(&self) -> Vec<Rank> {
        self.signals.iter().map(|(rank, _)| *rank).collect()
    }
}

/// Termination detector for a fixed-size cohort of walkers
#[derive(Debug, Clone)]
pub struct Coordinator {
    expected_count: usize,
    receive_timeout: Option<Duration>,
}

impl Coordinator {
    pub fn new(expected_count: usize) -> Self {
        Self {
            expected_count,
            receive_timeout: None,
        }
    }

    /// Fail instead of waiting forever when a walker goes silent
    pub fn with_receive_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.receive_timeout = timeout;
        self
    }

    /// Block until every walker has reported
    ///
    /// Returns immediately when there are no walkers.
    pub fn run<R: AnySourceReceiver + ?Sized>(&self, inbox: &R) -> Result<CompletionSummary, CoordinatorError> {
        let mut state = CoordinatorState::new(self.expected_count);
        let mut signals = Vec::new();

        while !state.is_complete() {
            let envelope = inbox
                .recv_any(self.receive_timeout)
                .map_err(|source| CoordinatorError::Transport {
                    received: state.received_count(),
                    expected: state.expected_count(),
                    source,
                })?;

            match envelope.message {
                Message::Completion(signal) => {
                    state.record(envelope.source)?;
                    signals.push((envelope.source, signal));
                    debug!(
                        rank = envelope.source,
                        received = state.received_count(),
                        expected = state.expected_count(),
                        "completion signal"
                    );
                }
                Message::Abort(notice) if envelope.source == COORDINATOR_RANK => {
                    warn!(reason = %notice.reason, "coordinator service failed");
                    return Err(CoordinatorError::ServiceFailure { reason: notice.reason });
                }
                Message::Abort(notice) => {
                    warn!(rank = envelope.source, reason = %notice.reason, "walker aborted");
                    return Err(CoordinatorError::WalkerAborted {
                        rank: envelope.source,
                        reason: notice.reason,
                    });
                }
            }
        }

        // Anything already queued at this point is one signal too many
        match inbox.try_recv_any() {
            Ok(Some(extra)) => {
                return Err(CoordinatorError::ExcessSignal {
                    rank: extra.source,
                    expected: self.expected_count,
                })
            }
            // Every producer already gone is the normal end of a run
            Ok(None) | Err(TransportError::Disconnected { .. }) => {}
            Err(source) => {
                return Err(CoordinatorError::Transport {
                    received: state.received_count(),
                    expected: state.expected_count(),
                    source,
                })
            }
        }

        Ok(CompletionSummary {
            walkers: state.received_count(),
            signals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{AbortNotice, Envelope, Inbox, COORDINATOR_RANK};
    use crate::walker::TerminationReason;
    use crossbeam::channel::Sender;
    use std::thread;
    use std::time::Instant;

    fn completion(steps: u64) -> Message {
        Message::Completion(CompletionSignal {
            steps,
            reason: TerminationReason::BudgetExhausted,
        })
    }

    fn deliver(tx: &Sender<Envelope>, ranks: &[Rank]) {
        for &rank in ranks {
            tx.send(Envelope::new(rank, completion(rank as u64))).unwrap();
        }
    }

    /// All orderings of `items`
    fn permutations(items: &[Rank]) -> Vec<Vec<Rank>> {
        if items.len() <= 1 {
            return vec![items.to_vec()];
        }
        let mut out = Vec::new();
        for i in 0..items.len() {
            let mut rest = items.to_vec();
            let head = rest.remove(i);
            for mut tail in permutations(&rest) {
                tail.insert(0, head);
                out.push(tail);
            }
        }
        out
    }

    #[test]
    fn test_zero_walkers_returns_immediately() {
        // No sender will ever deliver; a blocking receive would hang
        let (_tx, inbox) = Inbox::channel(COORDINATOR_RANK);
        let summary = Coordinator::new(0).run(&inbox).unwrap();

        assert_eq!(summary.walkers, 0);
        assert!(summary.signals.is_empty());
    }

    #[test]
    fn test_every_arrival_order_terminates() {
        let all = permutations(&[1, 2, 3, 4]);
        assert_eq!(all.len(), 24);

        for order in all {
            let (tx, inbox) = Inbox::channel(COORDINATOR_RANK);
            deliver(&tx, &order);

            let summary = Coordinator::new(4).run(&inbox).unwrap();
            assert_eq!(summary.walkers, 4);
            assert_eq!(summary.arrival_order(), order);
        }
    }

    #[test]
    fn test_does_not_complete_before_last_signal() {
        let (tx, inbox) = Inbox::channel(COORDINATOR_RANK);
        deliver(&tx, &[2, 4, 1]);

        let coordinator = Coordinator::new(4).with_receive_timeout(Some(Duration::from_millis(50)));
        match coordinator.run(&inbox) {
            Err(CoordinatorError::Transport {
                received: 3,
                expected: 4,
                source: TransportError::Timeout(_),
            }) => {}
            other => panic!("Expected timeout after 3 signals, got {:?}", other),
        }
    }

    #[test]
    fn test_blocks_until_signals_arrive() {
        let (tx, inbox) = Inbox::channel(COORDINATOR_RANK);

        let producer = thread::spawn(move || {
            for rank in [3, 1, 2] {
                thread::sleep(Duration::from_millis(10));
                deliver(&tx, &[rank]);
            }
        });

        let start = Instant::now();
        let summary = Coordinator::new(3).run(&inbox).unwrap();
        producer.join().unwrap();

        assert_eq!(summary.arrival_order(), vec![3, 1, 2]);
        assert!(start.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_duplicate_signal_is_violation() {
        let (tx, inbox) = Inbox::channel(COORDINATOR_RANK);
        deliver(&tx, &[1, 1, 2]);

        assert!(matches!(
            Coordinator::new(3).run(&inbox),
            Err(CoordinatorError::DuplicateSignal { rank: 1 })
        ));
    }

    #[test]
    fn test_stray_signal_is_violation() {
        let (tx, inbox) = Inbox::channel(COORDINATOR_RANK);
        deliver(&tx, &[5]);
        assert!(matches!(
            Coordinator::new(2).run(&inbox),
            Err(CoordinatorError::StraySignal { rank: 5, walkers: 2 })
        ));

        let (tx, inbox) = Inbox::channel(COORDINATOR_RANK);
        deliver(&tx, &[COORDINATOR_RANK]);
        assert!(matches!(
            Coordinator::new(2).run(&inbox),
            Err(CoordinatorError::StraySignal { rank: 0, .. })
        ));
    }

    #[test]
    fn test_excess_signal_is_violation() {
        let (tx, inbox) = Inbox::channel(COORDINATOR_RANK);
        deliver(&tx, &[1, 2, 2]);

        assert!(matches!(
            Coordinator::new(2).run(&inbox),
            Err(CoordinatorError::ExcessSignal { rank: 2, expected: 2 })
        ));
    }

    #[test]
    fn test_abort_stops_the_run() {
        let (tx, inbox) = Inbox::channel(COORDINATOR_RANK);
        deliver(&tx, &[1]);
        tx.send(Envelope::new(2, Message::Abort(AbortNotice::new("send failed")))).unwrap();

        match Coordinator::new(3).run(&inbox) {
            Err(CoordinatorError::WalkerAborted { rank: 2, reason }) => assert_eq!(reason, "send failed"),
            other => panic!("Expected WalkerAborted, got {:?}", other),
        }
    }

    #[test]
    fn test_disconnect_is_reported_not_hung() {
        let (tx, inbox) = Inbox::channel(COORDINATOR_RANK);
        deliver(&tx, &[1]);
        drop(tx);

        assert!(matches!(
            Coordinator::new(2).run(&inbox),
            Err(CoordinatorError::Transport {
                received: 1,
                expected: 2,
                source: TransportError::Disconnected { .. },
            })
        ));
    }

    #[test]
    fn test_service_failure_is_not_a_walker_abort() {
        let (tx, inbox) = Inbox::channel(COORDINATOR_RANK);
        tx.send(Envelope::new(COORDINATOR_RANK, Message::Abort(AbortNotice::new("accept failed"))))
            .unwrap();

        match Coordinator::new(2).run(&inbox) {
            Err(CoordinatorError::ServiceFailure { reason }) => assert_eq!(reason, "accept failed"),
            other => panic!("Expected ServiceFailure, got {:?}", other),
        }
    }

    #[test]
    fn test_disconnect_after_last_signal_is_success() {
        let (tx, inbox) = Inbox::channel(COORDINATOR_RANK);
        deliver(&tx, &[2, 1]);
        drop(tx);

        assert_eq!(Coordinator::new(2).run(&inbox).unwrap().arrival_order(), vec![2, 1]);
    }

    #[test]
    fn test_huge_walker_count_does_not_preallocate() {
        let (tx, inbox) = Inbox::channel(COORDINATOR_RANK);
        deliver(&tx, &[1, usize::MAX - 1]);

        let coordinator =
            Coordinator::new(usize::MAX - 1).with_receive_timeout(Some(Duration::from_millis(20)));
        match coordinator.run(&inbox) {
            Err(CoordinatorError::Transport {
                received: 2,
                source: TransportError::Timeout(_),
                ..
            }) => {}
            other => panic!("Expected timeout after 2 signals, got {:?}", other),
        }
    }

    #[test]
    fn test_state_counts_monotonically() {
        let mut state = CoordinatorState::new(2);
        assert!(!state.is_complete());

        state.record(2).unwrap();
        assert_eq!(state.received_count(), 1);
        state.record(1).unwrap();
        assert_eq!(state.received_count(), 2);
        assert!(state.is_complete());

        assert!(state.record(1).is_err());
        assert_eq!(state.received_count(), 2);
    }
}
