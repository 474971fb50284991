//! In-process transport over crossbeam channels
//!
//! [`group`] builds one [`Endpoint`] per rank. Each endpoint owns the receiving
//! half of its own inbox and a sending handle to every inbox in the group.
//! Endpoints are `Send`, so each one can be moved onto its participant's thread.

use super::{AnySourceReceiver, Envelope, Message, MessageSender, Rank, TransportError};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::time::Duration;

/// Build a fully connected group of `size` endpoints, indexed by rank
pub fn group(size: usize) -> Vec<Endpoint> {
    let (outboxes, inboxes): (Vec<_>, Vec<_>) = (0..size)
        .map(|_| channel::unbounded::<Envelope>())
        .unzip();

    inboxes
        .into_iter()
        .enumerate()
        .map(|(rank, rx)| Endpoint {
            rank,
            outboxes: outboxes.clone(),
            inbox: Inbox { rank, rx },
        })
        .collect()
}

/// One participant's view of an in-process group
pub struct Endpoint {
    rank: Rank,
    outboxes: Vec<Sender<Envelope>>,
    inbox: Inbox,
}

impl Endpoint {
    pub fn rank(&self) -> Rank {
        self.rank
    }

    /// Keep only the receiving side
    ///
    /// Dropping the outgoing handles means the inbox reports `Disconnected`
    /// once every other participant has gone away, instead of blocking forever.
    pub fn into_inbox(self) -> Inbox {
        self.inbox
    }
}

impl MessageSender for Endpoint {
    fn send(&self, dest: Rank, message: Message) -> Result<(), TransportError> {
        let outbox = self.outboxes.get(dest).ok_or(TransportError::UnknownRank {
            rank: dest,
            size: self.outboxes.len(),
        })?;

        outbox
            .send(Envelope::new(self.rank, message))
            .map_err(|_| TransportError::Disconnected { rank: dest })
    }
}

impl AnySourceReceiver for Endpoint {
    fn recv_any(&self, timeout: Option<Duration>) -> Result<Envelope, TransportError> {
        self.inbox.recv_any(timeout)
    }

    fn try_recv_any(&self) -> Result<Option<Envelope>, TransportError> {
        self.inbox.try_recv_any()
    }
}

/// Receiving half of a participant's queue
pub struct Inbox {
    rank: Rank,
    rx: Receiver<Envelope>,
}

impl Inbox {
    /// Create a standalone inbox for `rank` and the sender that feeds it
    ///
    /// Used by transports that deliver from outside the process: every
    /// connection handler gets a clone of the sender.
    pub fn channel(rank: Rank) -> (Sender<Envelope>, Inbox) {
        let (tx, rx) = channel::unbounded();
        (tx, Inbox { rank, rx })
    }

}

impl AnySourceReceiver for Inbox {
    fn recv_any(&self, timeout: Option<Duration>) -> Result<Envelope, TransportError> {
        match timeout {
            None => self
                .rx
                .recv()
                .map_err(|_| TransportError::Disconnected { rank: self.rank }),
            Some(window) => self.rx.recv_timeout(window).map_err(|e| match e {
                RecvTimeoutError::Timeout => TransportError::Timeout(window),
                RecvTimeoutError::Disconnected => TransportError::Disconnected { rank: self.rank },
            }),
        }
    }

    fn try_recv_any(&self) -> Result<Option<Envelope>, TransportError> {
        match self.rx.try_recv() {
            Ok(envelope) => Ok(Some(envelope)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(TransportError::Disconnected { rank: self.rank }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{AbortNotice, COORDINATOR_RANK};

    fn abort(reason: &str) -> Message {
        Message::Abort(AbortNotice::new(reason))
    }

    #[test]
    fn test_group_ranks() {
        let endpoints = group(4);
        assert_eq!(endpoints.len(), 4);
        for (i, endpoint) in endpoints.iter().enumerate() {
            assert_eq!(endpoint.rank(), i);
        }
    }

    #[test]
    fn test_send_stamps_source_rank() {
        let endpoints = group(3);
        endpoints[2].send(COORDINATOR_RANK, abort("x")).unwrap();

        let envelope = endpoints[0].recv_any(None).unwrap();
        assert_eq!(envelope.source, 2);
        assert_eq!(envelope.message, abort("x"));
    }

    #[test]
    fn test_send_to_unknown_rank() {
        let endpoints = group(2);
        match endpoints[1].send(5, abort("x")) {
            Err(TransportError::UnknownRank { rank: 5, size: 2 }) => {}
            other => panic!("Expected UnknownRank, got {:?}", other),
        }
    }

    #[test]
    fn test_recv_timeout_on_empty_inbox() {
        let endpoints = group(2);
        let window = Duration::from_millis(20);
        match endpoints[0].recv_any(Some(window)) {
            Err(TransportError::Timeout(d)) => assert_eq!(d, window),
            other => panic!("Expected Timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_inbox_disconnects_when_all_peers_drop() {
        let mut endpoints = group(3);
        let walkers = endpoints.split_off(1);
        let inbox = endpoints.pop().unwrap().into_inbox();

        walkers[0].send(COORDINATOR_RANK, abort("first")).unwrap();
        drop(walkers);

        // Queued messages are still delivered before the disconnect shows up
        assert_eq!(inbox.recv_any(None).unwrap().source, 1);
        assert!(matches!(
            inbox.recv_any(None),
            Err(TransportError::Disconnected { rank: 0 })
        ));
    }

    #[test]
    fn test_try_recv_any() {
        let (tx, inbox) = Inbox::channel(COORDINATOR_RANK);
        assert!(inbox.try_recv_any().unwrap().is_none());

        tx.send(Envelope::new(3, abort("late"))).unwrap();
        assert_eq!(inbox.try_recv_any().unwrap().unwrap().source, 3);
    }
}
