//! Frontier queue and the counted termination protocol.
//!
//! Every pushed node bumps `pending` before it is sent, and a worker only
//! calls [`Frontier::complete_one`] after it has pushed all children of the
//! node it was processing. `pending` can therefore only reach zero when no
//! node is queued and no worker holds one.

use crossbeam_channel::{Receiver, Sender, unbounded};
use std::sync::atomic::{AtomicUsize, Ordering};

/// One unit pulled from the frontier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Task<N> {
    Expand(N),
    Stop,
}

pub struct Frontier<N> {
    sender: Sender<Task<N>>,
    receiver: Receiver<Task<N>>,
    pending: AtomicUsize,
}

impl<N> Frontier<N> {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            sender,
            receiver,
            pending: AtomicUsize::new(0),
        }
    }

    /// Enqueue a claimed node. Never blocks.
    pub fn push(&self, node: N) {
        self.pending.fetch_add(1, Ordering::SeqCst);
        // Both ends live in `self`, so the channel cannot be disconnected here.
        let _ = self.sender.send(Task::Expand(node));
    }

    /// Block until a task is available.
    pub fn pop(&self) -> Task<N> {
        self.receiver.recv().unwrap_or(Task::Stop)
    }

    /// Mark one popped node as fully processed.
    ///
    /// Returns `true` iff this call took the pending count to zero.
    pub fn complete_one(&self) -> bool {
        let previous = self.pending.fetch_sub(1, Ordering::SeqCst);
        debug_assert!(previous > 0, "pending work underflow");
        previous == 1
    }

    /// Queue one stop marker per worker.
    pub fn stop(&self, workers: usize) {
        for _ in 0..workers {
            let _ = self.sender.send(Task::Stop);
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Traversal is complete when nothing is queued and nothing is in flight.
    pub fn is_quiescent(&self) -> bool {
        self.pending() == 0 && self.is_empty()
    }
}

impl<N> Default for Frontier<N> {
    fn default() -> Self {
        Self::new()
    }
}
