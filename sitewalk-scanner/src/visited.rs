//! The shared visited set.
//!
//! [`VisitedSet::try_claim`] is the only mutation and the sole point that
//! prevents two workers from expanding the same node.

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
pub struct VisitedSet<N> {
    inner: Mutex<HashSet<N>>,
}

impl<N> VisitedSet<N>
where
    N: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashSet::new()),
        }
    }

    /// Atomically mark `node` visited. Returns `true` only for the first caller.
    pub fn try_claim(&self, node: &N) -> bool {
        let mut visited = self.lock();
        if visited.contains(node) {
            return false;
        }
        visited.insert(node.clone())
    }

    pub fn contains(&self, node: &N) -> bool {
        self.lock().contains(node)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Freeze the set and hand it to the caller.
    pub fn into_inner(self) -> HashSet<N> {
        self.inner.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    // A panic elsewhere cannot leave the set half-updated: inserts are atomic.
    fn lock(&self) -> MutexGuard<'_, HashSet<N>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<N> Default for VisitedSet<N>
where
    N: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
