//! Single-flight execution lock.
//!
//! The lock owns the exchange's event channel. Holding the guard is therefore the only way to
//! read confirmations, and at most one sequence can be waiting for them at a time. The guard
//! releases the lock when dropped, on every exit path of the sequence that holds it.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::exchange::Events;

/// Shared single-flight token
#[derive(Debug, Clone)]
pub struct ExecutionLock {
    /// Event channel, reachable only through a guard
    events: Arc<Mutex<Events>>,
}

/// Exclusive right to submit one order sequence
#[derive(Debug)]
pub struct ExecutionGuard {
    /// The locked event channel
    events: OwnedMutexGuard<Events>,
}

impl ExecutionLock {
    /// Wraps the exchange's event channel
    #[must_use]
    pub fn new(events: Events) -> Self {
        Self {
            events: Arc::new(Mutex::new(events)),
        }
    }

    /// Acquires the lock without waiting. `None` if a sequence already holds it.
    #[must_use]
    pub fn try_acquire(&self) -> Option<ExecutionGuard> {
        Arc::clone(&self.events)
            .try_lock_owned()
            .ok()
            .map(|events| ExecutionGuard { events })
    }

    /// Whether a sequence currently holds the lock
    #[must_use]
    pub fn is_held(&self) -> bool {
        self.events.try_lock().is_err()
    }

    /// Waits until the lock is free, then releases it again
    pub async fn wait_idle(&self) {
        drop(self.events.lock().await);
    }
}

impl ExecutionGuard {
    /// The exchange's event channel
    pub fn events(&mut self) -> &mut Events {
        &mut self.events
    }

    /// Discards events already queued, returning them.
    ///
    /// Anything queued before the first submission of a new sequence belongs to an earlier
    /// one and would shift the positional matching of confirmations.
    pub fn drain_stale(&mut self) -> Vec<String> {
        let mut stale = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            stale.push(event);
        }
        stale
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    #[tokio::test]
    async fn test_single_holder() {
        let (_sender, events) = mpsc::unbounded_channel();
        let lock = ExecutionLock::new(events);

        let guard = lock.try_acquire().unwrap();
        assert!(lock.is_held());
        assert!(lock.try_acquire().is_none());

        drop(guard);
        assert!(!lock.is_held());
        assert!(lock.try_acquire().is_some());
    }

    #[tokio::test]
    async fn test_released_when_holder_panics() {
        let (_sender, events) = mpsc::unbounded_channel();
        let lock = ExecutionLock::new(events);

        let guard = lock.try_acquire().unwrap();
        let task = tokio::spawn(async move {
            let _guard = guard;
            panic!("sequence failed");
        });
        assert!(task.await.is_err());
        assert!(!lock.is_held());
    }

    #[tokio::test]
    async fn test_drain_stale() {
        let (sender, events) = mpsc::unbounded_channel();
        let lock = ExecutionLock::new(events);
        sender.send("late".to_string()).unwrap();
        sender.send("later".to_string()).unwrap();

        let mut guard = lock.try_acquire().unwrap();
        assert_eq!(guard.drain_stale(), vec!["late", "later"]);
        assert!(guard.drain_stale().is_empty());
    }
}
