//! # Turn Lock Module
//!
//! Thread-safe per-user turn serialization. The dispatcher may run
//! handlers for many updates concurrently; holding a user's lock for
//! the whole load → transition → persist → send sequence keeps two
//! near-simultaneous messages from the same user from interleaving
//! state updates, while distinct users proceed in parallel.
//!
//! Locks are created on first contact and kept for the lifetime of the
//! process; memory use scales with the number of distinct users seen,
//! which matches the store's own one-row-per-user growth.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::OwnedMutexGuard;

/// Lock map granting one in-flight turn per user
pub struct TurnLockManager {
    locks: Mutex<HashMap<i64, Arc<tokio::sync::Mutex<()>>>>,
}

impl TurnLockManager {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the turn lock for `user_id`, waiting if a turn for the
    /// same user is already in flight. The guard releases on drop.
    pub async fn acquire(&self, user_id: i64) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap();
            Arc::clone(
                locks
                    .entry(user_id)
                    .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
            )
        };

        lock.lock_owned().await
    }

    /// Number of users a lock has been created for
    pub fn user_count(&self) -> usize {
        let locks = self.locks.lock().unwrap();
        locks.len()
    }
}

impl Default for TurnLockManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_locks_are_per_user() {
        let manager = TurnLockManager::new();

        // Holding one user's lock must not block another user
        let _guard_a = manager.acquire(1).await;
        let _guard_b = manager.acquire(2).await;

        assert_eq!(manager.user_count(), 2);
    }

    #[tokio::test]
    async fn test_same_user_waits() {
        let manager = Arc::new(TurnLockManager::new());

        let guard = manager.acquire(1).await;

        let contender = {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                let _guard = manager.acquire(1).await;
            })
        };

        // The second acquire cannot complete while the first guard lives
        tokio::task::yield_now().await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_lock_is_reused_for_known_user() {
        let manager = TurnLockManager::new();

        drop(manager.acquire(7).await);
        drop(manager.acquire(7).await);

        assert_eq!(manager.user_count(), 1);
    }
}
