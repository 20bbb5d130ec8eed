use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::{MatchId, UserId};

#[async_trait::async_trait]
pub trait MatchLockService {
    async fn lock(&self, match_id: MatchId) -> OwnedMutexGuard<()>;
    /// Serialises work on the unordered pair of users.
    async fn lock_pair(&self, user_a: UserId, user_b: UserId) -> OwnedMutexGuard<()>;
    /// Drops locks nobody holds or waits on.
    fn prune(&self) -> usize;
}

pub struct MatchLockServiceImpl {
    locks: DashMap<MatchId, Arc<Mutex<()>>>,
    pair_locks: DashMap<(UserId, UserId), Arc<Mutex<()>>>,
}

impl MatchLockServiceImpl {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
            pair_locks: DashMap::new(),
        }
    }

    fn lock_for(&self, match_id: MatchId) -> Arc<Mutex<()>> {
        self.locks
            .entry(match_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    fn pair_lock_for(&self, user_a: UserId, user_b: UserId) -> Arc<Mutex<()>> {
        let key = if user_a.0 <= user_b.0 {
            (user_a, user_b)
        } else {
            (user_b, user_a)
        };
        self.pair_locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[async_trait::async_trait]
impl MatchLockService for MatchLockServiceImpl {
    async fn lock(&self, match_id: MatchId) -> OwnedMutexGuard<()> {
        self.lock_for(match_id).lock_owned().await
    }

    async fn lock_pair(&self, user_a: UserId, user_b: UserId) -> OwnedMutexGuard<()> {
        self.pair_lock_for(user_a, user_b).lock_owned().await
    }

    fn prune(&self) -> usize {
        let before = self.locks.len() + self.pair_locks.len();
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        self.pair_locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - self.locks.len() - self.pair_locks.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_lock_serialises_same_match() {
        let service = Arc::new(MatchLockServiceImpl::new());
        let match_id = MatchId::new();

        let guard = service.lock(match_id).await;
        let contender = {
            let service = service.clone();
            tokio::spawn(async move {
                let _guard = service.lock(match_id).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        // a different match is not blocked
        let _other = service.lock(MatchId::new()).await;

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn test_prune_keeps_held_locks() {
        let service = MatchLockServiceImpl::new();
        let held = MatchId::new();
        let guard = service.lock(held).await;
        drop(service.lock(MatchId::new()).await);

        assert_eq!(service.prune(), 1);
        assert_eq!(service.locks.len(), 1);
        drop(guard);
        assert_eq!(service.prune(), 1);
    }

    #[tokio::test]
    async fn test_pair_lock_ignores_order() {
        let service = Arc::new(MatchLockServiceImpl::new());
        let alice = UserId::new();
        let bob = UserId::new();

        let guard = service.lock_pair(alice, bob).await;
        let contender = {
            let service = service.clone();
            tokio::spawn(async move {
                let _guard = service.lock_pair(bob, alice).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        let _other = service.lock_pair(alice, UserId::new()).await;

        drop(guard);
        contender.await.unwrap();
    }
}
