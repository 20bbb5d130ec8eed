use std::sync::Arc;

use chrono::Utc;

use crate::{
    domain::{
        RepoCreateError, UserId,
        friendship::{Friendship, FriendshipRepository, FriendshipStatus},
        user::UserRepository,
    },
    workflow::friends::{FriendshipError, load_relation, resolve_target},
};

#[async_trait::async_trait]
pub trait FriendRequestUseCase {
    /// Returns `Accepted` when the target had already asked the actor.
    async fn send_request(
        &self,
        actor: UserId,
        target_name: &str,
    ) -> Result<FriendshipStatus, FriendshipError>;
    async fn accept_request(
        &self,
        actor: UserId,
        requester_name: &str,
    ) -> Result<(), FriendshipError>;
}

pub struct FriendRequestUseCaseImpl<U: UserRepository, F: FriendshipRepository> {
    user_repository: Arc<U>,
    friendship_repository: Arc<F>,
}

impl<U: UserRepository, F: FriendshipRepository> FriendRequestUseCaseImpl<U, F> {
    pub fn new(user_repository: Arc<U>, friendship_repository: Arc<F>) -> Self {
        Self {
            user_repository,
            friendship_repository,
        }
    }
}

#[async_trait::async_trait]
impl<U: UserRepository + Send + Sync + 'static, F: FriendshipRepository + Send + Sync + 'static>
    FriendRequestUseCase for FriendRequestUseCaseImpl<U, F>
{
    async fn send_request(
        &self,
        actor: UserId,
        target_name: &str,
    ) -> Result<FriendshipStatus, FriendshipError> {
        let target = resolve_target(self.user_repository.as_ref(), actor, target_name).await?;
        let relation = load_relation(self.friendship_repository.as_ref(), actor, target.id).await?;

        if relation.is_blocked() {
            return Err(FriendshipError::Blocked);
        }
        if relation.are_friends() {
            return Err(FriendshipError::AlreadyFriends);
        }
        if relation.outgoing.is_some() {
            return Err(FriendshipError::AlreadyRequested);
        }
        if let Some(incoming) = relation.incoming {
            self.friendship_repository
                .set_friendship_status(incoming.id, FriendshipStatus::Accepted)
                .await?;
            log::info!("Users {} and {} are now friends", actor, target.id);
            return Ok(FriendshipStatus::Accepted);
        }

        let request = Friendship::new(actor, target.id, FriendshipStatus::Pending, Utc::now());
        self.friendship_repository
            .create_friendship(&request)
            .await
            .map_err(|e| match e {
                RepoCreateError::Conflict => FriendshipError::AlreadyRequested,
                RepoCreateError::StorageError(e) => FriendshipError::Internal(e),
            })?;
        log::debug!("User {} sent a friend request to {}", actor, target.id);
        Ok(FriendshipStatus::Pending)
    }

    async fn accept_request(
        &self,
        actor: UserId,
        requester_name: &str,
    ) -> Result<(), FriendshipError> {
        let requester =
            resolve_target(self.user_repository.as_ref(), actor, requester_name).await?;
        let relation =
            load_relation(self.friendship_repository.as_ref(), actor, requester.id).await?;

        match relation.incoming {
            Some(request) if request.status == FriendshipStatus::Pending => {
                self.friendship_repository
                    .set_friendship_status(request.id, FriendshipStatus::Accepted)
                    .await?;
                log::info!("Users {} and {} are now friends", actor, requester.id);
                Ok(())
            }
            _ => Err(FriendshipError::NoPendingRequest),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::testing::InMemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_request_and_accept() {
        let store = Arc::new(InMemoryStore::new());
        let use_case = FriendRequestUseCaseImpl::new(store.clone(), store.clone());
        let alice = store.add_user("alice").await;
        let bob = store.add_user("bob").await;

        assert_eq!(
            use_case.send_request(alice.id, "bob").await.unwrap(),
            FriendshipStatus::Pending
        );
        assert!(matches!(
            use_case.send_request(alice.id, "bob").await,
            Err(FriendshipError::AlreadyRequested)
        ));
        // only the addressee can accept
        assert!(matches!(
            use_case.accept_request(alice.id, "bob").await,
            Err(FriendshipError::NoPendingRequest)
        ));

        use_case.accept_request(bob.id, "alice").await.unwrap();
        assert!(matches!(
            use_case.send_request(bob.id, "alice").await,
            Err(FriendshipError::AlreadyFriends)
        ));
    }

    #[tokio::test]
    async fn test_crossing_requests_become_friendship() {
        let store = Arc::new(InMemoryStore::new());
        let use_case = FriendRequestUseCaseImpl::new(store.clone(), store.clone());
        let alice = store.add_user("alice").await;
        let bob = store.add_user("bob").await;

        use_case.send_request(alice.id, "bob").await.unwrap();
        assert_eq!(
            use_case.send_request(bob.id, "alice").await.unwrap(),
            FriendshipStatus::Accepted
        );
        let rows = store.get_friendships_between(alice.id, bob.id).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, FriendshipStatus::Accepted);
    }

    #[tokio::test]
    async fn test_request_errors() {
        let store = Arc::new(InMemoryStore::new());
        let use_case = FriendRequestUseCaseImpl::new(store.clone(), store.clone());
        let alice = store.add_user("alice").await;
        let bob = store.add_user("bob").await;

        assert!(matches!(
            use_case.send_request(alice.id, "alice").await,
            Err(FriendshipError::SelfTarget)
        ));
        assert!(matches!(
            use_case.send_request(alice.id, "carol").await,
            Err(FriendshipError::UserNotFound)
        ));

        store
            .create_friendship(&Friendship::new(
                bob.id,
                alice.id,
                FriendshipStatus::Blocked,
                Utc::now(),
            ))
            .await
            .unwrap();
        assert!(matches!(
            use_case.send_request(alice.id, "bob").await,
            Err(FriendshipError::Blocked)
        ));
    }
}
