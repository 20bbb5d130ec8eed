use std::sync::Arc;

use crate::{
    domain::{
        RepoRetrieveError, UserId,
        friendship::{FriendshipRepository, FriendshipStatus},
        user::UserRepository,
    },
    workflow::{
        account::PublicProfile,
        friends::{FriendDirection, FriendView, FriendshipError},
    },
};

#[async_trait::async_trait]
pub trait ListFriendsUseCase {
    async fn list(
        &self,
        actor: UserId,
        status: Option<FriendshipStatus>,
    ) -> Result<Vec<FriendView>, FriendshipError>;
}

pub struct ListFriendsUseCaseImpl<U: UserRepository, F: FriendshipRepository> {
    user_repository: Arc<U>,
    friendship_repository: Arc<F>,
}

impl<U: UserRepository, F: FriendshipRepository> ListFriendsUseCaseImpl<U, F> {
    pub fn new(user_repository: Arc<U>, friendship_repository: Arc<F>) -> Self {
        Self {
            user_repository,
            friendship_repository,
        }
    }
}

#[async_trait::async_trait]
impl<U: UserRepository + Send + Sync + 'static, F: FriendshipRepository + Send + Sync + 'static>
    ListFriendsUseCase for ListFriendsUseCaseImpl<U, F>
{
    async fn list(
        &self,
        actor: UserId,
        status: Option<FriendshipStatus>,
    ) -> Result<Vec<FriendView>, FriendshipError> {
        let friendships = self
            .friendship_repository
            .list_friendships(actor, status)
            .await?;

        let mut views = Vec::with_capacity(friendships.len());
        for friendship in friendships {
            let direction = if friendship.requester_id == actor {
                FriendDirection::Outgoing
            } else {
                FriendDirection::Incoming
            };
            // blocks placed on the actor are not revealed
            if friendship.status == FriendshipStatus::Blocked
                && direction == FriendDirection::Incoming
            {
                continue;
            }
            let other = friendship.other_party(actor);
            let user = match self.user_repository.get_user(other).await {
                Ok(user) => user,
                Err(RepoRetrieveError::NotFound) => {
                    log::warn!("Friendship {} points to missing user {}", friendship.id, other);
                    continue;
                }
                Err(RepoRetrieveError::StorageError(e)) => {
                    return Err(FriendshipError::Internal(e));
                }
            };
            views.push(FriendView {
                user: PublicProfile::from(user),
                status: friendship.status,
                direction,
                since: friendship.created_at,
            });
        }
        views.sort_by(|a, b| a.user.name.cmp(&b.user.name));
        Ok(views)
    }
}
