use std::sync::Arc;

use crate::{
    domain::{
        UserId,
        friendship::{FriendshipRepository, FriendshipStatus},
        user::UserRepository,
    },
    workflow::friends::{FriendshipError, load_relation, resolve_target},
};

#[async_trait::async_trait]
pub trait RemoveFriendUseCase {
    /// Ends a friendship, withdraws or declines a request, or lifts the
    /// actor's own block.
    async fn remove(&self, actor: UserId, target_name: &str) -> Result<(), FriendshipError>;
}

pub struct RemoveFriendUseCaseImpl<U: UserRepository, F: FriendshipRepository> {
    user_repository: Arc<U>,
    friendship_repository: Arc<F>,
}

impl<U: UserRepository, F: FriendshipRepository> RemoveFriendUseCaseImpl<U, F> {
    pub fn new(user_repository: Arc<U>, friendship_repository: Arc<F>) -> Self {
        Self {
            user_repository,
            friendship_repository,
        }
    }
}

#[async_trait::async_trait]
impl<U: UserRepository + Send + Sync + 'static, F: FriendshipRepository + Send + Sync + 'static>
    RemoveFriendUseCase for RemoveFriendUseCaseImpl<U, F>
{
    async fn remove(&self, actor: UserId, target_name: &str) -> Result<(), FriendshipError> {
        let target = resolve_target(self.user_repository.as_ref(), actor, target_name).await?;
        let relation = load_relation(self.friendship_repository.as_ref(), actor, target.id).await?;

        let mut removed = false;
        if let Some(outgoing) = relation.outgoing {
            self.friendship_repository
                .delete_friendship(outgoing.id)
                .await?;
            removed = true;
        }
        if let Some(incoming) = relation.incoming {
            if incoming.status == FriendshipStatus::Blocked {
                if !removed {
                    return Err(FriendshipError::Blocked);
                }
            } else {
                self.friendship_repository
                    .delete_friendship(incoming.id)
                    .await?;
                removed = true;
            }
        }

        if !removed {
            return Err(FriendshipError::NotFound);
        }
        log::debug!("User {} removed relation with {}", actor, target.id);
        Ok(())
    }
}
