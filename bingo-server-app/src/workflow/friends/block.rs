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
pub trait BlockUserUseCase {
    async fn block(&self, actor: UserId, target_name: &str) -> Result<(), FriendshipError>;
}

pub struct BlockUserUseCaseImpl<U: UserRepository, F: FriendshipRepository> {
    user_repository: Arc<U>,
    friendship_repository: Arc<F>,
}

impl<U: UserRepository, F: FriendshipRepository> BlockUserUseCaseImpl<U, F> {
    pub fn new(user_repository: Arc<U>, friendship_repository: Arc<F>) -> Self {
        Self {
            user_repository,
            friendship_repository,
        }
    }
}

#[async_trait::async_trait]
impl<U: UserRepository + Send + Sync + 'static, F: FriendshipRepository + Send + Sync + 'static>
    BlockUserUseCase for BlockUserUseCaseImpl<U, F>
{
    async fn block(&self, actor: UserId, target_name: &str) -> Result<(), FriendshipError> {
        let target = resolve_target(self.user_repository.as_ref(), actor, target_name).await?;
        let relation = load_relation(self.friendship_repository.as_ref(), actor, target.id).await?;

        // a block placed by the target stays in place
        if let Some(incoming) = relation.incoming {
            if incoming.status != FriendshipStatus::Blocked {
                self.friendship_repository
                    .delete_friendship(incoming.id)
                    .await?;
            }
        }

        match relation.outgoing {
            Some(outgoing) if outgoing.status == FriendshipStatus::Blocked => return Ok(()),
            Some(outgoing) => {
                self.friendship_repository
                    .set_friendship_status(outgoing.id, FriendshipStatus::Blocked)
                    .await?;
            }
            None => {
                let block =
                    Friendship::new(actor, target.id, FriendshipStatus::Blocked, Utc::now());
                self.friendship_repository
                    .create_friendship(&block)
                    .await
                    .map_err(|e| match e {
                        RepoCreateError::Conflict => {
                            FriendshipError::Internal("concurrent friendship change".to_string())
                        }
                        RepoCreateError::StorageError(e) => FriendshipError::Internal(e),
                    })?;
            }
        }
        log::info!("User {} blocked {}", actor, target.id);
        Ok(())
    }
}
