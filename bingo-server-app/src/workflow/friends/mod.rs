use chrono::{DateTime, Utc};

use crate::{
    domain::{
        RepoError, RepoRetrieveError, RepoUpdateError, UserId,
        friendship::{FriendshipRepository, FriendshipStatus, Relation},
        user::{User, UserRepository},
    },
    workflow::account::PublicProfile,
};

pub mod block;
pub mod list;
pub mod remove;
pub mod request;

#[derive(Debug, thiserror::Error)]
pub enum FriendshipError {
    #[error("user not found")]
    UserNotFound,
    #[error("cannot target yourself")]
    SelfTarget,
    #[error("user is blocked")]
    Blocked,
    #[error("already friends")]
    AlreadyFriends,
    #[error("friend request already sent")]
    AlreadyRequested,
    #[error("no pending friend request from this user")]
    NoPendingRequest,
    #[error("no friendship with this user")]
    NotFound,
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RepoError> for FriendshipError {
    fn from(e: RepoError) -> Self {
        FriendshipError::Internal(e.to_string())
    }
}

impl From<RepoUpdateError> for FriendshipError {
    fn from(e: RepoUpdateError) -> Self {
        match e {
            RepoUpdateError::NotFound | RepoUpdateError::Conflict => FriendshipError::NotFound,
            RepoUpdateError::StorageError(e) => FriendshipError::Internal(e),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FriendDirection {
    Outgoing,
    Incoming,
}

#[derive(Clone, Debug)]
pub struct FriendView {
    pub user: PublicProfile,
    pub status: FriendshipStatus,
    pub direction: FriendDirection,
    pub since: DateTime<Utc>,
}

async fn resolve_target<U: UserRepository + Sync>(
    user_repository: &U,
    actor: UserId,
    name: &str,
) -> Result<User, FriendshipError> {
    let target = match user_repository.get_user_by_name(name).await {
        Ok(user) => user,
        Err(RepoRetrieveError::NotFound) => return Err(FriendshipError::UserNotFound),
        Err(RepoRetrieveError::StorageError(e)) => return Err(FriendshipError::Internal(e)),
    };
    if target.id == actor {
        return Err(FriendshipError::SelfTarget);
    }
    Ok(target)
}

async fn load_relation<F: FriendshipRepository + Sync>(
    friendship_repository: &F,
    actor: UserId,
    target: UserId,
) -> Result<Relation, FriendshipError> {
    let rows = friendship_repository
        .get_friendships_between(actor, target)
        .await?;
    Ok(Relation::from_rows(actor, rows))
}
