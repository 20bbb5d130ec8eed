use bingo_persistence_sea_orm_entities::friendship;
use bingo_server_app::domain::{
    FriendshipId, RepoCreateError, RepoError, RepoUpdateError, UserId,
    friendship::{Friendship, FriendshipRepository, FriendshipStatus},
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::{create_error, update_error};

pub struct FriendshipRepositoryImpl {
    db: DatabaseConnection,
}

impl FriendshipRepositoryImpl {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_friendship(model: friendship::Model) -> Result<Friendship, RepoError> {
        let status = FriendshipStatus::parse(&model.status).ok_or_else(|| {
            RepoError::StorageError(format!("unknown friendship status {}", model.status))
        })?;
        Ok(Friendship {
            id: FriendshipId(model.id),
            requester_id: UserId(model.requester_id),
            addressee_id: UserId(model.addressee_id),
            status,
            created_at: model.created_at,
        })
    }

    async fn fetch(&self, condition: Condition) -> Result<Vec<Friendship>, RepoError> {
        friendship::Entity::find()
            .filter(condition)
            .order_by_asc(friendship::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(|e| RepoError::StorageError(e.to_string()))?
            .into_iter()
            .map(Self::model_to_friendship)
            .collect()
    }
}

#[async_trait::async_trait]
impl FriendshipRepository for FriendshipRepositoryImpl {
    async fn get_friendships_between(
        &self,
        user_a: UserId,
        user_b: UserId,
    ) -> Result<Vec<Friendship>, RepoError> {
        self.fetch(
            Condition::any()
                .add(
                    Condition::all()
                        .add(friendship::Column::RequesterId.eq(user_a.0))
                        .add(friendship::Column::AddresseeId.eq(user_b.0)),
                )
                .add(
                    Condition::all()
                        .add(friendship::Column::RequesterId.eq(user_b.0))
                        .add(friendship::Column::AddresseeId.eq(user_a.0)),
                ),
        )
        .await
    }

    async fn create_friendship(&self, f: &Friendship) -> Result<(), RepoCreateError> {
        friendship::ActiveModel {
            id: Set(f.id.0),
            requester_id: Set(f.requester_id.0),
            addressee_id: Set(f.addressee_id.0),
            status: Set(f.status.as_str().to_string()),
            created_at: Set(f.created_at),
        }
        .insert(&self.db)
        .await
        .map_err(create_error)?;
        Ok(())
    }

    async fn set_friendship_status(
        &self,
        friendship_id: FriendshipId,
        status: FriendshipStatus,
    ) -> Result<(), RepoUpdateError> {
        let result = friendship::Entity::update_many()
            .set(friendship::ActiveModel {
                status: Set(status.as_str().to_string()),
                ..Default::default()
            })
            .filter(friendship::Column::Id.eq(friendship_id.0))
            .exec(&self.db)
            .await
            .map_err(update_error)?;
        if result.rows_affected == 0 {
            return Err(RepoUpdateError::NotFound);
        }
        Ok(())
    }

    async fn delete_friendship(&self, friendship_id: FriendshipId) -> Result<(), RepoUpdateError> {
        let result = friendship::Entity::delete_by_id(friendship_id.0)
            .exec(&self.db)
            .await
            .map_err(update_error)?;
        if result.rows_affected == 0 {
            return Err(RepoUpdateError::NotFound);
        }
        Ok(())
    }

    async fn list_friendships(
        &self,
        user_id: UserId,
        status: Option<FriendshipStatus>,
    ) -> Result<Vec<Friendship>, RepoError> {
        let mut condition = Condition::all().add(
            Condition::any()
                .add(friendship::Column::RequesterId.eq(user_id.0))
                .add(friendship::Column::AddresseeId.eq(user_id.0)),
        );
        if let Some(status) = status {
            condition = condition.add(friendship::Column::Status.eq(status.as_str()));
        }
        self.fetch(condition).await
    }
}
