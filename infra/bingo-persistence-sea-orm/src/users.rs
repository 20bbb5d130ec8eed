use bingo_persistence_sea_orm_entities::user;
use bingo_server_app::domain::{
    RepoCreateError, RepoRetrieveError, RepoUpdateError, UserId,
    user::{NewUser, ProfileUpdate, User, UserRepository},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};

use crate::{UserCache, create_error, update_error};

pub struct UserRepositoryImpl {
    db: DatabaseConnection,
    users_cache: UserCache,
}

impl UserRepositoryImpl {
    pub fn new(db: DatabaseConnection, users_cache: UserCache) -> Self {
        Self { db, users_cache }
    }

    fn model_to_user(model: user::Model) -> User {
        User {
            id: UserId(model.id),
            email: model.email,
            password_hash: model.password_hash,
            name: model.name,
            display_name: model.display_name,
            image: model.image,
            avatar_url: model.avatar_url,
            email_verified: model.email_verified,
            created_at: model.created_at,
            updated_at: model.updated_at,
            last_online_at: model.last_online_at,
        }
    }

    async fn find_one(
        &self,
        column: user::Column,
        value: &str,
    ) -> Result<User, RepoRetrieveError> {
        let model = user::Entity::find()
            .filter(column.eq(value))
            .one(&self.db)
            .await
            .map_err(|e| RepoRetrieveError::StorageError(e.to_string()))?
            .ok_or(RepoRetrieveError::NotFound)?;
        let user = Self::model_to_user(model);
        self.users_cache.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update_one(
        &self,
        user_id: UserId,
        changes: user::ActiveModel,
    ) -> Result<(), RepoUpdateError> {
        let result = user::Entity::update_many()
            .set(changes)
            .filter(user::Column::Id.eq(user_id.0))
            .exec(&self.db)
            .await
            .map_err(update_error)?;
        self.users_cache.invalidate(&user_id);
        if result.rows_affected == 0 {
            return Err(RepoUpdateError::NotFound);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl UserRepository for UserRepositoryImpl {
    async fn create_user(&self, new_user: NewUser) -> Result<User, RepoCreateError> {
        let now = Utc::now();
        let model = user::ActiveModel {
            id: Set(UserId::new().0),
            email: Set(new_user.email),
            password_hash: Set(new_user.password_hash),
            name: Set(new_user.name),
            display_name: Set(None),
            image: Set(None),
            avatar_url: Set(None),
            email_verified: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            last_online_at: Set(None),
        }
        .insert(&self.db)
        .await
        .map_err(create_error)?;
        Ok(Self::model_to_user(model))
    }

    async fn get_user(&self, user_id: UserId) -> Result<User, RepoRetrieveError> {
        if let Some(cached) = self.users_cache.get(&user_id) {
            return Ok(cached);
        }
        let model = user::Entity::find_by_id(user_id.0)
            .one(&self.db)
            .await
            .map_err(|e| RepoRetrieveError::StorageError(e.to_string()))?
            .ok_or(RepoRetrieveError::NotFound)?;
        let user = Self::model_to_user(model);
        self.users_cache.insert(user_id, user.clone());
        Ok(user)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, RepoRetrieveError> {
        self.find_one(user::Column::Email, email).await
    }

    async fn get_user_by_name(&self, name: &str) -> Result<User, RepoRetrieveError> {
        self.find_one(user::Column::Name, name).await
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, RepoUpdateError> {
        let model = user::Entity::find_by_id(user_id.0)
            .one(&self.db)
            .await
            .map_err(|e| RepoUpdateError::StorageError(e.to_string()))?
            .ok_or(RepoUpdateError::NotFound)?;

        let mut user = Self::model_to_user(model.clone());
        update.apply(&mut user);

        let mut active: user::ActiveModel = model.into();
        active.display_name = Set(user.display_name);
        active.image = Set(user.image);
        active.avatar_url = Set(user.avatar_url);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&self.db).await.map_err(update_error)?;

        self.users_cache.invalidate(&user_id);
        Ok(Self::model_to_user(updated))
    }

    async fn set_email_verified(&self, user_id: UserId) -> Result<(), RepoUpdateError> {
        self.update_one(
            user_id,
            user::ActiveModel {
                email_verified: Set(true),
                updated_at: Set(Utc::now()),
                ..Default::default()
            },
        )
        .await
    }

    async fn set_password_hash(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<(), RepoUpdateError> {
        self.update_one(
            user_id,
            user::ActiveModel {
                password_hash: Set(password_hash.to_string()),
                updated_at: Set(Utc::now()),
                ..Default::default()
            },
        )
        .await
    }

    async fn touch_last_online(
        &self,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<(), RepoUpdateError> {
        self.update_one(
            user_id,
            user::ActiveModel {
                last_online_at: Set(Some(at)),
                ..Default::default()
            },
        )
        .await
    }
}
