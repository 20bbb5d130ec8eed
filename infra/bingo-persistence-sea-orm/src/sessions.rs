use bingo_persistence_sea_orm_entities::session;
use bingo_server_app::domain::{
    RepoCreateError, RepoError, RepoRetrieveError, RepoUpdateError, SessionId, UserId,
    session::{Session, SessionRepository},
};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::{create_error, update_error};

pub struct SessionRepositoryImpl {
    db: DatabaseConnection,
}

impl SessionRepositoryImpl {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_session(model: session::Model) -> Session {
        Session {
            id: SessionId(model.id),
            token: model.token,
            user_id: UserId(model.user_id),
            expires_at: model.expires_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
            ip_address: model.ip_address,
            user_agent: model.user_agent,
        }
    }
}

#[async_trait::async_trait]
impl SessionRepository for SessionRepositoryImpl {
    async fn create_session(&self, s: &Session) -> Result<(), RepoCreateError> {
        session::ActiveModel {
            id: Set(s.id.0),
            token: Set(s.token.clone()),
            user_id: Set(s.user_id.0),
            expires_at: Set(s.expires_at),
            created_at: Set(s.created_at),
            updated_at: Set(s.updated_at),
            ip_address: Set(s.ip_address.clone()),
            user_agent: Set(s.user_agent.clone()),
        }
        .insert(&self.db)
        .await
        .map_err(create_error)?;
        Ok(())
    }

    async fn get_session_by_token(&self, token: &str) -> Result<Session, RepoRetrieveError> {
        session::Entity::find()
            .filter(session::Column::Token.eq(token))
            .one(&self.db)
            .await
            .map_err(|e| RepoRetrieveError::StorageError(e.to_string()))?
            .map(Self::model_to_session)
            .ok_or(RepoRetrieveError::NotFound)
    }

    async fn refresh_session(
        &self,
        session_id: SessionId,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), RepoUpdateError> {
        let result = session::Entity::update_many()
            .set(session::ActiveModel {
                expires_at: Set(expires_at),
                updated_at: Set(now),
                ..Default::default()
            })
            .filter(session::Column::Id.eq(session_id.0))
            .exec(&self.db)
            .await
            .map_err(update_error)?;
        if result.rows_affected == 0 {
            return Err(RepoUpdateError::NotFound);
        }
        Ok(())
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<(), RepoError> {
        session::Entity::delete_many()
            .filter(session::Column::Token.eq(token))
            .exec(&self.db)
            .await
            .map_err(|e| RepoError::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn delete_user_sessions(&self, user_id: UserId) -> Result<u64, RepoError> {
        let result = session::Entity::delete_many()
            .filter(session::Column::UserId.eq(user_id.0))
            .exec(&self.db)
            .await
            .map_err(|e| RepoError::StorageError(e.to_string()))?;
        Ok(result.rows_affected)
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let result = session::Entity::delete_many()
            .filter(session::Column::ExpiresAt.lte(now))
            .exec(&self.db)
            .await
            .map_err(|e| RepoError::StorageError(e.to_string()))?;
        Ok(result.rows_affected)
    }
}

#[cfg(test)]
mod tests {
    use bingo_server_app::domain::session::ClientInfo;
    use chrono::Duration;

    use crate::test_support::{add_user, memory_db};

    use super::*;

    #[tokio::test]
    async fn test_session_lifecycle() {
        let db = memory_db().await;
        let alice = add_user(&db, "alice").await;
        let repo = SessionRepositoryImpl::new(db);
        let now = Utc::now();

        let session = Session::new(alice.id, "a".repeat(48), ClientInfo::default(), now);
        repo.create_session(&session).await.unwrap();
        assert!(matches!(
            repo.create_session(&session).await,
            Err(RepoCreateError::Conflict)
        ));

        let later = now + Duration::days(60);
        repo.refresh_session(session.id, later, now).await.unwrap();
        let stored = repo.get_session_by_token(&session.token).await.unwrap();
        assert_eq!(stored.user_id, alice.id);
        assert_eq!(stored.expires_at.timestamp(), later.timestamp());

        assert_eq!(repo.delete_expired_sessions(now).await.unwrap(), 0);
        assert_eq!(
            repo.delete_expired_sessions(later + Duration::seconds(1))
                .await
                .unwrap(),
            1
        );
        assert!(matches!(
            repo.get_session_by_token(&session.token).await,
            Err(RepoRetrieveError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_delete_user_sessions() {
        let db = memory_db().await;
        let alice = add_user(&db, "alice").await;
        let repo = SessionRepositoryImpl::new(db);
        let now = Utc::now();
        for token in ["a", "b"] {
            repo.create_session(&Session::new(
                alice.id,
                token.repeat(48),
                ClientInfo::default(),
                now,
            ))
            .await
            .unwrap();
        }
        assert_eq!(repo.delete_user_sessions(alice.id).await.unwrap(), 2);
    }
}
