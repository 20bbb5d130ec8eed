use bingo_persistence_sea_orm_entities::email_otp;
use bingo_server_app::domain::{
    OtpId, RepoCreateError, RepoError, RepoRetrieveError, RepoUpdateError, UserId,
    otp::{EmailOtp, OTP_MAX_ATTEMPTS, OtpPurpose, OtpRepository},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ExprTrait, QueryFilter,
    QueryOrder, Set, sea_query::Expr,
};

use crate::{create_error, update_error};

pub struct OtpRepositoryImpl {
    db: DatabaseConnection,
}

impl OtpRepositoryImpl {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn missed_update(&self, otp_id: OtpId) -> Result<(), RepoUpdateError> {
        let exists = email_otp::Entity::find_by_id(otp_id.0)
            .one(&self.db)
            .await
            .map_err(|e| RepoUpdateError::StorageError(e.to_string()))?
            .is_some();
        if exists {
            Err(RepoUpdateError::Conflict)
        } else {
            Err(RepoUpdateError::NotFound)
        }
    }

    fn model_to_otp(model: email_otp::Model) -> Result<EmailOtp, String> {
        let purpose = OtpPurpose::parse(&model.purpose)
            .ok_or_else(|| format!("unknown otp purpose {}", model.purpose))?;
        Ok(EmailOtp {
            id: OtpId(model.id),
            user_id: UserId(model.user_id),
            code_hash: model.code_hash,
            purpose,
            expires_at: model.expires_at,
            consumed_at: model.consumed_at,
            attempts: model.attempts,
            created_at: model.created_at,
        })
    }
}

#[async_trait::async_trait]
impl OtpRepository for OtpRepositoryImpl {
    async fn create_otp(&self, otp: &EmailOtp) -> Result<(), RepoCreateError> {
        email_otp::ActiveModel {
            id: Set(otp.id.0),
            user_id: Set(otp.user_id.0),
            code_hash: Set(otp.code_hash.clone()),
            purpose: Set(otp.purpose.as_str().to_string()),
            expires_at: Set(otp.expires_at),
            consumed_at: Set(otp.consumed_at),
            attempts: Set(otp.attempts),
            created_at: Set(otp.created_at),
        }
        .insert(&self.db)
        .await
        .map_err(create_error)?;
        Ok(())
    }

    async fn get_latest_otp(
        &self,
        user_id: UserId,
        purpose: OtpPurpose,
    ) -> Result<EmailOtp, RepoRetrieveError> {
        let model = email_otp::Entity::find()
            .filter(email_otp::Column::UserId.eq(user_id.0))
            .filter(email_otp::Column::Purpose.eq(purpose.as_str()))
            .order_by_desc(email_otp::Column::CreatedAt)
            .one(&self.db)
            .await
            .map_err(|e| RepoRetrieveError::StorageError(e.to_string()))?
            .ok_or(RepoRetrieveError::NotFound)?;
        Self::model_to_otp(model).map_err(RepoRetrieveError::StorageError)
    }

    async fn register_otp_attempt(&self, otp_id: OtpId) -> Result<(), RepoUpdateError> {
        let result = email_otp::Entity::update_many()
            .col_expr(
                email_otp::Column::Attempts,
                Expr::col(email_otp::Column::Attempts).add(1),
            )
            .filter(email_otp::Column::Id.eq(otp_id.0))
            .filter(email_otp::Column::ConsumedAt.is_null())
            .filter(email_otp::Column::Attempts.lt(OTP_MAX_ATTEMPTS))
            .exec(&self.db)
            .await
            .map_err(update_error)?;
        if result.rows_affected > 0 {
            return Ok(());
        }
        self.missed_update(otp_id).await
    }

    async fn consume_otp(&self, otp_id: OtpId, at: DateTime<Utc>) -> Result<(), RepoUpdateError> {
        let result = email_otp::Entity::update_many()
            .set(email_otp::ActiveModel {
                consumed_at: Set(Some(at)),
                ..Default::default()
            })
            .filter(email_otp::Column::Id.eq(otp_id.0))
            .filter(email_otp::Column::ConsumedAt.is_null())
            .exec(&self.db)
            .await
            .map_err(update_error)?;
        if result.rows_affected > 0 {
            return Ok(());
        }
        self.missed_update(otp_id).await
    }

    async fn delete_expired_otps(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let result = email_otp::Entity::delete_many()
            .filter(email_otp::Column::ExpiresAt.lte(now))
            .exec(&self.db)
            .await
            .map_err(|e| RepoError::StorageError(e.to_string()))?;
        Ok(result.rows_affected)
    }
}
