use chrono::{DateTime, Duration, Utc};

use crate::domain::{OtpId, RepoCreateError, RepoError, RepoRetrieveError, RepoUpdateError, UserId};

pub const OTP_TTL_MINUTES: i64 = 15;
pub const OTP_RESEND_COOLDOWN_SECONDS: i64 = 60;
/// Checks allowed against one code, the successful one included.
pub const OTP_MAX_ATTEMPTS: i32 = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OtpPurpose {
    EmailVerification,
    PasswordReset,
}

impl OtpPurpose {
    pub fn as_str(&self) -> &'static str {
        match self {
            OtpPurpose::EmailVerification => "EMAIL_VERIFICATION",
            OtpPurpose::PasswordReset => "PASSWORD_RESET",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "EMAIL_VERIFICATION" => Some(OtpPurpose::EmailVerification),
            "PASSWORD_RESET" => Some(OtpPurpose::PasswordReset),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct EmailOtp {
    pub id: OtpId,
    pub user_id: UserId,
    pub code_hash: String,
    pub purpose: OtpPurpose,
    pub expires_at: DateTime<Utc>,
    pub consumed_at: Option<DateTime<Utc>>,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}

impl EmailOtp {
    pub fn new(user_id: UserId, code_hash: String, purpose: OtpPurpose, now: DateTime<Utc>) -> Self {
        EmailOtp {
            id: OtpId::new(),
            user_id,
            code_hash,
            purpose,
            expires_at: now + Duration::minutes(OTP_TTL_MINUTES),
            consumed_at: None,
            attempts: 0,
            created_at: now,
        }
    }

    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.consumed_at.is_none() && self.attempts < OTP_MAX_ATTEMPTS && self.expires_at > now
    }

    pub fn blocks_resend(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at < Duration::seconds(OTP_RESEND_COOLDOWN_SECONDS)
    }
}

#[async_trait::async_trait]
pub trait OtpRepository {
    async fn create_otp(&self, otp: &EmailOtp) -> Result<(), RepoCreateError>;
    /// Most recently issued code for the user and purpose, consumed or not.
    async fn get_latest_otp(
        &self,
        user_id: UserId,
        purpose: OtpPurpose,
    ) -> Result<EmailOtp, RepoRetrieveError>;
    /// Counts one check against the code before it is compared. Fails with
    /// `Conflict` when the code is consumed or out of attempts.
    async fn register_otp_attempt(&self, otp_id: OtpId) -> Result<(), RepoUpdateError>;
    /// Fails with `Conflict` when the code was already consumed.
    async fn consume_otp(&self, otp_id: OtpId, at: DateTime<Utc>) -> Result<(), RepoUpdateError>;
    async fn delete_expired_otps(&self, now: DateTime<Utc>) -> Result<u64, RepoError>;
}
