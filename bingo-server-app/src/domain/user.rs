use chrono::{DateTime, Utc};
use rustrict::CensorStr;

use crate::domain::{RepoCreateError, RepoRetrieveError, RepoUpdateError, UserId};

#[derive(Clone, Debug)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub display_name: Option<String>,
    pub image: Option<String>,
    pub avatar_url: Option<String>,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_online_at: Option<DateTime<Utc>>,
}

pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password_hash: String,
}

/// Outer `None` leaves a field untouched, `Some(None)` clears it.
#[derive(Clone, Debug, Default)]
pub struct ProfileUpdate {
    pub display_name: Option<Option<String>>,
    pub image: Option<Option<String>>,
    pub avatar_url: Option<Option<String>>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.display_name.is_none() && self.image.is_none() && self.avatar_url.is_none()
    }

    pub fn apply(&self, user: &mut User) {
        if let Some(display_name) = &self.display_name {
            user.display_name = display_name.clone();
        }
        if let Some(image) = &self.image {
            user.image = image.clone();
        }
        if let Some(avatar_url) = &self.avatar_url {
            user.avatar_url = avatar_url.clone();
        }
    }
}

#[async_trait::async_trait]
pub trait UserRepository {
    async fn create_user(&self, new_user: NewUser) -> Result<User, RepoCreateError>;
    async fn get_user(&self, user_id: UserId) -> Result<User, RepoRetrieveError>;
    async fn get_user_by_email(&self, email: &str) -> Result<User, RepoRetrieveError>;
    async fn get_user_by_name(&self, name: &str) -> Result<User, RepoRetrieveError>;
    async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, RepoUpdateError>;
    async fn set_email_verified(&self, user_id: UserId) -> Result<(), RepoUpdateError>;
    async fn set_password_hash(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<(), RepoUpdateError>;
    async fn touch_last_online(
        &self,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<(), RepoUpdateError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InvalidUsernameReason {
    TooShort,
    TooLong,
    InvalidCharacter,
    Inappropriate,
}

impl std::fmt::Display for InvalidUsernameReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvalidUsernameReason::TooShort => write!(f, "name must be at least 3 characters"),
            InvalidUsernameReason::TooLong => write!(f, "name must be at most 16 characters"),
            InvalidUsernameReason::InvalidCharacter => {
                write!(f, "name may only contain letters, digits and underscores")
            }
            InvalidUsernameReason::Inappropriate => write!(f, "name is inappropriate"),
        }
    }
}

pub trait UsernamePolicy {
    fn validate(&self, name: &str) -> Result<(), InvalidUsernameReason>;
}

pub struct DefaultUsernamePolicy;

impl DefaultUsernamePolicy {
    pub const MIN_LENGTH: usize = 3;
    pub const MAX_LENGTH: usize = 16;
}

impl UsernamePolicy for DefaultUsernamePolicy {
    fn validate(&self, name: &str) -> Result<(), InvalidUsernameReason> {
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(InvalidUsernameReason::InvalidCharacter);
        }
        if name.len() < Self::MIN_LENGTH {
            return Err(InvalidUsernameReason::TooShort);
        }
        if name.len() > Self::MAX_LENGTH {
            return Err(InvalidUsernameReason::TooLong);
        }
        if name.is_inappropriate() {
            return Err(InvalidUsernameReason::Inappropriate);
        }
        Ok(())
    }
}
