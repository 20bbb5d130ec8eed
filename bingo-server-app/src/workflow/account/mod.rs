use chrono::{DateTime, Utc};
use validator::Validate;

use crate::domain::{UserId, user::User};

pub mod authenticate;
pub mod login;
pub mod logout;
pub mod otp;
pub mod password_reset;
pub mod profile;
pub mod register;
pub mod verify_email;

/// What other players may see about an account.
#[derive(Clone, Debug)]
pub struct PublicProfile {
    pub id: UserId,
    pub name: String,
    pub display_name: Option<String>,
    pub image: Option<String>,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_online_at: Option<DateTime<Utc>>,
}

impl From<User> for PublicProfile {
    fn from(user: User) -> Self {
        PublicProfile {
            id: user.id,
            name: user.name,
            display_name: user.display_name,
            image: user.image,
            avatar_url: user.avatar_url,
            created_at: user.created_at,
            last_online_at: user.last_online_at,
        }
    }
}

#[derive(Validate)]
struct EmailValidator {
    #[validate(email)]
    email: String,
}

/// Trimmed and lower-cased, or `None` when not an email address.
pub fn normalize_email(email: &str) -> Option<String> {
    let validator = EmailValidator {
        email: email.trim().to_lowercase(),
    };
    if validator.validate().is_err() {
        return None;
    }
    Some(validator.email)
}
