use chrono::{DateTime, Duration, Utc};

use crate::domain::{RepoCreateError, RepoError, RepoRetrieveError, RepoUpdateError, SessionId, UserId};

pub const SESSION_TTL_DAYS: i64 = 30;

#[derive(Clone, Debug, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Clone, Debug)]
pub struct Session {
    pub id: SessionId,
    pub token: String,
    pub user_id: UserId,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl Session {
    pub fn ttl() -> Duration {
        Duration::days(SESSION_TTL_DAYS)
    }

    pub fn new(user_id: UserId, token: String, client: ClientInfo, now: DateTime<Utc>) -> Self {
        Session {
            id: SessionId::new(),
            token,
            user_id,
            expires_at: now + Self::ttl(),
            created_at: now,
            updated_at: now,
            ip_address: client.ip_address,
            user_agent: client.user_agent,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Sliding expiry: extend once less than half of the lifetime is left.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - now < Self::ttl() / 2
    }
}

#[async_trait::async_trait]
pub trait SessionRepository {
    async fn create_session(&self, session: &Session) -> Result<(), RepoCreateError>;
    async fn get_session_by_token(&self, token: &str) -> Result<Session, RepoRetrieveError>;
    async fn refresh_session(
        &self,
        session_id: SessionId,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), RepoUpdateError>;
    async fn delete_session_by_token(&self, token: &str) -> Result<(), RepoError>;
    async fn delete_user_sessions(&self, user_id: UserId) -> Result<u64, RepoError>;
    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, RepoError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_expiry_and_refresh() {
        let now = Utc::now();
        let session = Session::new(UserId::new(), "token".to_string(), ClientInfo::default(), now);
        assert!(!session.is_expired(now));
        assert!(!session.needs_refresh(now));
        assert!(!session.needs_refresh(now + Duration::days(14)));
        assert!(session.needs_refresh(now + Duration::days(16)));
        assert!(session.is_expired(now + Duration::days(SESSION_TTL_DAYS)));
    }
}
