use chrono::{DateTime, Utc};

use crate::domain::{FriendshipId, RepoCreateError, RepoError, RepoUpdateError, UserId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FriendshipStatus {
    Pending,
    Accepted,
    Blocked,
}

impl FriendshipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FriendshipStatus::Pending => "PENDING",
            FriendshipStatus::Accepted => "ACCEPTED",
            FriendshipStatus::Blocked => "BLOCKED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PENDING" => Some(FriendshipStatus::Pending),
            "ACCEPTED" => Some(FriendshipStatus::Accepted),
            "BLOCKED" => Some(FriendshipStatus::Blocked),
            _ => None,
        }
    }
}

/// A directed relation from `requester_id` to `addressee_id`.
#[derive(Clone, Debug)]
pub struct Friendship {
    pub id: FriendshipId,
    pub requester_id: UserId,
    pub addressee_id: UserId,
    pub status: FriendshipStatus,
    pub created_at: DateTime<Utc>,
}

impl Friendship {
    pub fn new(
        requester_id: UserId,
        addressee_id: UserId,
        status: FriendshipStatus,
        now: DateTime<Utc>,
    ) -> Self {
        Friendship {
            id: FriendshipId::new(),
            requester_id,
            addressee_id,
            status,
            created_at: now,
        }
    }

    pub fn other_party(&self, user_id: UserId) -> UserId {
        if self.requester_id == user_id {
            self.addressee_id
        } else {
            self.requester_id
        }
    }
}

/// Both directed rows that may exist between two users, seen from `actor`.
#[derive(Clone, Debug, Default)]
pub struct Relation {
    pub outgoing: Option<Friendship>,
    pub incoming: Option<Friendship>,
}

impl Relation {
    pub fn from_rows(actor: UserId, rows: Vec<Friendship>) -> Self {
        let mut relation = Relation::default();
        for row in rows {
            if row.requester_id == actor {
                relation.outgoing = Some(row);
            } else {
                relation.incoming = Some(row);
            }
        }
        relation
    }

    fn status_of(row: &Option<Friendship>) -> Option<FriendshipStatus> {
        row.as_ref().map(|f| f.status)
    }

    pub fn blocked_by_actor(&self) -> bool {
        Self::status_of(&self.outgoing) == Some(FriendshipStatus::Blocked)
    }

    pub fn blocked_by_other(&self) -> bool {
        Self::status_of(&self.incoming) == Some(FriendshipStatus::Blocked)
    }

    pub fn is_blocked(&self) -> bool {
        self.blocked_by_actor() || self.blocked_by_other()
    }

    pub fn are_friends(&self) -> bool {
        Self::status_of(&self.outgoing) == Some(FriendshipStatus::Accepted)
            || Self::status_of(&self.incoming) == Some(FriendshipStatus::Accepted)
    }
}

#[async_trait::async_trait]
pub trait FriendshipRepository {
    /// Rows in either direction between the two users.
    async fn get_friendships_between(
        &self,
        user_a: UserId,
        user_b: UserId,
    ) -> Result<Vec<Friendship>, RepoError>;
    async fn create_friendship(&self, friendship: &Friendship) -> Result<(), RepoCreateError>;
    async fn set_friendship_status(
        &self,
        friendship_id: FriendshipId,
        status: FriendshipStatus,
    ) -> Result<(), RepoUpdateError>;
    async fn delete_friendship(&self, friendship_id: FriendshipId) -> Result<(), RepoUpdateError>;
    async fn list_friendships(
        &self,
        user_id: UserId,
        status: Option<FriendshipStatus>,
    ) -> Result<Vec<Friendship>, RepoError>;
}
