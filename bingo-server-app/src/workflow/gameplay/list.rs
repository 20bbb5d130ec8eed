use std::sync::Arc;

use crate::domain::{
    PaginatedResponse, Pagination, SortOrder, UserId,
    r#match::{Match, MatchQuery, MatchRepository, MatchStatus},
};

#[derive(Debug, thiserror::Error)]
pub enum ListMatchesError {
    #[error("internal error: {0}")]
    Internal(String),
}

#[async_trait::async_trait]
pub trait ListMatchesUseCase {
    /// Matches the actor plays in, ordered by creation time.
    async fn list_matches(
        &self,
        actor: UserId,
        status: Option<MatchStatus>,
        pagination: Pagination,
        order: SortOrder,
    ) -> Result<PaginatedResponse<Match>, ListMatchesError>;
}

pub struct ListMatchesUseCaseImpl<M: MatchRepository> {
    match_repository: Arc<M>,
}

impl<M: MatchRepository> ListMatchesUseCaseImpl<M> {
    pub fn new(match_repository: Arc<M>) -> Self {
        Self { match_repository }
    }
}

#[async_trait::async_trait]
impl<M: MatchRepository + Send + Sync + 'static> ListMatchesUseCase for ListMatchesUseCaseImpl<M> {
    async fn list_matches(
        &self,
        actor: UserId,
        status: Option<MatchStatus>,
        pagination: Pagination,
        order: SortOrder,
    ) -> Result<PaginatedResponse<Match>, ListMatchesError> {
        let query = MatchQuery {
            user_id: actor,
            statuses: status.map(|s| vec![s]),
            pagination,
            order,
        };
        self.match_repository
            .query_matches(query)
            .await
            .map_err(|e| ListMatchesError::Internal(e.to_string()))
    }
}
