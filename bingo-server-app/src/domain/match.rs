use bingo_core::BingoPlayer;
use chrono::{DateTime, Utc};

use crate::domain::{
    BoardId, MatchId, MoveId, PaginatedResponse, Pagination, RepoCreateError, RepoError,
    RepoRetrieveError, RepoUpdateError, SortOrder, UserId, stats::MatchOutcome,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MatchStatus {
    Invited,
    BoardSetup,
    InProgress,
    Finished,
    Cancelled,
}

impl MatchStatus {
    pub const ACTIVE: [MatchStatus; 3] = [
        MatchStatus::Invited,
        MatchStatus::BoardSetup,
        MatchStatus::InProgress,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Invited => "INVITED",
            MatchStatus::BoardSetup => "BOARD_SETUP",
            MatchStatus::InProgress => "IN_PROGRESS",
            MatchStatus::Finished => "FINISHED",
            MatchStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "INVITED" => Some(MatchStatus::Invited),
            "BOARD_SETUP" => Some(MatchStatus::BoardSetup),
            "IN_PROGRESS" => Some(MatchStatus::InProgress),
            "FINISHED" => Some(MatchStatus::Finished),
            "CANCELLED" => Some(MatchStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchStatus::Finished | MatchStatus::Cancelled)
    }

    pub fn can_transition_to(&self, next: MatchStatus) -> bool {
        match (self, next) {
            (MatchStatus::Invited, MatchStatus::BoardSetup)
            | (MatchStatus::BoardSetup, MatchStatus::InProgress)
            | (MatchStatus::InProgress, MatchStatus::Finished) => true,
            (current, MatchStatus::Cancelled) => !current.is_terminal(),
            _ => false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Match {
    pub id: MatchId,
    pub player1_id: UserId,
    pub player2_id: UserId,
    pub status: MatchStatus,
    pub current_turn_user_id: Option<UserId>,
    pub winner_user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl Match {
    pub fn is_participant(&self, user_id: UserId) -> bool {
        self.player1_id == user_id || self.player2_id == user_id
    }

    /// Setup-phase matches go stale from their creation, in-progress ones
    /// from their last call or their start.
    pub fn is_stale(
        &self,
        last_move_at: Option<DateTime<Utc>>,
        setup_cutoff: DateTime<Utc>,
        play_cutoff: DateTime<Utc>,
    ) -> bool {
        match self.status {
            MatchStatus::Invited | MatchStatus::BoardSetup => self.created_at < setup_cutoff,
            MatchStatus::InProgress => {
                last_move_at
                    .or(self.started_at)
                    .unwrap_or(self.created_at)
                    < play_cutoff
            }
            MatchStatus::Finished | MatchStatus::Cancelled => false,
        }
    }

    pub fn opponent_of(&self, user_id: UserId) -> Option<UserId> {
        if self.player1_id == user_id {
            Some(self.player2_id)
        } else if self.player2_id == user_id {
            Some(self.player1_id)
        } else {
            None
        }
    }

    /// Player 1 plays as `First` in the engine.
    pub fn player_of(&self, user_id: UserId) -> Option<BingoPlayer> {
        if self.player1_id == user_id {
            Some(BingoPlayer::First)
        } else if self.player2_id == user_id {
            Some(BingoPlayer::Second)
        } else {
            None
        }
    }

    pub fn user_of(&self, player: BingoPlayer) -> UserId {
        match player {
            BingoPlayer::First => self.player1_id,
            BingoPlayer::Second => self.player2_id,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NewMatch {
    pub player1_id: UserId,
    pub player2_id: UserId,
}

/// Applied only while the stored status equals the expected one.
#[derive(Clone, Debug)]
pub struct MatchUpdate {
    pub status: MatchStatus,
    pub current_turn_user_id: Option<UserId>,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
}

#[derive(Clone, Debug)]
pub struct MatchQuery {
    pub user_id: UserId,
    pub statuses: Option<Vec<MatchStatus>>,
    pub pagination: Pagination,
    pub order: SortOrder,
}

#[derive(Clone, Debug)]
pub struct Board {
    pub id: BoardId,
    pub match_id: MatchId,
    pub user_id: UserId,
    pub numbers: Vec<u32>,
    pub created_at: DateTime<Utc>,
}

impl Board {
    pub fn new(match_id: MatchId, user_id: UserId, numbers: Vec<u32>, now: DateTime<Utc>) -> Self {
        Board {
            id: BoardId::new(),
            match_id,
            user_id,
            numbers,
            created_at: now,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Move {
    pub id: MoveId,
    pub match_id: MatchId,
    pub move_number: u32,
    pub chosen_by_user_id: UserId,
    pub number: u32,
    pub created_at: DateTime<Utc>,
}

impl Move {
    pub fn new(
        match_id: MatchId,
        move_number: u32,
        chosen_by_user_id: UserId,
        number: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Move {
            id: MoveId::new(),
            match_id,
            move_number,
            chosen_by_user_id,
            number,
            created_at: now,
        }
    }
}

#[derive(Clone, Debug)]
pub struct MatchFinish {
    /// `None` records a draw.
    pub winner_user_id: Option<UserId>,
    pub ended_at: DateTime<Utc>,
    pub final_move: Option<Move>,
}

impl MatchFinish {
    pub fn outcome_for(&self, user_id: UserId) -> MatchOutcome {
        match self.winner_user_id {
            None => MatchOutcome::Draw,
            Some(winner) if winner == user_id => MatchOutcome::Win,
            Some(_) => MatchOutcome::Loss,
        }
    }
}

#[async_trait::async_trait]
pub trait MatchRepository {
    /// `Conflict` when the two players already share a non-terminal match.
    async fn create_match(&self, new_match: NewMatch) -> Result<Match, RepoCreateError>;
    async fn get_match(&self, match_id: MatchId) -> Result<Match, RepoRetrieveError>;
    async fn query_matches(&self, query: MatchQuery)
    -> Result<PaginatedResponse<Match>, RepoError>;
    /// Any non-terminal match between the two users, in either seating.
    async fn get_active_match_between(
        &self,
        user_a: UserId,
        user_b: UserId,
    ) -> Result<Option<Match>, RepoError>;
    /// `Conflict` when the stored status is no longer `expected`.
    async fn update_match_status(
        &self,
        match_id: MatchId,
        expected: MatchStatus,
        update: MatchUpdate,
    ) -> Result<Match, RepoUpdateError>;
    async fn save_board(&self, board: &Board) -> Result<(), RepoCreateError>;
    async fn get_boards(&self, match_id: MatchId) -> Result<Vec<Board>, RepoError>;
    /// Ordered by move number.
    async fn get_moves(&self, match_id: MatchId) -> Result<Vec<Move>, RepoError>;
    /// Inserts the move and hands the turn over in one transaction.
    async fn record_move(&self, mv: &Move, next_turn: UserId) -> Result<(), RepoUpdateError>;
    /// Finishes an in-progress match and updates both players' stats in one
    /// transaction.
    async fn finish_match(
        &self,
        match_id: MatchId,
        finish: MatchFinish,
    ) -> Result<Match, RepoUpdateError>;
    /// Setup-phase matches created before `setup_cutoff`, and in-progress
    /// matches whose last activity is older than `play_cutoff`.
    async fn list_stale_matches(
        &self,
        setup_cutoff: DateTime<Utc>,
        play_cutoff: DateTime<Utc>,
    ) -> Result<Vec<Match>, RepoError>;
}
