use std::{
    collections::HashMap,
    sync::{
        Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use bingo_core::BingoSettings;
use chrono::{DateTime, Utc};

use crate::{
    domain::{
        FriendshipId, MatchId, OtpId, PaginatedResponse, RepoCreateError, RepoError,
        RepoRetrieveError, RepoUpdateError, SessionId, SortOrder, UserId,
        credentials::BcryptCredentialService,
        friendship::{Friendship, FriendshipRepository, FriendshipStatus},
        r#match::{
            Board, Match, MatchFinish, MatchQuery, MatchRepository, MatchStatus, MatchUpdate, Move,
            NewMatch,
        },
        otp::{EmailOtp, OTP_MAX_ATTEMPTS, OtpPurpose, OtpRepository},
        session::{Session, SessionRepository},
        stats::{StatsRepository, UserStats},
        user::{NewUser, ProfileUpdate, User, UserRepository},
    },
    ports::email::{EmailPort, SendEmailError},
};

/// Every repository trait over plain maps, for workflow tests.
#[derive(Default)]
pub struct InMemoryStore {
    users: Mutex<HashMap<UserId, User>>,
    sessions: Mutex<HashMap<String, Session>>,
    otps: Mutex<Vec<EmailOtp>>,
    friendships: Mutex<Vec<Friendship>>,
    matches: Mutex<HashMap<MatchId, Match>>,
    boards: Mutex<Vec<Board>>,
    moves: Mutex<Vec<Move>>,
    stats: Mutex<HashMap<UserId, UserStats>>,
    fail_next_status_update: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    pub fn otp_count(&self) -> usize {
        self.otps.lock().unwrap().len()
    }

    /// The next `update_match_status` fails with a storage error.
    pub fn fail_next_status_update(&self) {
        self.fail_next_status_update.store(true, Ordering::SeqCst);
    }

    pub async fn add_user(&self, name: &str) -> User {
        self.create_user(NewUser {
            email: format!("{}@example.com", name),
            name: name.to_string(),
            password_hash: String::new(),
        })
        .await
        .unwrap()
    }
}

pub fn test_credentials() -> BcryptCredentialService {
    BcryptCredentialService::new(4)
}

/// 3x3 boards where a single completed line wins.
pub fn small_settings() -> BingoSettings {
    BingoSettings {
        board_size: 3,
        lines_to_win: 1,
    }
}

/// A match already in progress with `player1` to call first.
pub async fn started_match(
    store: &InMemoryStore,
    player1: &User,
    player2: &User,
    boards: (Vec<u32>, Vec<u32>),
) -> Match {
    let created = store
        .create_match(NewMatch {
            player1_id: player1.id,
            player2_id: player2.id,
        })
        .await
        .unwrap();
    let now = Utc::now();
    store
        .update_match_status(
            created.id,
            MatchStatus::Invited,
            MatchUpdate {
                status: MatchStatus::BoardSetup,
                current_turn_user_id: None,
                started_at: None,
                ended_at: None,
            },
        )
        .await
        .unwrap();
    for (user_id, numbers) in [(player1.id, boards.0), (player2.id, boards.1)] {
        store
            .save_board(&Board::new(created.id, user_id, numbers, now))
            .await
            .unwrap();
    }
    store
        .update_match_status(
            created.id,
            MatchStatus::BoardSetup,
            MatchUpdate {
                status: MatchStatus::InProgress,
                current_turn_user_id: Some(player1.id),
                started_at: Some(now),
                ended_at: None,
            },
        )
        .await
        .unwrap()
}

#[async_trait::async_trait]
impl UserRepository for InMemoryStore {
    async fn create_user(&self, new_user: NewUser) -> Result<User, RepoCreateError> {
        let mut users = self.users.lock().unwrap();
        if users
            .values()
            .any(|u| u.email == new_user.email || u.name == new_user.name)
        {
            return Err(RepoCreateError::Conflict);
        }
        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            email: new_user.email,
            password_hash: new_user.password_hash,
            name: new_user.name,
            display_name: None,
            image: None,
            avatar_url: None,
            email_verified: false,
            created_at: now,
            updated_at: now,
            last_online_at: None,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: UserId) -> Result<User, RepoRetrieveError> {
        self.users
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .ok_or(RepoRetrieveError::NotFound)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, RepoRetrieveError> {
        self.users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(RepoRetrieveError::NotFound)
    }

    async fn get_user_by_name(&self, name: &str) -> Result<User, RepoRetrieveError> {
        self.users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.name == name)
            .cloned()
            .ok_or(RepoRetrieveError::NotFound)
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        update: ProfileUpdate,
    ) -> Result<User, RepoUpdateError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&user_id).ok_or(RepoUpdateError::NotFound)?;
        update.apply(user);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn set_email_verified(&self, user_id: UserId) -> Result<(), RepoUpdateError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&user_id).ok_or(RepoUpdateError::NotFound)?;
        user.email_verified = true;
        Ok(())
    }

    async fn set_password_hash(
        &self,
        user_id: UserId,
        password_hash: &str,
    ) -> Result<(), RepoUpdateError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&user_id).ok_or(RepoUpdateError::NotFound)?;
        user.password_hash = password_hash.to_string();
        Ok(())
    }

    async fn touch_last_online(
        &self,
        user_id: UserId,
        at: DateTime<Utc>,
    ) -> Result<(), RepoUpdateError> {
        let mut users = self.users.lock().unwrap();
        let user = users.get_mut(&user_id).ok_or(RepoUpdateError::NotFound)?;
        user.last_online_at = Some(at);
        Ok(())
    }
}

#[async_trait::async_trait]
impl SessionRepository for InMemoryStore {
    async fn create_session(&self, session: &Session) -> Result<(), RepoCreateError> {
        let mut sessions = self.sessions.lock().unwrap();
        if sessions.contains_key(&session.token) {
            return Err(RepoCreateError::Conflict);
        }
        sessions.insert(session.token.clone(), session.clone());
        Ok(())
    }

    async fn get_session_by_token(&self, token: &str) -> Result<Session, RepoRetrieveError> {
        self.sessions
            .lock()
            .unwrap()
            .get(token)
            .cloned()
            .ok_or(RepoRetrieveError::NotFound)
    }

    async fn refresh_session(
        &self,
        session_id: SessionId,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(), RepoUpdateError> {
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .values_mut()
            .find(|s| s.id == session_id)
            .ok_or(RepoUpdateError::NotFound)?;
        session.expires_at = expires_at;
        session.updated_at = now;
        Ok(())
    }

    async fn delete_session_by_token(&self, token: &str) -> Result<(), RepoError> {
        self.sessions.lock().unwrap().remove(token);
        Ok(())
    }

    async fn delete_user_sessions(&self, user_id: UserId) -> Result<u64, RepoError> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| s.user_id != user_id);
        Ok((before - sessions.len()) as u64)
    }

    async fn delete_expired_sessions(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        Ok((before - sessions.len()) as u64)
    }
}

#[async_trait::async_trait]
impl OtpRepository for InMemoryStore {
    async fn create_otp(&self, otp: &EmailOtp) -> Result<(), RepoCreateError> {
        self.otps.lock().unwrap().push(otp.clone());
        Ok(())
    }

    async fn get_latest_otp(
        &self,
        user_id: UserId,
        purpose: OtpPurpose,
    ) -> Result<EmailOtp, RepoRetrieveError> {
        self.otps
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.user_id == user_id && o.purpose == purpose)
            .max_by_key(|o| o.created_at)
            .cloned()
            .ok_or(RepoRetrieveError::NotFound)
    }

    async fn register_otp_attempt(&self, otp_id: OtpId) -> Result<(), RepoUpdateError> {
        let mut otps = self.otps.lock().unwrap();
        let otp = otps
            .iter_mut()
            .find(|o| o.id == otp_id)
            .ok_or(RepoUpdateError::NotFound)?;
        if otp.consumed_at.is_some() || otp.attempts >= OTP_MAX_ATTEMPTS {
            return Err(RepoUpdateError::Conflict);
        }
        otp.attempts += 1;
        Ok(())
    }

    async fn consume_otp(&self, otp_id: OtpId, at: DateTime<Utc>) -> Result<(), RepoUpdateError> {
        let mut otps = self.otps.lock().unwrap();
        let otp = otps
            .iter_mut()
            .find(|o| o.id == otp_id)
            .ok_or(RepoUpdateError::NotFound)?;
        if otp.consumed_at.is_some() {
            return Err(RepoUpdateError::Conflict);
        }
        otp.consumed_at = Some(at);
        Ok(())
    }

    async fn delete_expired_otps(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let mut otps = self.otps.lock().unwrap();
        let before = otps.len();
        otps.retain(|o| o.expires_at > now);
        Ok((before - otps.len()) as u64)
    }
}

#[async_trait::async_trait]
impl FriendshipRepository for InMemoryStore {
    async fn get_friendships_between(
        &self,
        user_a: UserId,
        user_b: UserId,
    ) -> Result<Vec<Friendship>, RepoError> {
        Ok(self
            .friendships
            .lock()
            .unwrap()
            .iter()
            .filter(|f| {
                (f.requester_id == user_a && f.addressee_id == user_b)
                    || (f.requester_id == user_b && f.addressee_id == user_a)
            })
            .cloned()
            .collect())
    }

    async fn create_friendship(&self, friendship: &Friendship) -> Result<(), RepoCreateError> {
        let mut friendships = self.friendships.lock().unwrap();
        if friendships.iter().any(|f| {
            f.requester_id == friendship.requester_id && f.addressee_id == friendship.addressee_id
        }) {
            return Err(RepoCreateError::Conflict);
        }
        friendships.push(friendship.clone());
        Ok(())
    }

    async fn set_friendship_status(
        &self,
        friendship_id: FriendshipId,
        status: FriendshipStatus,
    ) -> Result<(), RepoUpdateError> {
        let mut friendships = self.friendships.lock().unwrap();
        let friendship = friendships
            .iter_mut()
            .find(|f| f.id == friendship_id)
            .ok_or(RepoUpdateError::NotFound)?;
        friendship.status = status;
        Ok(())
    }

    async fn delete_friendship(&self, friendship_id: FriendshipId) -> Result<(), RepoUpdateError> {
        let mut friendships = self.friendships.lock().unwrap();
        let before = friendships.len();
        friendships.retain(|f| f.id != friendship_id);
        if friendships.len() == before {
            return Err(RepoUpdateError::NotFound);
        }
        Ok(())
    }

    async fn list_friendships(
        &self,
        user_id: UserId,
        status: Option<FriendshipStatus>,
    ) -> Result<Vec<Friendship>, RepoError> {
        Ok(self
            .friendships
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.requester_id == user_id || f.addressee_id == user_id)
            .filter(|f| status.is_none_or(|s| f.status == s))
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl MatchRepository for InMemoryStore {
    async fn create_match(&self, new_match: NewMatch) -> Result<Match, RepoCreateError> {
        let mut matches = self.matches.lock().unwrap();
        if matches.values().any(|m| {
            !m.status.is_terminal()
                && m.is_participant(new_match.player1_id)
                && m.is_participant(new_match.player2_id)
        }) {
            return Err(RepoCreateError::Conflict);
        }
        let m = Match {
            id: MatchId::new(),
            player1_id: new_match.player1_id,
            player2_id: new_match.player2_id,
            status: MatchStatus::Invited,
            current_turn_user_id: None,
            winner_user_id: None,
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
        };
        matches.insert(m.id, m.clone());
        Ok(m)
    }

    async fn get_match(&self, match_id: MatchId) -> Result<Match, RepoRetrieveError> {
        self.matches
            .lock()
            .unwrap()
            .get(&match_id)
            .cloned()
            .ok_or(RepoRetrieveError::NotFound)
    }

    async fn query_matches(
        &self,
        query: MatchQuery,
    ) -> Result<PaginatedResponse<Match>, RepoError> {
        let mut matches: Vec<Match> = self
            .matches
            .lock()
            .unwrap()
            .values()
            .filter(|m| m.is_participant(query.user_id))
            .filter(|m| {
                query
                    .statuses
                    .as_ref()
                    .is_none_or(|statuses| statuses.contains(&m.status))
            })
            .cloned()
            .collect();
        matches.sort_by_key(|m| m.created_at);
        if query.order == SortOrder::Descending {
            matches.reverse();
        }
        let total_count = matches.len();
        let items = matches
            .into_iter()
            .skip(query.pagination.offset())
            .take(query.pagination.limit())
            .collect();
        Ok(PaginatedResponse { items, total_count })
    }

    async fn get_active_match_between(
        &self,
        user_a: UserId,
        user_b: UserId,
    ) -> Result<Option<Match>, RepoError> {
        Ok(self
            .matches
            .lock()
            .unwrap()
            .values()
            .find(|m| {
                !m.status.is_terminal() && m.is_participant(user_a) && m.is_participant(user_b)
            })
            .cloned())
    }

    async fn update_match_status(
        &self,
        match_id: MatchId,
        expected: MatchStatus,
        update: MatchUpdate,
    ) -> Result<Match, RepoUpdateError> {
        if self.fail_next_status_update.swap(false, Ordering::SeqCst) {
            return Err(RepoUpdateError::StorageError("database is locked".to_string()));
        }
        let mut matches = self.matches.lock().unwrap();
        let m = matches
            .get_mut(&match_id)
            .ok_or(RepoUpdateError::NotFound)?;
        if m.status != expected {
            return Err(RepoUpdateError::Conflict);
        }
        m.status = update.status;
        m.current_turn_user_id = update.current_turn_user_id;
        if update.started_at.is_some() {
            m.started_at = update.started_at;
        }
        if update.ended_at.is_some() {
            m.ended_at = update.ended_at;
        }
        Ok(m.clone())
    }

    async fn save_board(&self, board: &Board) -> Result<(), RepoCreateError> {
        let mut boards = self.boards.lock().unwrap();
        if boards
            .iter()
            .any(|b| b.match_id == board.match_id && b.user_id == board.user_id)
        {
            return Err(RepoCreateError::Conflict);
        }
        boards.push(board.clone());
        Ok(())
    }

    async fn get_boards(&self, match_id: MatchId) -> Result<Vec<Board>, RepoError> {
        Ok(self
            .boards
            .lock()
            .unwrap()
            .iter()
            .filter(|b| b.match_id == match_id)
            .cloned()
            .collect())
    }

    async fn get_moves(&self, match_id: MatchId) -> Result<Vec<Move>, RepoError> {
        let mut moves: Vec<Move> = self
            .moves
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.match_id == match_id)
            .cloned()
            .collect();
        moves.sort_by_key(|m| m.move_number);
        Ok(moves)
    }

    async fn record_move(&self, mv: &Move, next_turn: UserId) -> Result<(), RepoUpdateError> {
        let mut matches = self.matches.lock().unwrap();
        let m = matches
            .get_mut(&mv.match_id)
            .ok_or(RepoUpdateError::NotFound)?;
        if m.status != MatchStatus::InProgress
            || m.current_turn_user_id != Some(mv.chosen_by_user_id)
        {
            return Err(RepoUpdateError::Conflict);
        }
        let mut moves = self.moves.lock().unwrap();
        insert_move(&mut moves, mv)?;
        m.current_turn_user_id = Some(next_turn);
        Ok(())
    }

    async fn finish_match(
        &self,
        match_id: MatchId,
        finish: MatchFinish,
    ) -> Result<Match, RepoUpdateError> {
        let mut matches = self.matches.lock().unwrap();
        let m = matches
            .get_mut(&match_id)
            .ok_or(RepoUpdateError::NotFound)?;
        if m.status != MatchStatus::InProgress {
            return Err(RepoUpdateError::Conflict);
        }
        if let Some(mv) = &finish.final_move {
            if m.current_turn_user_id != Some(mv.chosen_by_user_id) {
                return Err(RepoUpdateError::Conflict);
            }
            insert_move(&mut self.moves.lock().unwrap(), mv)?;
        }
        m.status = MatchStatus::Finished;
        m.current_turn_user_id = None;
        m.winner_user_id = finish.winner_user_id;
        m.ended_at = Some(finish.ended_at);

        let mut stats = self.stats.lock().unwrap();
        for user_id in [m.player1_id, m.player2_id] {
            stats
                .entry(user_id)
                .or_insert_with(|| UserStats::empty(user_id))
                .record(finish.outcome_for(user_id), finish.ended_at);
        }
        Ok(m.clone())
    }

    async fn list_stale_matches(
        &self,
        setup_cutoff: DateTime<Utc>,
        play_cutoff: DateTime<Utc>,
    ) -> Result<Vec<Match>, RepoError> {
        let matches = self.matches.lock().unwrap();
        let moves = self.moves.lock().unwrap();
        Ok(matches
            .values()
            .filter(|m| {
                let last_move_at = moves
                    .iter()
                    .filter(|mv| mv.match_id == m.id)
                    .map(|mv| mv.created_at)
                    .max();
                m.is_stale(last_move_at, setup_cutoff, play_cutoff)
            })
            .cloned()
            .collect())
    }
}

fn insert_move(moves: &mut Vec<Move>, mv: &Move) -> Result<(), RepoUpdateError> {
    if moves.iter().any(|other| {
        other.match_id == mv.match_id
            && (other.move_number == mv.move_number || other.number == mv.number)
    }) {
        return Err(RepoUpdateError::Conflict);
    }
    moves.push(mv.clone());
    Ok(())
}

#[async_trait::async_trait]
impl StatsRepository for InMemoryStore {
    async fn create_stats(&self, user_id: UserId) -> Result<(), RepoCreateError> {
        let mut stats = self.stats.lock().unwrap();
        if stats.contains_key(&user_id) {
            return Err(RepoCreateError::Conflict);
        }
        stats.insert(user_id, UserStats::empty(user_id));
        Ok(())
    }

    async fn get_stats(&self, user_id: UserId) -> Result<UserStats, RepoRetrieveError> {
        self.stats
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .ok_or(RepoRetrieveError::NotFound)
    }

    async fn get_leaderboard(&self, limit: usize) -> Result<Vec<UserStats>, RepoError> {
        let mut stats: Vec<UserStats> = self.stats.lock().unwrap().values().cloned().collect();
        stats.sort_by(|a, b| {
            b.wins
                .cmp(&a.wins)
                .then(b.best_win_streak.cmp(&a.best_win_streak))
        });
        stats.truncate(limit);
        Ok(stats)
    }
}

#[derive(Default)]
pub struct MockEmailPort {
    sent: Mutex<Vec<(String, String, String)>>,
}

impl MockEmailPort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// The six digit code in the most recent email to `to`.
    pub fn last_code_for(&self, to: &str) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        let (_, _, body) = sent.iter().rev().find(|(recipient, _, _)| recipient == to)?;
        body.split_whitespace()
            .find(|word| word.len() == 6 && word.chars().all(|c| c.is_ascii_digit()))
            .map(|word| word.to_string())
    }
}

impl EmailPort for MockEmailPort {
    fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<(), SendEmailError> {
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), body.to_string()));
        Ok(())
    }
}
