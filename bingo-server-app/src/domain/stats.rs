use chrono::{DateTime, Utc};

use crate::domain::{RepoCreateError, RepoError, RepoRetrieveError, UserId};

#[async_trait::async_trait]
pub trait StatsRepository {
    async fn create_stats(&self, user_id: UserId) -> Result<(), RepoCreateError>;
    async fn get_stats(&self, user_id: UserId) -> Result<UserStats, RepoRetrieveError>;
    /// Ordered by wins, then best win streak, both descending.
    async fn get_leaderboard(&self, limit: usize) -> Result<Vec<UserStats>, RepoError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserStats {
    pub user_id: UserId,
    pub total_matches: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub win_streak: u32,
    pub best_win_streak: u32,
    pub last_match_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum MatchOutcome {
    Win,
    Loss,
    Draw,
}

impl UserStats {
    pub fn empty(user_id: UserId) -> Self {
        UserStats {
            user_id,
            total_matches: 0,
            wins: 0,
            losses: 0,
            draws: 0,
            win_streak: 0,
            best_win_streak: 0,
            last_match_at: None,
        }
    }

    pub fn record(&mut self, outcome: MatchOutcome, at: DateTime<Utc>) {
        self.total_matches += 1;
        match outcome {
            MatchOutcome::Win => {
                self.wins += 1;
                self.win_streak += 1;
                self.best_win_streak = self.best_win_streak.max(self.win_streak);
            }
            MatchOutcome::Loss => {
                self.losses += 1;
                self.win_streak = 0;
            }
            MatchOutcome::Draw => {
                self.draws += 1;
                self.win_streak = 0;
            }
        }
        self.last_match_at = Some(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_streaks() {
        let now = Utc::now();
        let mut stats = UserStats::empty(UserId::new());

        for outcome in [
            MatchOutcome::Win,
            MatchOutcome::Win,
            MatchOutcome::Win,
            MatchOutcome::Loss,
            MatchOutcome::Win,
            MatchOutcome::Draw,
        ] {
            stats.record(outcome, now);
            assert_eq!(stats.wins + stats.losses + stats.draws, stats.total_matches);
            assert!(stats.best_win_streak >= stats.win_streak);
        }

        assert_eq!(stats.total_matches, 6);
        assert_eq!(stats.wins, 4);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.draws, 1);
        assert_eq!(stats.win_streak, 0);
        assert_eq!(stats.best_win_streak, 3);
        assert_eq!(stats.last_match_at, Some(now));
    }
}
