pub mod get_stats;
pub mod leaderboard;
