pub mod bingo_match;
pub mod board;
pub mod email_otp;
pub mod friendship;
pub mod match_move;
pub mod session;
pub mod user;
pub mod user_stats;
