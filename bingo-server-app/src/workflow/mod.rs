pub mod account;
pub mod friends;
pub mod gameplay;
pub mod matchmaking;
pub mod stats;
