pub mod accept;
pub mod cancel;
pub mod invite;
