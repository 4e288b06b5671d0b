pub mod auth;
pub mod booking;
pub mod escrow;
pub mod listing;
pub mod log;
pub mod user;
pub mod wallet;
