//! Domain model types.

pub mod commitment;
pub mod daily_log;
pub mod judge;
pub mod payout;
pub mod setup;
