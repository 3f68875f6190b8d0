//! Persistence layer modules.

pub mod commitment_repo;
pub mod db;
pub mod judge_repo;
pub mod log_repo;
pub mod menu_repo;
pub mod payout_repo;
pub mod schema;
pub mod setup_repo;
pub mod undo_repo;
pub mod verify_repo;

/// Re-export the database pool type for convenience.
pub use sqlx::SqlitePool;
