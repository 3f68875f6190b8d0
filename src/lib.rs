#![forbid(unsafe_code)]

//! SMS-driven peer-accountability service.
//!
//! A committer stakes money on a commitment and names a judge; the
//! scheduler asks the judge each day (or once, at a deadline) whether the
//! commitment was honored, debiting a penalty per failure and refunding
//! the remainder when the commitment ends.

pub mod clock;
pub mod config;
pub mod errors;
pub mod flows;
pub mod gateways;
pub mod http;
pub mod interpreter;
pub mod ledger;
pub mod models;
pub mod parse;
pub mod persistence;
pub mod scheduler;
pub mod state;
pub mod util;

pub use config::GlobalConfig;
pub use errors::{AppError, Result};
