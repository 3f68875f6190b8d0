//! Small shared utilities.

pub mod expiring;
