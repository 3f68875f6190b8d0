//! Strict input parsing: phone normalization, command recognition, and
//! slot parsers for the setup dialogue.

pub mod commands;
pub mod phone;
pub mod slots;
