//! Inbound SMS handling and commitment lifecycle flows.
//!
//! [`router`] dispatches each inbound message through a fixed priority
//! chain; the sibling modules implement the individual conversations.
//! Money and lifecycle side effects shared between handlers and the
//! scheduler live in [`lifecycle`] and [`verification`].

pub mod admin;
pub mod judge;
pub mod lifecycle;
pub mod menu;
pub mod router;
pub mod setup;
pub mod status;
pub mod undo;
pub mod verification;
