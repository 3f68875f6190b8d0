//! Global command recognition.
//!
//! Commands short-circuit the dialogue regardless of the current step,
//! so they are matched before any state-specific parsing.

/// A recognized global command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Begin (or restart) the setup dialogue.
    Start,
    /// Abandon an in-progress setup.
    Reset,
    /// Explain how the service works.
    Help,
    /// Current commitment status and stake.
    Status,
    /// Completed commitment history.
    History,
    /// Judge menu of verifiable commitments.
    Menu,
    /// Revert the judge's most recent verification.
    Undo,
    /// Operator log-correction listing.
    Admin,
}

/// Recognize a global command, case-insensitively, with synonyms.
///
/// Returns `None` for free text so the dialogue's slot parsing runs.
#[must_use]
pub fn recognize(text: &str) -> Option<Command> {
    match text.trim().to_uppercase().as_str() {
        "START" => Some(Command::Start),
        "RESET" | "CANCEL" | "NEVERMIND" => Some(Command::Reset),
        "HELP" | "HOW" | "INFO" => Some(Command::Help),
        "STATUS" => Some(Command::Status),
        "HISTORY" => Some(Command::History),
        "MENU" => Some(Command::Menu),
        "UNDO" => Some(Command::Undo),
        "ADMIN" => Some(Command::Admin),
        _ => None,
    }
}
