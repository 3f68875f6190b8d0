//! STATUS, HISTORY, and HELP replies.

use crate::models::commitment::{CommitmentStatus, CommitmentType, RefundStatus};
use crate::state::AppState;
use crate::Result;

/// The STATUS reply for a committer.
///
/// # Errors
///
/// Returns `AppError::Db` on persistence failure.
pub async fn status(state: &AppState, phone: &str) -> Result<String> {
    if let Some(c) = state.commitments().get_open_by_phone(phone).await? {
        let shape = match c.commitment_type {
            CommitmentType::Daily => format!("daily through {}", c.end_date),
            CommitmentType::Deadline => format!("due {}", c.end_date),
        };
        let standing = match c.status {
            CommitmentStatus::AwaitingJudge => {
                format!("Waiting on {} to accept as judge.", c.judge_name)
            }
            _ => format!("Judge: {}.", c.judge_name),
        };
        return Ok(format!(
            "\"{}\" ({shape}). ${} of ${} still standing. {standing}",
            c.commitment_text, c.stake_remaining, c.original_stake
        ));
    }
    if state.setups().get(phone).await?.is_some() {
        return Ok(
            "You're mid-setup. Answer the last question, or text RESET to start over.".to_owned(),
        );
    }
    Ok("No active commitment. Text START to stake one.".to_owned())
}

/// The HISTORY reply: up to five completed commitments, newest first.
///
/// # Errors
///
/// Returns `AppError::Db` on persistence failure.
pub async fn history(state: &AppState, phone: &str) -> Result<String> {
    let done = state.commitments().list_completed_by_phone(phone, 5).await?;
    if done.is_empty() {
        return Ok("No finished commitments yet.".to_owned());
    }
    let mut lines = vec!["Your track record:".to_owned()];
    for c in done {
        let settled = match c.refund_status {
            Some(RefundStatus::Refunded) => {
                format!("${} returned", c.refund_amount.unwrap_or(0))
            }
            Some(RefundStatus::NoRefund) => format!("${} forfeited", c.original_stake),
            _ => "settlement pending".to_owned(),
        };
        lines.push(format!(
            "• \"{}\" ({} to {}): {settled}",
            c.commitment_text, c.start_date, c.end_date
        ));
    }
    Ok(lines.join("\n"))
}

/// The HELP reply.
#[must_use]
pub fn help() -> String {
    "Stake real money on a commitment and pick a friend to judge you. \
     Each day your judge confirms you followed through; every miss costs you, \
     and whatever survives comes back at the end.\n\
     START — stake a commitment\n\
     STATUS — where you stand\n\
     HISTORY — past commitments\n\
     RESET — abandon setup"
        .to_owned()
}
