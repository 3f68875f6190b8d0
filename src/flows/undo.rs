//! UNDO: a judge's short window to revert their last verification.

use chrono::{Duration, Utc};
use tracing::info;

use crate::gateways::sms::send_best_effort;
use crate::models::commitment::CommitmentStatus;
use crate::models::daily_log::LogOutcome;
use crate::models::payout::Payout;
use crate::state::AppState;
use crate::Result;

/// Handle an UNDO command from a judge. Returns the reply to send.
///
/// Reverts the most recent unconsumed verification when it is inside
/// the window and the commitment is still active: the log reopens, any
/// forfeited money is restored, and the committer is told to expect a
/// fresh verdict.
///
/// # Errors
///
/// Returns `AppError::Db` on persistence failure.
pub async fn handle(state: &AppState, judge_phone: &str) -> Result<String> {
    let Some(entry) = state.undos().latest(judge_phone).await? else {
        return Ok("Nothing to undo.".to_owned());
    };

    let window = Duration::minutes(state.config.undo_window_minutes);
    if Utc::now() - entry.created_at > window {
        return Ok(format!(
            "Too late to undo — changes lock in after {} minutes.",
            state.config.undo_window_minutes
        ));
    }

    let Some(commitment) = state.commitments().get_by_id(&entry.commitment_id).await? else {
        return Ok("Nothing to undo.".to_owned());
    };
    // A settled commitment has already been refunded; reverting its
    // money would double-pay.
    if commitment.status != CommitmentStatus::Active {
        return Ok("That commitment has already been settled, so it can't be undone.".to_owned());
    }

    // Single-use: losing this race means a concurrent UNDO won.
    if !state.undos().consume(&entry.id).await? {
        return Ok("Nothing to undo.".to_owned());
    }
    if !state.logs().reopen(&entry.log_id).await? {
        return Ok("That check-in can't be reverted anymore.".to_owned());
    }

    if entry.monetary_delta > 0 {
        state
            .commitments()
            .adjust_stake(&entry.commitment_id, entry.monetary_delta)
            .await?;
        state
            .payouts()
            .create(&Payout::new(
                entry.commitment_id.clone(),
                judge_phone.to_owned(),
                -entry.monetary_delta,
                "undo_failed_check_in".to_owned(),
            ))
            .await?;
    }

    info!(
        commitment_id = %entry.commitment_id,
        log_id = %entry.log_id,
        judge = %judge_phone,
        restored = entry.monetary_delta,
        "verification undone"
    );

    send_best_effort(
        state.sms.as_ref(),
        &commitment.phone,
        &format!(
            "{} is taking another look at your last check-in. A fresh verdict is coming.",
            commitment.judge_name
        ),
    )
    .await;

    let what = match entry.prior_outcome {
        LogOutcome::Fail => format!(
            "Undone. The ${} penalty was restored and the check-in is pending again. \
             Reply YES or NO with your verdict.",
            entry.monetary_delta
        ),
        _ => "Undone. The check-in is pending again. Reply YES or NO with your verdict."
            .to_owned(),
    };
    Ok(what)
}
