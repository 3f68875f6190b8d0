//! Applying a verification outcome to a daily log.
//!
//! One code path serves judge YES/NO replies, menu selections, and the
//! scheduler's timeout default, so the money side effects cannot drift
//! between entry points.

use tracing::info;

use crate::flows::lifecycle::{self, TerminationReason};
use crate::gateways::sms::send_best_effort;
use crate::ledger;
use crate::models::commitment::{Commitment, CommitmentType};
use crate::models::daily_log::{DailyLog, LogOutcome};
use crate::models::payout::Payout;
use crate::state::AppState;
use crate::Result;

/// Who resolved the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolvedBy<'a> {
    /// A judge reply; their phone is recorded for the undo window.
    Judge(&'a str),
    /// The scheduler's unanswered-log default.
    Timeout,
    /// An operator correction applying the initial outcome.
    Operator,
}

/// Resolve a pending log and apply every downstream effect: stake
/// debit, payout ledger, undo bookkeeping, notifications, and
/// termination when the stake empties or a deadline settles.
///
/// Returns a short reply for the actor (`None` when the log was already
/// resolved by a racing path).
///
/// # Errors
///
/// Returns `AppError::Db` on persistence failure.
pub async fn apply_outcome(
    state: &AppState,
    commitment: &Commitment,
    log: &DailyLog,
    passed: bool,
    resolved_by: ResolvedBy<'_>,
) -> Result<Option<String>> {
    let outcome = if passed { LogOutcome::Pass } else { LogOutcome::Fail };
    let judge_verified = !matches!(resolved_by, ResolvedBy::Timeout);
    if !state.logs().resolve(&log.id, outcome, judge_verified).await? {
        return Ok(Some(
            "That check-in was already recorded.".to_owned(),
        ));
    }

    info!(
        commitment_id = %commitment.id,
        log_id = %log.id,
        passed,
        ?resolved_by,
        "log resolved"
    );

    if passed {
        if let ResolvedBy::Judge(judge_phone) = resolved_by {
            state
                .undos()
                .record(judge_phone, &commitment.id, &log.id, LogOutcome::Pass, 0)
                .await?;
        }
        send_best_effort(
            state.sms.as_ref(),
            &commitment.phone,
            &format!(
                "{} verified your check-in: PASS. Stake intact at ${}.",
                commitment.judge_name, commitment.stake_remaining
            ),
        )
        .await;
        if commitment.commitment_type == CommitmentType::Deadline {
            lifecycle::terminate(state, &commitment.id, TerminationReason::DeadlineMet).await?;
        }
        return Ok(Some("Got it. Recorded as a PASS.".to_owned()));
    }

    let penalty = commitment.effective_penalty();
    let failure = ledger::apply_failure(commitment.stake_remaining, penalty);
    state
        .commitments()
        .set_stake_remaining(&commitment.id, failure.new_stake_remaining)
        .await?;
    if failure.debited > 0 {
        state
            .payouts()
            .create(&Payout::new(
                commitment.id.clone(),
                commitment.judge_phone.clone(),
                failure.debited,
                "failed_check_in".to_owned(),
            ))
            .await?;
    }
    if let ResolvedBy::Judge(judge_phone) = resolved_by {
        state
            .undos()
            .record(
                judge_phone,
                &commitment.id,
                &log.id,
                LogOutcome::Fail,
                failure.debited,
            )
            .await?;
    }

    let committer_note = if matches!(resolved_by, ResolvedBy::Timeout) {
        format!(
            "No verification arrived in time, so {} counted as a miss. ${} forfeited; ${} remains.",
            log.date, failure.debited, failure.new_stake_remaining
        )
    } else {
        format!(
            "{} marked {} as a miss. ${} forfeited; ${} remains.",
            commitment.judge_name, log.date, failure.debited, failure.new_stake_remaining
        )
    };
    send_best_effort(state.sms.as_ref(), &commitment.phone, &committer_note).await;

    if failure.should_terminate {
        let reason = match commitment.commitment_type {
            CommitmentType::Daily => TerminationReason::StakeDepleted,
            CommitmentType::Deadline => TerminationReason::DeadlineMissed,
        };
        lifecycle::terminate(state, &commitment.id, reason).await?;
    }

    let mut reply = format!(
        "Recorded as a FAIL. ${} was debited from their stake.",
        failure.debited
    );
    if matches!(resolved_by, ResolvedBy::Judge(_)) && failure.debited > 0 {
        reply.push_str(&format!(" You earned ${}.", failure.debited));
    }
    Ok(Some(reply))
}
